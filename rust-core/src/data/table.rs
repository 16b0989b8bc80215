//! Measurement table
//!
//! A fixed 20×4 grid of cells. Each cell is either a finite number or
//! missing; there is no NaN sentinel.

use ndarray::{Array2, ArrayView1};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Number of measurement rows
pub const TABLE_ROWS: usize = 20;

/// Number of measurement columns
pub const TABLE_COLUMNS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Row {0} is outside the table (0..{max})", max = TABLE_ROWS)]
    RowOutOfRange(usize),

    #[error("Column {0} is outside the table (0..{max})", max = TABLE_COLUMNS)]
    ColumnOutOfRange(usize),

    #[error("'{text}' is not a number; cell ({row}, {column}) cleared")]
    InvalidNumber {
        row: usize,
        column: usize,
        text: String,
    },
}

/// Table columns, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Frequency of the blown tone
    DriveFrequency,
    Mass,
    Height,
    /// Frequency of the tapped tone
    ResponseFrequency,
}

impl Column {
    pub const ALL: [Column; TABLE_COLUMNS] = [
        Column::DriveFrequency,
        Column::Mass,
        Column::Height,
        Column::ResponseFrequency,
    ];

    pub fn index(self) -> usize {
        match self {
            Column::DriveFrequency => 0,
            Column::Mass => 1,
            Column::Height => 2,
            Column::ResponseFrequency => 3,
        }
    }

    pub fn from_index(index: usize) -> Result<Self, TableError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(TableError::ColumnOutOfRange(index))
    }

    /// Column header
    pub fn header(self) -> &'static str {
        match self {
            Column::DriveFrequency => "Blåsfrekvens (Hz)",
            Column::Mass => "Massa (g)",
            Column::Height => "Höjd (mm)",
            Column::ResponseFrequency => "Plingfrekvens (Hz)",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Raw cell edit from the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub row: usize,
    pub column: usize,
    pub text: String,
}

/// Parse cell text; `Ok(None)` for blank input
fn parse_cell(text: &str) -> Result<Option<f64>, ()> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(()),
    }
}

/// Fixed-capacity measurement table
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementTable {
    cells: Array2<Option<f64>>,
}

impl Default for MeasurementTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementTable {
    /// Empty table with every cell missing
    pub fn new() -> Self {
        Self {
            cells: Array2::from_elem((TABLE_ROWS, TABLE_COLUMNS), None),
        }
    }

    /// Apply a raw edit
    ///
    /// Valid numbers are stored and returned. Blank text clears the cell.
    /// Anything else clears the cell and returns
    /// [`TableError::InvalidNumber`]; the previous value is not kept.
    pub fn apply_edit(&mut self, edit: &CellEdit) -> Result<Option<f64>, TableError> {
        let column = Column::from_index(edit.column)?;
        if edit.row >= TABLE_ROWS {
            return Err(TableError::RowOutOfRange(edit.row));
        }

        match parse_cell(&edit.text) {
            Ok(value) => {
                self.cells[[edit.row, column.index()]] = value;
                Ok(value)
            }
            Err(()) => {
                self.cells[[edit.row, column.index()]] = None;
                warn!(row = edit.row, column = %column, text = %edit.text, "rejected non-numeric cell");
                Err(TableError::InvalidNumber {
                    row: edit.row,
                    column: edit.column,
                    text: edit.text.clone(),
                })
            }
        }
    }

    /// Store a value directly
    pub fn set(&mut self, row: usize, column: Column, value: Option<f64>) -> Result<(), TableError> {
        if row >= TABLE_ROWS {
            return Err(TableError::RowOutOfRange(row));
        }
        self.cells[[row, column.index()]] = value.filter(|v| v.is_finite());
        Ok(())
    }

    pub fn get(&self, row: usize, column: Column) -> Option<f64> {
        self.cells.get([row, column.index()]).copied().flatten()
    }

    /// All cells of one column, top to bottom
    pub fn column(&self, column: Column) -> ArrayView1<'_, Option<f64>> {
        self.cells.column(column.index())
    }

    /// Copy for a recompute pass
    pub fn snapshot(&self) -> MeasurementTable {
        self.clone()
    }

    /// Number of rows with at least one filled cell
    pub fn filled_rows(&self) -> usize {
        self.cells
            .rows()
            .into_iter()
            .filter(|row| row.iter().any(Option::is_some))
            .count()
    }

    pub fn rows(&self) -> usize {
        TABLE_ROWS
    }
}
