//! Column transforms: table → paired (x, y) series
//!
//! A row contributes a point only when both its source and target cells are
//! filled. The pairing decision is made once per row, before the transform,
//! so x and y can never drift apart.

use super::expression::{Expression, ExpressionError};
use super::table::{Column, MeasurementTable};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Inconsistent data: {xs} x values but {ys} y values; render skipped")]
    Misaligned { xs: usize, ys: usize },
}

/// How one view derives its points from the table
///
/// Immutable once built; the expression is validated here, not per update.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    source: Column,
    target: Column,
    expression: Expression,
    fit_line: bool,
    x_label: String,
    tab_label: String,
}

impl TransformSpec {
    /// Build a spec from expression text
    pub fn parse(
        source: Column,
        target: Column,
        expression: &str,
        fit_line: bool,
    ) -> Result<Self, ExpressionError> {
        Ok(Self::new(source, target, Expression::parse(expression)?, fit_line))
    }

    /// Build a spec from a compiled expression
    pub fn new(source: Column, target: Column, expression: Expression, fit_line: bool) -> Self {
        Self {
            x_label: source.header().to_string(),
            tab_label: String::new(),
            source,
            target,
            expression,
            fit_line,
        }
    }

    /// Set the axis and tab labels shown by the presentation layer
    pub fn with_labels(mut self, x_label: impl Into<String>, tab_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.tab_label = tab_label.into();
        self
    }

    pub fn source(&self) -> Column {
        self.source
    }

    pub fn target(&self) -> Column {
        self.target
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn fit_line(&self) -> bool {
        self.fit_line
    }

    pub fn x_label(&self) -> &str {
        &self.x_label
    }

    pub fn tab_label(&self) -> &str {
        &self.tab_label
    }
}

/// Paired points ready for plotting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,

    /// Complete rows left out because the transformed x was not finite
    pub dropped: usize,
}

impl Series {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// Evaluate `spec` over every complete row of `table`
pub fn compute(table: &MeasurementTable, spec: &TransformSpec) -> Result<Series, TransformError> {
    let mut series = Series::default();

    let sources = table.column(spec.source);
    let targets = table.column(spec.target);

    for (row, (source, target)) in sources.iter().zip(targets.iter()).enumerate() {
        let (Some(raw_x), Some(y)) = (*source, *target) else {
            continue;
        };

        let x = spec.expression.eval(raw_x);
        if !x.is_finite() {
            debug!(row, raw_x, expression = %spec.expression, "transform not finite, row dropped");
            series.dropped += 1;
            continue;
        }

        series.xs.push(x);
        series.ys.push(y);
    }

    if series.xs.len() != series.ys.len() {
        let err = TransformError::Misaligned {
            xs: series.xs.len(),
            ys: series.ys.len(),
        };
        warn!("{}", err);
        return Err(err);
    }

    Ok(series)
}
