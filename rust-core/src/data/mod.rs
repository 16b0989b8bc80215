//! Measurement table, column transforms and line fitting

pub mod table;
pub mod expression;
pub mod transform;
pub mod fit;

pub use table::{CellEdit, Column, MeasurementTable, TableError};
pub use expression::{Expression, ExpressionError};
pub use transform::{compute, Series, TransformError, TransformSpec};
pub use fit::{fit, FitResult};
