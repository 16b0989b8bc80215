//! Ordinary least-squares line fit

use linreg::linear_regression;
use std::fmt;

/// Fitted line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub slope: f64,
    pub intercept: f64,
}

impl FitResult {
    /// Value of the fitted line at `x`
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Fitted y for each x, for drawing the overlay
    pub fn line_points(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.at(x)).collect()
    }

    /// `f(x) = a·x + b` with two decimals
    pub fn equation(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Avoid printing "-0.00" for values that round to zero
        let slope = if self.slope.abs() < 0.005 { 0.0 } else { self.slope };
        let intercept = if self.intercept.abs() < 0.005 { 0.0 } else { self.intercept };

        if intercept < 0.0 {
            write!(f, "f(x) = {:.2}·x - {:.2}", slope, -intercept)
        } else {
            write!(f, "f(x) = {:.2}·x + {:.2}", slope, intercept)
        }
    }
}

/// Fit a line through paired points
///
/// `None` when the sequences differ in length, hold fewer than two points,
/// have no spread in x, or produce a non-finite result.
pub fn fit(xs: &[f64], ys: &[f64]) -> Option<FitResult> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let (slope, intercept): (f64, f64) = linear_regression(xs, ys).ok()?;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }

    Some(FitResult { slope, intercept })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let result = fit(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((result.slope - 2.0).abs() < 1e-9);
        assert!(result.intercept.abs() < 1e-9);
        assert_eq!(result.equation(), "f(x) = 2.00·x + 0.00");
    }

    #[test]
    fn test_noisy_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.1, 2.9, 5.1, 6.9];
        let result = fit(&xs, &ys).unwrap();

        assert!((result.slope - 1.96).abs() < 1e-9);
        assert!((result.intercept - 1.06).abs() < 1e-9);
        assert!((result.at(2.0) - 4.98).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_data() {
        assert!(fit(&[], &[]).is_none());
        assert!(fit(&[1.0], &[2.0]).is_none());
        assert!(fit(&[1.0, 2.0], &[2.0]).is_none());
    }

    #[test]
    fn test_vertical_data_has_no_fit() {
        assert!(fit(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_negative_intercept_formatting() {
        let result = FitResult {
            slope: 31250.5,
            intercept: -12.346,
        };
        assert_eq!(result.to_string(), "f(x) = 31250.50·x - 12.35");

        let tiny = FitResult {
            slope: -0.001,
            intercept: -0.001,
        };
        assert_eq!(tiny.to_string(), "f(x) = 0.00·x + 0.00");
    }

    #[test]
    fn test_line_points() {
        let result = FitResult {
            slope: 2.0,
            intercept: 1.0,
        };
        assert_eq!(result.line_points(&[0.0, 1.0, 2.0]), vec![1.0, 3.0, 5.0]);
    }
}
