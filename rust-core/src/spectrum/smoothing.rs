//! Gaussian smoothing of magnitude spectra
//!
//! Suppresses bin-level noise before peak picking. Kernel radius and boundary
//! handling follow the usual `gaussian_filter1d` conventions: radius is
//! `round(truncate * sigma)` and edges are mirrored about the half-sample
//! point (`d c b a | a b c d | d c b a`).

/// Default kernel truncation, in standard deviations
pub const DEFAULT_TRUNCATE: f64 = 4.0;

/// Normalised 1-D Gaussian kernel
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    weights: Vec<f64>,
    radius: usize,
}

impl GaussianKernel {
    /// Build a kernel for `sigma` (in samples) truncated at `truncate` sigmas
    ///
    /// A sigma of zero yields the identity kernel.
    pub fn new(sigma: f64, truncate: f64) -> Self {
        if sigma <= 0.0 || !sigma.is_finite() {
            return Self {
                weights: vec![1.0],
                radius: 0,
            };
        }

        let radius = (truncate * sigma + 0.5) as usize;
        let two_var = 2.0 * sigma * sigma;

        let mut weights: Vec<f64> = (0..=2 * radius)
            .map(|i| {
                let d = i as f64 - radius as f64;
                (-d * d / two_var).exp()
            })
            .collect();

        let sum: f64 = weights.iter().sum();
        for w in weights.iter_mut() {
            *w /= sum;
        }

        Self { weights, radius }
    }

    /// Kernel radius in samples
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Kernel weights, centre at index `radius`
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Convolve `input` with the kernel into `output`
    ///
    /// `output` must be the same length as `input`.
    pub fn smooth_into(&self, input: &[f64], output: &mut [f64]) {
        let n = input.len();
        debug_assert_eq!(n, output.len());
        if n == 0 {
            return;
        }

        let radius = self.radius as isize;
        for (i, out) in output.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, &w) in self.weights.iter().enumerate() {
                let j = reflect(i as isize + k as isize - radius, n);
                acc += w * input[j];
            }
            *out = acc;
        }
    }

    /// Convolve and return a new vector
    pub fn smooth(&self, input: &[f64]) -> Vec<f64> {
        let mut output = vec![0.0; input.len()];
        self.smooth_into(input, &mut output);
        output
    }
}

/// Mirror an out-of-range index back into `0..n` (half-sample symmetric)
fn reflect(mut idx: isize, n: usize) -> usize {
    let n = n as isize;
    // Short inputs can need more than one bounce
    loop {
        if idx < 0 {
            idx = -idx - 1;
        } else if idx >= n {
            idx = 2 * n - idx - 1;
        } else {
            return idx as usize;
        }
    }
}
