//! FFT engine using realfft for real-valued signals
//!
//! Sized once to the capture block; scratch buffers are reused between calls
//! so the audio callback does not allocate per transform.

use num_complex::Complex;
use realfft::{FftError, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// FFT engine for real-valued signals
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Reusable input buffer
    input_buffer: Vec<f64>,

    /// Reusable output buffer (complex spectrum)
    output_buffer: Vec<Complex<f64>>,

    /// Reusable scratch for the planner's algorithm
    scratch: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// Any size is accepted; realfft falls back to mixed-radix / Bluestein
    /// plans for sizes that are not powers of two (e.g. 11025).
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();
        let scratch = r2c.make_scratch_vec();

        Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
            scratch,
        }
    }

    /// Compute |X[k]| for k = 0..num_bins and write them into `magnitudes`
    ///
    /// The signal is zero-padded if shorter than the FFT size and truncated if
    /// longer. Only the first `magnitudes.len()` bins are written.
    pub fn magnitude_into(&mut self, signal: &[f64], magnitudes: &mut [f64]) -> Result<(), FftError> {
        let copy_len = signal.len().min(self.fft_size);
        self.input_buffer[..copy_len].copy_from_slice(&signal[..copy_len]);
        self.input_buffer[copy_len..].fill(0.0);

        self.r2c.process_with_scratch(
            &mut self.input_buffer,
            &mut self.output_buffer,
            &mut self.scratch,
        )?;

        for (mag, bin) in magnitudes.iter_mut().zip(self.output_buffer.iter()) {
            *mag = bin.norm();
        }

        Ok(())
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of non-negative frequency bins (fft_size/2 + 1)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frequency of bin `k` in Hz
    pub fn bin_to_hz(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.fft_size as f64
    }
}
