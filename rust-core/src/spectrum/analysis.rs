//! Band-limited, smoothed magnitude spectrum
//!
//! Combines the FFT engine with band selection and Gaussian smoothing.

use super::fft::FftEngine;
use super::smoothing::{GaussianKernel, DEFAULT_TRUNCATE};
use crate::config::MonitorConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("FFT processing failed: {0}")]
    Fft(#[from] realfft::FftError),
}

/// One analysed block: parallel frequency / magnitude sequences
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    frequencies: Vec<f64>,
    magnitudes: Vec<f64>,
}

impl SpectrumFrame {
    /// Build a frame from parallel sequences
    ///
    /// Returns `None` if the lengths differ.
    pub fn new(frequencies: Vec<f64>, magnitudes: Vec<f64>) -> Option<Self> {
        if frequencies.len() != magnitudes.len() {
            return None;
        }
        Some(Self {
            frequencies,
            magnitudes,
        })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Mean magnitude, 0 for an empty frame
    pub fn mean_magnitude(&self) -> f64 {
        if self.magnitudes.is_empty() {
            return 0.0;
        }
        self.magnitudes.iter().sum::<f64>() / self.magnitudes.len() as f64
    }

    /// Largest magnitude and the frequency it sits at
    ///
    /// Ties resolve to the lowest frequency.
    pub fn peak(&self) -> Option<(f64, f64)> {
        let mut best: Option<(f64, f64)> = None;
        for (&freq, &mag) in self.frequencies.iter().zip(self.magnitudes.iter()) {
            match best {
                Some((_, best_mag)) if mag <= best_mag => {}
                _ => best = Some((freq, mag)),
            }
        }
        best
    }
}

/// Real-time spectral analyzer
pub struct SpectralAnalyzer {
    sample_rate: f64,
    fft_engine: FftEngine,
    kernel: GaussianKernel,

    /// Bin frequencies inside the analysis band
    band_frequencies: Vec<f64>,

    /// Raw magnitudes for the band (reused)
    raw_magnitudes: Vec<f64>,
}

impl SpectralAnalyzer {
    /// Create an analyzer for blocks of `config.block_size` samples
    pub fn new(config: &MonitorConfig) -> Self {
        let sample_rate = config.sample_rate as f64;
        let fft_engine = FftEngine::new(config.block_size);

        let band_frequencies: Vec<f64> = (0..fft_engine.num_bins())
            .map(|bin| fft_engine.bin_to_hz(bin, sample_rate))
            .take_while(|&freq| freq <= config.band_max_hz)
            .collect();

        let raw_magnitudes = vec![0.0; band_frequencies.len()];

        Self {
            sample_rate,
            fft_engine,
            kernel: GaussianKernel::new(config.smoothing_sigma, DEFAULT_TRUNCATE),
            band_frequencies,
            raw_magnitudes,
        }
    }

    /// Analyze one block and return its smoothed, band-limited spectrum
    ///
    /// Deterministic: identical blocks yield identical frames.
    pub fn analyze(&mut self, buffer: &[f64]) -> Result<SpectrumFrame, AnalysisError> {
        self.fft_engine
            .magnitude_into(buffer, &mut self.raw_magnitudes)?;

        let mut magnitudes = vec![0.0; self.raw_magnitudes.len()];
        self.kernel.smooth_into(&self.raw_magnitudes, &mut magnitudes);

        Ok(SpectrumFrame {
            frequencies: self.band_frequencies.clone(),
            magnitudes,
        })
    }

    /// Bin frequencies inside the analysis band, in Hz
    pub fn frequency_bins_hz(&self) -> &[f64] {
        &self.band_frequencies
    }

    /// Number of bins in every frame
    pub fn num_bins(&self) -> usize {
        self.band_frequencies.len()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
