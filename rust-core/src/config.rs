//! Analysis and display configuration
//!
//! Every constant of the live monitor lives in [`MonitorConfig`]; display
//! colours live in [`PlotStyle`]. Both are plain values handed to components
//! at construction.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Sample rate must be positive (got {0} Hz)")]
    SampleRate(u32),

    #[error("Block size must be at least 2 samples (got {0})")]
    BlockSize(usize),

    #[error("Analysis band must be a positive frequency below Nyquist ({nyquist} Hz), got {band} Hz")]
    Band { band: f64, nyquist: f64 },

    #[error("Smoothing sigma must be finite and non-negative (got {0})")]
    Sigma(f64),

    #[error("Peak-to-noise ratio must be finite and positive (got {0})")]
    PeakRatio(f64),
}

/// Live monitor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Samples per buffer-ready event (also the FFT size)
    pub block_size: usize,

    /// Upper edge of the analysis band in Hz
    pub band_max_hz: f64,

    /// Gaussian smoothing sigma, in bins
    pub smoothing_sigma: f64,

    /// Max/mean magnitude ratio a frame must exceed to count as a tone
    pub peak_ratio: f64,

    /// How long a detected label survives non-qualifying frames
    pub hold: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 11025, // 0.25 s per update
            band_max_hz: 4000.0,
            smoothing_sigma: 2.0,
            peak_ratio: 5.0,
            hold: Duration::from_secs(2),
        }
    }
}

impl MonitorConfig {
    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.block_size < 2 {
            return Err(ConfigError::BlockSize(self.block_size));
        }

        let nyquist = self.sample_rate as f64 / 2.0;
        if !(self.band_max_hz > 0.0 && self.band_max_hz <= nyquist) {
            return Err(ConfigError::Band {
                band: self.band_max_hz,
                nyquist,
            });
        }
        if !self.smoothing_sigma.is_finite() || self.smoothing_sigma < 0.0 {
            return Err(ConfigError::Sigma(self.smoothing_sigma));
        }
        if !self.peak_ratio.is_finite() || self.peak_ratio <= 0.0 {
            return Err(ConfigError::PeakRatio(self.peak_ratio));
        }

        Ok(())
    }

    /// Duration of one capture block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}

/// Display colours handed to every view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotStyle {
    pub background: &'static str,
    pub foreground: &'static str,
    pub marker: &'static str,
    pub spectrum_trace: &'static str,
    pub fit_line: &'static str,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            background: "black",
            foreground: "white",
            marker: "white",
            spectrum_trace: "orange",
            fit_line: "red",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_band_above_nyquist_rejected() {
        let config = MonitorConfig {
            sample_rate: 6000,
            ..MonitorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Band { .. })));
    }

    #[test]
    fn test_bad_ratio_rejected() {
        let config = MonitorConfig {
            peak_ratio: 0.0,
            ..MonitorConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PeakRatio(0.0)));
    }
}
