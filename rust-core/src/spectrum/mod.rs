//! Spectral analysis: FFT, smoothing and peak labelling

pub mod fft;
pub mod smoothing;
pub mod analysis;
pub mod peak;

pub use fft::FftEngine;
pub use smoothing::GaussianKernel;
pub use analysis::{AnalysisError, SpectralAnalyzer, SpectrumFrame};
pub use peak::{PeakDetector, PeakReading};
