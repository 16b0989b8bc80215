//! Bottle Resonance Lab - Acoustic Resonance Measurement Core
//!
//! Live microphone spectrum with peak labelling, plus a measurement table
//! whose columns can be transformed and fitted against a straight line.

pub mod audio;
pub mod config;
pub mod data;
pub mod session;
pub mod spectrum;

pub use audio::{AudioCapture, AudioError, ResonanceMonitor};
pub use config::{MonitorConfig, PlotStyle};
pub use data::{Column, Expression, FitResult, MeasurementTable, TransformSpec};
pub use session::{Event, Experiment, RenderCommand};
pub use spectrum::{PeakDetector, SpectralAnalyzer, SpectrumFrame};
