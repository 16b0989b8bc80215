//! Live resonance monitor
//!
//! Capture, FFT, smoothing and peak labelling all run on the audio callback.
//! Results go into a [`FrameSlot`]; the render loop pulls the latest one when
//! it is ready to draw and never waits on the audio thread.

use super::handoff::FrameSlot;
use super::input::{AudioCapture, AudioDeviceInfo, AudioError, BlockHandler};
use crate::config::MonitorConfig;
use crate::spectrum::{PeakDetector, SpectralAnalyzer, SpectrumFrame};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Everything the render loop needs for one monitor redraw
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorUpdate {
    pub frame: SpectrumFrame,

    /// Peak label, possibly empty
    pub label: String,

    /// Y axis upper limit for this frame
    pub y_limit: f64,
}

/// Analysis pipeline run once per captured block
pub struct SpectrumPipeline {
    analyzer: SpectralAnalyzer,
    detector: PeakDetector,
    slot: Arc<FrameSlot<MonitorUpdate>>,
}

impl SpectrumPipeline {
    pub fn new(config: &MonitorConfig, slot: Arc<FrameSlot<MonitorUpdate>>) -> Self {
        Self {
            analyzer: SpectralAnalyzer::new(config),
            detector: PeakDetector::new(config),
            slot,
        }
    }

    /// Analyze a block observed at `now` and publish the result
    pub fn process(&mut self, block: &[f64], now: Instant) {
        let frame = match self.analyzer.analyze(block) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("skipping block: {}", e);
                return;
            }
        };

        let reading = self.detector.update(&frame, now);
        self.slot.publish(MonitorUpdate {
            frame,
            label: reading.label,
            y_limit: reading.y_limit,
        });
    }
}

impl BlockHandler for SpectrumPipeline {
    fn handle_block(&mut self, block: &[f64]) {
        self.process(block, Instant::now());
    }
}

/// Owns the capture stream and the handoff slot
pub struct ResonanceMonitor {
    capture: AudioCapture<SpectrumPipeline>,
    slot: Arc<FrameSlot<MonitorUpdate>>,
}

impl ResonanceMonitor {
    /// Open the default input device
    ///
    /// Failure here disables the monitor only; callers keep running the rest
    /// of the session.
    pub fn open_default(config: &MonitorConfig) -> Result<Self, AudioError> {
        let slot = Arc::new(FrameSlot::new());
        let pipeline = SpectrumPipeline::new(config, Arc::clone(&slot));
        let capture = AudioCapture::from_default_device(config, pipeline)?;

        Ok(Self { capture, slot })
    }

    pub fn start(&mut self) -> Result<(), AudioError> {
        self.capture.start()
    }

    /// Synchronous: the device is released when this returns
    pub fn stop(&mut self) {
        self.capture.stop();

        let dropped = self.slot.dropped();
        if dropped > 0 {
            warn!(dropped, published = self.slot.published(), "monitor frames dropped under load");
        }
    }

    /// Latest result since the previous call, if any
    pub fn latest(&self) -> Option<MonitorUpdate> {
        self.slot.take_latest()
    }

    pub fn is_running(&self) -> bool {
        self.capture.is_running()
    }

    pub fn device_info(&self) -> &AudioDeviceInfo {
        self.capture.device_info()
    }
}
