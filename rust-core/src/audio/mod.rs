//! Audio capture with cpal and the live monitor pipeline

pub mod input;
pub mod buffer;
pub mod handoff;
pub mod monitor;

pub use input::{AudioCapture, AudioDeviceInfo, AudioError, BlockHandler, list_input_devices};
pub use buffer::BlockAssembler;
pub use handoff::FrameSlot;
pub use monitor::{MonitorUpdate, ResonanceMonitor, SpectrumPipeline};
