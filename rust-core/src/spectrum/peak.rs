//! Peak-frequency labelling with hold
//!
//! A frame qualifies when its maximum magnitude exceeds `ratio` times its mean
//! magnitude. The last qualifying label is held for `hold` so that the display
//! does not flicker between consecutive non-qualifying frames.

use super::analysis::SpectrumFrame;
use crate::config::MonitorConfig;
use std::time::{Duration, Instant};

/// Output of one detector update
#[derive(Debug, Clone, PartialEq)]
pub struct PeakReading {
    /// Label to display, possibly empty
    pub label: String,

    /// Display scale: this frame's maximum magnitude, or 0
    pub y_limit: f64,
}

/// Format the label for a detected frequency
pub fn peak_label(freq_hz: f64) -> String {
    format!("Frekvens: {} Hz", freq_hz.round() as i64)
}

/// Stateful peak detector
#[derive(Debug, Clone)]
pub struct PeakDetector {
    ratio: f64,
    hold: Duration,
    label: String,
    last_frequency: Option<f64>,
    last_detection: Instant,
}

impl PeakDetector {
    /// Create a detector whose hold window starts now
    pub fn new(config: &MonitorConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    /// Create a detector whose hold window starts at `start`
    pub fn starting_at(config: &MonitorConfig, start: Instant) -> Self {
        Self {
            ratio: config.peak_ratio,
            hold: config.hold,
            label: String::new(),
            last_frequency: None,
            last_detection: start,
        }
    }

    /// Feed one frame observed at `now`
    pub fn update(&mut self, frame: &SpectrumFrame, now: Instant) -> PeakReading {
        let mean = frame.mean_magnitude();
        let (peak_freq, peak_mag) = frame.peak().unwrap_or((0.0, 0.0));

        if peak_mag > self.ratio * mean {
            self.label = peak_label(peak_freq);
            self.last_frequency = Some(peak_freq);
            self.last_detection = now;
        } else if now.saturating_duration_since(self.last_detection) > self.hold {
            self.label.clear();
            self.last_frequency = None;
        }

        PeakReading {
            label: self.label.clone(),
            y_limit: peak_mag.max(0.0),
        }
    }

    /// Currently displayed label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Frequency behind the current label, if any
    pub fn last_frequency(&self) -> Option<f64> {
        self.last_frequency
    }

    /// Time of the last qualifying frame (or construction)
    pub fn last_detection(&self) -> Instant {
        self.last_detection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame with mean 10 and a single 100 peak at 440 Hz
    fn tone_frame() -> SpectrumFrame {
        let frequencies: Vec<f64> = (0..10).map(|i| i as f64 * 110.0).collect();
        let mut magnitudes = vec![0.0; 10];
        magnitudes[4] = 100.0;
        SpectrumFrame::new(frequencies, magnitudes).unwrap()
    }

    /// Frame with max/mean ratio below 5
    fn noise_frame() -> SpectrumFrame {
        let frequencies: Vec<f64> = (0..10).map(|i| i as f64 * 110.0).collect();
        let magnitudes = vec![4.0, 5.0, 6.0, 5.0, 4.0, 5.0, 6.0, 5.0, 4.0, 6.0];
        SpectrumFrame::new(frequencies, magnitudes).unwrap()
    }

    #[test]
    fn test_tone_detected() {
        let start = Instant::now();
        let mut detector = PeakDetector::starting_at(&MonitorConfig::default(), start);

        let frame = tone_frame();
        assert!((frame.mean_magnitude() - 10.0).abs() < 1e-12);

        let now = start + Duration::from_millis(500);
        let reading = detector.update(&frame, now);

        assert_eq!(reading.label, "Frekvens: 440 Hz");
        assert_eq!(reading.y_limit, 100.0);
        assert_eq!(detector.last_detection(), now);
        assert_eq!(detector.last_frequency(), Some(440.0));
    }

    #[test]
    fn test_label_held_then_cleared() {
        let start = Instant::now();
        let mut detector = PeakDetector::starting_at(&MonitorConfig::default(), start);

        detector.update(&tone_frame(), start);

        // Within the hold window the label survives
        let reading = detector.update(&noise_frame(), start + Duration::from_millis(1500));
        assert_eq!(reading.label, "Frekvens: 440 Hz");
        assert_eq!(reading.y_limit, 6.0);
        assert_eq!(detector.last_detection(), start);

        // Exactly at the hold boundary it still survives
        let reading = detector.update(&noise_frame(), start + Duration::from_secs(2));
        assert_eq!(reading.label, "Frekvens: 440 Hz");

        let reading = detector.update(&noise_frame(), start + Duration::from_millis(2100));
        assert_eq!(reading.label, "");
        assert_eq!(detector.last_frequency(), None);
    }

    #[test]
    fn test_silence_never_qualifies() {
        let start = Instant::now();
        let mut detector = PeakDetector::starting_at(&MonitorConfig::default(), start);

        let silent = SpectrumFrame::new(vec![0.0, 4.0, 8.0], vec![0.0; 3]).unwrap();
        let reading = detector.update(&silent, start + Duration::from_secs(3));

        assert_eq!(reading.label, "");
        assert_eq!(reading.y_limit, 0.0);
        assert_eq!(detector.last_detection(), start);
    }

    #[test]
    fn test_empty_frame() {
        let mut detector = PeakDetector::new(&MonitorConfig::default());
        let empty = SpectrumFrame::new(Vec::new(), Vec::new()).unwrap();

        let reading = detector.update(&empty, Instant::now());
        assert_eq!(reading.label, "");
        assert_eq!(reading.y_limit, 0.0);
    }

    #[test]
    fn test_label_rounds_to_nearest_hz() {
        assert_eq!(peak_label(439.6), "Frekvens: 440 Hz");
        assert_eq!(peak_label(1203.2), "Frekvens: 1203 Hz");
    }
}
