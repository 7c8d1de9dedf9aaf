// PitchDetector - autocorrelation-based fundamental frequency estimation
//
// Algorithm:
// 1. Compute buffer RMS; below the noise floor there is no pitch
// 2. Normalize the buffer by RMS
// 3. Autocorrelate over lags covering the plausible fundamental range
// 4. Accept the best peak only above a minimum correlation strength
// 5. Refine the winning lag with parabolic interpolation

use crate::config::PitchConfig;

/// Sentinel returned when no pitch could be detected
pub const NO_PITCH: f32 = -1.0;

/// Autocorrelation pitch detector with parabolic peak refinement
pub struct PitchDetector {
    sample_rate: u32,
    config: PitchConfig,
}

impl PitchDetector {
    /// Create a detector for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self::with_config(sample_rate, PitchConfig::default())
    }

    /// Create a detector with explicit configuration parameters
    pub fn with_config(sample_rate: u32, config: PitchConfig) -> Self {
        Self {
            sample_rate,
            config,
        }
    }

    /// Detect the fundamental frequency of one buffer
    ///
    /// # Arguments
    /// * `buffer` - Mono audio samples, typically 1024-2048 of them
    ///
    /// # Returns
    /// Frequency in Hz, or `NO_PITCH` for silence and unpitched material
    pub fn detect(&self, buffer: &[f32]) -> f32 {
        if buffer.len() < 4 {
            return NO_PITCH;
        }

        let sum_squares: f32 = buffer.iter().map(|s| s * s).sum();
        let rms = (sum_squares / buffer.len() as f32).sqrt();
        if rms < self.config.noise_floor_rms {
            return NO_PITCH;
        }

        // Normalizing by RMS makes the correlation threshold level-independent
        let normalized: Vec<f32> = buffer.iter().map(|s| s / rms).collect();

        let min_offset = (self.sample_rate as f32 / self.config.max_frequency) as usize;
        let max_offset =
            ((self.sample_rate as f32 / self.config.min_frequency) as usize).min(buffer.len() / 2);
        if min_offset >= max_offset {
            return NO_PITCH;
        }

        let mut best_offset = 0usize;
        let mut best_correlation = 0.0f32;
        for offset in min_offset..=max_offset {
            let correlation = self.correlation_at(&normalized, offset);
            if correlation > best_correlation {
                best_correlation = correlation;
                best_offset = offset;
            }
        }

        if best_correlation < self.config.min_correlation || best_offset == 0 {
            return NO_PITCH;
        }

        // Parabolic refinement needs both neighbors; skip it at range edges
        let refined = if best_offset > min_offset && best_offset < max_offset {
            let c1 = self.correlation_at(&normalized, best_offset - 1);
            let c2 = best_correlation;
            let c3 = self.correlation_at(&normalized, best_offset + 1);
            let denominator = c1 - 2.0 * c2 + c3;
            if denominator.abs() > 1e-9 {
                let delta = 0.5 * (c1 - c3) / denominator;
                best_offset as f32 + delta
            } else {
                best_offset as f32
            }
        } else {
            best_offset as f32
        };

        self.sample_rate as f32 / refined
    }

    /// Extract a pitch contour by sliding the detector across the clip
    ///
    /// Unvoiced frames are dropped; the result feeds scale identification.
    pub fn contour(&self, samples: &[f32]) -> Vec<f32> {
        let frame = self.config.frame_size.max(4);
        let hop = self.config.hop_size.max(1);

        let mut pitches = Vec::new();
        let mut pos = 0;
        while pos + frame <= samples.len() {
            let pitch = self.detect(&samples[pos..pos + frame]);
            if pitch > 0.0 {
                pitches.push(pitch);
            }
            pos += hop;
        }
        pitches
    }

    /// Mean-normalized autocorrelation at one lag
    fn correlation_at(&self, normalized: &[f32], offset: usize) -> f32 {
        let n = normalized.len() - offset;
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = (0..n).map(|i| normalized[i] * normalized[i + offset]).sum();
        sum / n as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: u32, frequency: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_detects_440_hz() {
        let detector = PitchDetector::new(44100);
        let signal = sine(44100, 440.0, 2048);

        let pitch = detector.detect(&signal);
        assert!(
            (pitch - 440.0).abs() < 5.0,
            "expected ~440 Hz, got {} Hz",
            pitch
        );
    }

    #[test]
    fn test_detects_low_fundamental() {
        let detector = PitchDetector::new(44100);
        let signal = sine(44100, 110.0, 4096);

        let pitch = detector.detect(&signal);
        assert!(
            (pitch - 110.0).abs() < 3.0,
            "expected ~110 Hz, got {} Hz",
            pitch
        );
    }

    #[test]
    fn test_silence_has_no_pitch() {
        let detector = PitchDetector::new(44100);
        let silence = vec![0.0; 2048];
        assert_eq!(detector.detect(&silence), NO_PITCH);
    }

    #[test]
    fn test_below_noise_floor_has_no_pitch() {
        let detector = PitchDetector::new(44100);
        // A very quiet sine stays under the 0.005 RMS floor
        let quiet: Vec<f32> = sine(44100, 440.0, 2048)
            .into_iter()
            .map(|s| s * 0.001)
            .collect();
        assert_eq!(detector.detect(&quiet), NO_PITCH);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let detector = PitchDetector::new(44100);
        let signal = sine(44100, 330.0, 2048);

        let first = detector.detect(&signal);
        let second = detector.detect(&signal);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_contour_collects_voiced_frames() {
        let detector = PitchDetector::new(44100);
        let signal = sine(44100, 262.0, 44100 / 2);

        let contour = detector.contour(&signal);
        assert!(!contour.is_empty());
        for pitch in contour {
            assert!((pitch - 262.0).abs() < 8.0, "stray pitch {} Hz", pitch);
        }
    }

    #[test]
    fn test_empty_buffer_has_no_pitch() {
        let detector = PitchDetector::new(44100);
        assert_eq!(detector.detect(&[]), NO_PITCH);
    }
}
