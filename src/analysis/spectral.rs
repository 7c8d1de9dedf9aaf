// SpectralAnalyzer - timbre descriptors for the classifier
//
// Computes clip-level spectral centroid, spread, rolloff, flux, brightness,
// zero-crossing rate and a percussiveness estimate. The previous magnitude
// spectrum is the one piece of state retained across frames (and calls) for
// flux computation; it belongs to this analyzer instance and the owning
// facade resets it at the start of each clip so repeated analyses of the
// same input stay bit-identical.

use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use crate::features::fft::FftProcessor;

/// Centroid above which a clip saturates the brightness scale, in Hz
const BRIGHTNESS_CEILING_HZ: f32 = 8000.0;

/// Onset rate (per second) that saturates the percussiveness scale
const PERCUSSIVE_RATE_CEILING: f32 = 8.0;

/// Clip-level timbre descriptors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralProfile {
    /// Energy-weighted mean frequency in Hz
    pub centroid: f32,
    /// Standard deviation around the centroid in Hz
    pub spread: f32,
    /// 85% energy rolloff frequency in Hz
    pub rolloff: f32,
    /// Mean positive spectral difference between consecutive frames
    pub flux: f32,
    /// Centroid mapped onto [0, 1] (1 = very bright material)
    pub brightness: f32,
    /// Zero-crossing rate in [0, 1]
    pub zcr: f32,
    /// Combined onset-density / flux measure in [0, 1]
    pub percussiveness: f32,
}

/// Frame-walking spectral analyzer with flux memory
pub struct SpectralAnalyzer {
    sample_rate: u32,
    fft: FftProcessor,
    hop_size: usize,
    prev_spectrum: Option<Vec<f32>>,
}

impl SpectralAnalyzer {
    /// Create an analyzer for the given sample rate
    pub fn new(sample_rate: u32, config: &FeatureConfig) -> Self {
        Self {
            sample_rate,
            fft: FftProcessor::new(config.fft_size),
            hop_size: config.hop_size.max(1),
            prev_spectrum: None,
        }
    }

    /// Drop the retained previous spectrum
    ///
    /// Call between unrelated clips; flux for the first frame after a reset
    /// is measured against silence.
    pub fn reset(&mut self) {
        self.prev_spectrum = None;
    }

    /// Analyze the timbre of a clip
    ///
    /// # Arguments
    /// * `samples` - Mono audio samples
    /// * `onset_count` - Onsets detected in this clip, for percussiveness
    pub fn analyze(&mut self, samples: &[f32], onset_count: usize) -> SpectralProfile {
        let fft_size = self.fft.size();
        let zcr = zero_crossing_rate(samples);

        if samples.len() < fft_size {
            // Too short for spectral framing: time-domain features only
            return SpectralProfile {
                zcr,
                ..SpectralProfile::default()
            };
        }

        let mut centroid_acc = 0.0f32;
        let mut spread_acc = 0.0f32;
        let mut rolloff_acc = 0.0f32;
        let mut flux_acc = 0.0f32;
        let mut flux_frames = 0usize;
        let mut energy_acc = 0.0f32;
        let mut frames = 0usize;

        let mut pos = 0;
        while pos + fft_size <= samples.len() {
            let spectrum = self.fft.magnitude_spectrum(&samples[pos..pos + fft_size]);

            let magnitude_sum: f32 = spectrum.iter().sum();
            if magnitude_sum > 1e-10 {
                let centroid: f32 = spectrum
                    .iter()
                    .enumerate()
                    .map(|(bin, &mag)| self.fft.bin_frequency(bin, self.sample_rate) * mag)
                    .sum::<f32>()
                    / magnitude_sum;

                let variance: f32 = spectrum
                    .iter()
                    .enumerate()
                    .map(|(bin, &mag)| {
                        let d = self.fft.bin_frequency(bin, self.sample_rate) - centroid;
                        d * d * mag
                    })
                    .sum::<f32>()
                    / magnitude_sum;

                centroid_acc += centroid;
                spread_acc += variance.sqrt();
                rolloff_acc += self.rolloff(&spectrum);
            }
            energy_acc += magnitude_sum;

            if let Some(prev) = &self.prev_spectrum {
                flux_acc += spectrum
                    .iter()
                    .zip(prev.iter())
                    .map(|(curr, prev)| (curr - prev).max(0.0))
                    .sum::<f32>();
                flux_frames += 1;
            }
            self.prev_spectrum = Some(spectrum);

            frames += 1;
            pos += self.hop_size;
        }

        if frames == 0 {
            return SpectralProfile {
                zcr,
                ..SpectralProfile::default()
            };
        }

        let n = frames as f32;
        let centroid = centroid_acc / n;
        let flux = if flux_frames > 0 {
            flux_acc / flux_frames as f32
        } else {
            0.0
        };

        let duration_seconds = samples.len() as f32 / self.sample_rate as f32;
        let percussiveness =
            self.percussiveness(onset_count, duration_seconds, flux, energy_acc / n);

        SpectralProfile {
            centroid,
            spread: spread_acc / n,
            rolloff: rolloff_acc / n,
            flux,
            brightness: (centroid / BRIGHTNESS_CEILING_HZ).clamp(0.0, 1.0),
            zcr,
            percussiveness,
        }
    }

    /// Frequency below which 85% of the spectral energy is contained
    fn rolloff(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&m| m * m).sum();
        if total_energy < 1e-10 {
            return 0.0;
        }

        let threshold = 0.85 * total_energy;
        let mut cumulative = 0.0;
        for (bin, &mag) in spectrum.iter().enumerate() {
            cumulative += mag * mag;
            if cumulative >= threshold {
                return self.fft.bin_frequency(bin, self.sample_rate);
            }
        }
        self.fft.bin_frequency(spectrum.len() - 1, self.sample_rate)
    }

    /// Blend of onset density and relative flux, in [0, 1]
    fn percussiveness(
        &self,
        onset_count: usize,
        duration_seconds: f32,
        flux: f32,
        mean_energy: f32,
    ) -> f32 {
        if duration_seconds <= 0.0 {
            return 0.0;
        }

        let rate = onset_count as f32 / duration_seconds;
        let rate_term = (rate / PERCUSSIVE_RATE_CEILING).clamp(0.0, 1.0);

        let flux_term = if mean_energy > 1e-9 {
            (flux / mean_energy).clamp(0.0, 1.0)
        } else {
            0.0
        };

        (0.6 * rate_term + 0.4 * flux_term).clamp(0.0, 1.0)
    }
}

/// Zero-crossing rate of a buffer, in [0, 1]
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let mut crossings = 0usize;
    for pair in samples.windows(2) {
        if (pair[1] >= 0.0 && pair[0] < 0.0) || (pair[1] < 0.0 && pair[0] >= 0.0) {
            crossings += 1;
        }
    }
    crossings as f32 / (samples.len() - 1) as f32
}
