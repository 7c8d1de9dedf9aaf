// OnsetDetector - short-time energy onset detection
//
// Detects note/percussion attacks from the short-time RMS energy envelope.
//
// Algorithm:
// 1. Slide a 1024-sample window with a 512-sample hop, computing frame RMS
// 2. Adaptive threshold: median(energies) + 0.55 * stddev(energies)
// 3. A frame is an onset if it is a strict local maximum, exceeds the
//    threshold, and rises over the previous frame by more than 0.3 * stddev
// 4. Accepted onsets must be at least two hops apart
//
// The threshold factor is fixed, never randomized: identical buffers must
// produce identical onset lists.

use crate::config::OnsetConfig;

/// Energy-envelope onset detector
pub struct OnsetDetector {
    window_size: usize,
    hop_size: usize,
    threshold_factor: f32,
    rise_factor: f32,
    min_spacing: usize,
}

impl OnsetDetector {
    /// Create a detector with default parameters
    pub fn new() -> Self {
        Self::with_config(OnsetConfig::default())
    }

    /// Create a detector with explicit configuration parameters
    pub fn with_config(config: OnsetConfig) -> Self {
        let window_size = config.window_size.max(2);
        let hop_size = config.hop_size.max(1);
        Self {
            window_size,
            hop_size,
            threshold_factor: config.threshold_factor,
            rise_factor: config.rise_factor,
            min_spacing: config.min_spacing_hops.max(1) * hop_size,
        }
    }

    /// Detect onset positions in a buffer
    ///
    /// # Arguments
    /// * `samples` - Mono audio samples
    ///
    /// # Returns
    /// Monotonically increasing sample positions of accepted onsets
    pub fn detect(&self, samples: &[f32]) -> Vec<usize> {
        let energies = self.frame_energies(samples);
        if energies.len() < 3 {
            return Vec::new();
        }

        let (median, std_dev) = median_and_std(&energies);
        let threshold = median + self.threshold_factor * std_dev;
        let min_rise = self.rise_factor * std_dev;

        let mut onsets = Vec::new();
        let mut last_onset: Option<usize> = None;

        for i in 1..energies.len() - 1 {
            let prev = energies[i - 1];
            let curr = energies[i];
            let next = energies[i + 1];

            // Strict local maximum above threshold with a real energy jump
            if curr > prev && curr > next && curr > threshold && curr - prev > min_rise {
                let position = i * self.hop_size;
                let spaced = last_onset
                    .map(|last| position - last >= self.min_spacing)
                    .unwrap_or(true);
                if spaced {
                    onsets.push(position);
                    last_onset = Some(position);
                }
            }
        }

        onsets
    }

    /// Short-time RMS energy per frame
    fn frame_energies(&self, samples: &[f32]) -> Vec<f32> {
        let mut energies = Vec::new();
        let mut pos = 0;
        while pos + self.window_size <= samples.len() {
            let frame = &samples[pos..pos + self.window_size];
            let sum_squares: f32 = frame.iter().map(|s| s * s).sum();
            energies.push((sum_squares / self.window_size as f32).sqrt());
            pos += self.hop_size;
        }
        energies
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Median and standard deviation of an energy sequence
fn median_and_std(values: &[f32]) -> (f32, f32) {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let median = if sorted.len() % 2 == 0 {
        let mid = sorted.len() / 2;
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };

    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>()
        / values.len() as f32;

    (median, variance.sqrt())
}
