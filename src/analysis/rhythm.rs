// RhythmAnalyzer - tempo, regularity, complexity and polyrhythm detection
//
// Converts detected onsets into inter-onset intervals and derives the
// mid-level rhythm descriptors the genre classifier consumes. All results
// are regenerated per call; nothing rhythmic is cached across clips.

use serde::{Deserialize, Serialize};

use crate::analysis::onset::OnsetDetector;
use crate::config::{OnsetConfig, RhythmConfig};

/// Rhythm descriptors for one clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmAnalysis {
    /// Estimated tempo in BPM (0 when fewer than 2 onsets were found)
    pub tempo: f32,
    /// Number of detected onsets
    pub peak_count: usize,
    /// Inverse coefficient of variation of intervals, clamped to [0, 1]
    pub regularity: f32,
    /// Inter-onset intervals in samples
    pub intervals: Vec<f32>,
    /// True when interval ratios suggest overlapping subdivisions
    pub polyrhythmic: bool,
    /// Normalized Shannon entropy of the interval distribution, in [0, 1]
    pub temporal_complexity: f32,
}

impl RhythmAnalysis {
    /// Descriptors for a clip with no usable onsets
    pub fn empty() -> Self {
        Self {
            tempo: 0.0,
            peak_count: 0,
            regularity: 0.0,
            intervals: Vec::new(),
            polyrhythmic: false,
            temporal_complexity: 0.0,
        }
    }
}

/// Onset-interval rhythm analyzer
pub struct RhythmAnalyzer {
    sample_rate: u32,
    onset_detector: OnsetDetector,
    config: RhythmConfig,
}

impl RhythmAnalyzer {
    /// Create an analyzer for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self::with_config(sample_rate, OnsetConfig::default(), RhythmConfig::default())
    }

    /// Create an analyzer with explicit onset and rhythm parameters
    pub fn with_config(sample_rate: u32, onset: OnsetConfig, config: RhythmConfig) -> Self {
        Self {
            sample_rate,
            onset_detector: OnsetDetector::with_config(onset),
            config,
        }
    }

    /// Analyze the rhythm of a clip
    ///
    /// # Arguments
    /// * `samples` - Mono audio samples
    ///
    /// # Returns
    /// RhythmAnalysis; a clip with fewer than 2 onsets yields tempo 0 and
    /// regularity 0 rather than an error.
    pub fn analyze(&self, samples: &[f32]) -> RhythmAnalysis {
        let onsets = self.onset_detector.detect(samples);
        self.analyze_onsets(&onsets)
    }

    /// Derive rhythm descriptors from pre-detected onset positions
    pub fn analyze_onsets(&self, onsets: &[usize]) -> RhythmAnalysis {
        if onsets.len() < 2 {
            return RhythmAnalysis {
                peak_count: onsets.len(),
                ..RhythmAnalysis::empty()
            };
        }

        let intervals: Vec<f32> = onsets
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) as f32)
            .collect();

        let mean = intervals.iter().sum::<f32>() / intervals.len() as f32;
        let variance = intervals
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f32>()
            / intervals.len() as f32;
        let std_dev = variance.sqrt();

        let tempo = if mean > 0.0 {
            60.0 * self.sample_rate as f32 / mean
        } else {
            0.0
        };

        let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };
        let regularity = (1.0 - cv).max(0.0);

        let polyrhythmic = self.detect_polyrhythm(&intervals, onsets.len(), cv);
        let temporal_complexity = self.interval_entropy(&intervals);

        RhythmAnalysis {
            tempo,
            peak_count: onsets.len(),
            regularity,
            intervals,
            polyrhythmic,
            temporal_complexity,
        }
    }

    /// GCD-ratio polyrhythm detection
    ///
    /// Intervals are rounded to integers and divided by their collective
    /// GCD; a rich set of distinct ratios from an unsteady pulse indicates
    /// overlapping subdivisions rather than simple rubato.
    fn detect_polyrhythm(&self, intervals: &[f32], onset_count: usize, cv: f32) -> bool {
        if onset_count < self.config.polyrhythm_min_onsets || cv < self.config.polyrhythm_min_cv {
            return false;
        }

        let rounded: Vec<u64> = intervals
            .iter()
            .map(|&v| v.round().max(1.0) as u64)
            .collect();

        let mut divisor = rounded[0];
        for &value in &rounded[1..] {
            divisor = gcd(divisor, value);
        }
        if divisor == 0 {
            return false;
        }

        let mut ratios: Vec<u64> = rounded.iter().map(|&v| v / divisor).collect();
        ratios.sort_unstable();
        ratios.dedup();

        ratios.len() > self.config.polyrhythm_min_ratios
    }

    /// Shannon entropy of the interval histogram, normalized to [0, 1]
    fn interval_entropy(&self, intervals: &[f32]) -> f32 {
        let bins = self.config.complexity_bins.max(2);
        if intervals.is_empty() {
            return 0.0;
        }

        let min = intervals.iter().copied().fold(f32::INFINITY, f32::min);
        let max = intervals.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let span = max - min;
        if span < 1e-6 {
            // All intervals identical: zero entropy
            return 0.0;
        }

        let mut histogram = vec![0usize; bins];
        for &value in intervals {
            let idx = (((value - min) / span) * bins as f32) as usize;
            histogram[idx.min(bins - 1)] += 1;
        }

        let total = intervals.len() as f32;
        let entropy: f32 = histogram
            .iter()
            .filter(|&&count| count > 0)
            .map(|&count| {
                let p = count as f32 / total;
                -p * p.log2()
            })
            .sum();

        (entropy / (bins as f32).log2()).clamp(0.0, 1.0)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
