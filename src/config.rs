//! Configuration management for analysis parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. The numeric thresholds
//! in here were tuned empirically against sample recordings; treat them as
//! behavior-preserving configuration rather than derivable constants.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub pitch: PitchConfig,
    pub onset: OnsetConfig,
    pub rhythm: RhythmConfig,
    pub scale: ScaleConfig,
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
}

/// Pitch detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchConfig {
    /// RMS below this is treated as silence (no pitch)
    pub noise_floor_rms: f32,
    /// Lowest fundamental considered, in Hz
    pub min_frequency: f32,
    /// Highest fundamental considered, in Hz
    pub max_frequency: f32,
    /// Minimum normalized autocorrelation to accept a peak
    pub min_correlation: f32,
    /// Analysis frame size for contour extraction
    pub frame_size: usize,
    /// Hop between contour frames
    pub hop_size: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            noise_floor_rms: 0.005,
            min_frequency: 80.0,
            max_frequency: 1000.0,
            min_correlation: 0.3,
            frame_size: 2048,
            hop_size: 1024,
        }
    }
}

/// Onset detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnsetConfig {
    /// Short-time energy window size in samples
    pub window_size: usize,
    /// Hop size between energy frames
    pub hop_size: usize,
    /// Adaptive threshold = median + threshold_factor * stddev
    pub threshold_factor: f32,
    /// Required energy rise over the previous frame, in stddev units
    pub rise_factor: f32,
    /// Minimum spacing between accepted onsets, in hops
    pub min_spacing_hops: usize,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            hop_size: 512,
            // Fixed factor keeps the detector fully deterministic
            threshold_factor: 0.55,
            rise_factor: 0.3,
            min_spacing_hops: 2,
        }
    }
}

/// Rhythm analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmConfig {
    /// Minimum onsets before polyrhythm detection is attempted
    pub polyrhythm_min_onsets: usize,
    /// Minimum coefficient of variation for polyrhythm (too-steady pulses are excluded)
    pub polyrhythm_min_cv: f32,
    /// More than this many distinct GCD ratios flags polyrhythm
    pub polyrhythm_min_ratios: usize,
    /// Histogram bins for temporal complexity entropy
    pub complexity_bins: usize,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            polyrhythm_min_onsets: 6,
            polyrhythm_min_cv: 0.25,
            polyrhythm_min_ratios: 3,
            complexity_bins: 10,
        }
    }
}

/// Scale identification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleConfig {
    /// Histogram fraction above which a pitch class counts as present
    pub presence_threshold: f32,
    /// Penalty multiplier for observed energy outside the template
    pub out_energy_penalty: f32,
    /// Weight of template-tone coverage in the candidate score
    pub coverage_weight: f32,
    /// Weight of the explained-classes ratio in the candidate score
    pub explained_weight: f32,
    /// Bonus per chromatically adjacent pair of observed template tones
    pub adjacency_bonus: f32,
    /// Cap on the total adjacency bonus
    pub adjacency_cap: f32,
    /// Margin under which a pentatonic winner yields to the best diatonic
    pub pentatonic_margin: f32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            presence_threshold: 0.01,
            out_energy_penalty: 1.3,
            coverage_weight: 0.15,
            explained_weight: 0.15,
            adjacency_bonus: 0.05,
            adjacency_cap: 0.15,
            pentatonic_margin: 0.25,
        }
    }
}

/// Rich feature extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// FFT size for MFCC/chroma extraction
    pub fft_size: usize,
    /// Hop between feature frames
    pub hop_size: usize,
    /// Number of mel filterbank bands
    pub mel_bands: usize,
    /// Raw-audio reference kept in the bundle is bounded to this length
    pub max_clip_seconds: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            mel_bands: 26,
            max_clip_seconds: 15.0,
        }
    }
}

/// Genre classifier parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Tempo above this triggers the early octave-doubling check
    pub early_correction_tempo: f32,
    /// Percussiveness/regularity/complexity must all be below this for the early halving
    pub early_correction_ceiling: f32,
    /// Predictions below this adapter confidence are ignored
    pub model_confidence_floor: f32,
    /// Blend weight given to a trained adapter's predictions
    pub model_blend_weight: f32,
    /// Trained adapter confidence at which it fully overrides the heuristics
    pub model_override_confidence: f32,
    /// Top-two confidence ratio above which a blend label is emitted
    pub blend_window: f32,
    /// Confidence discount attached to a half-tempo plausibility fix
    pub half_tempo_discount: f32,
    /// Confidence discount attached to a double-tempo plausibility fix
    pub double_tempo_discount: f32,
    /// Predictions below this share of the total are filtered from the top-N
    pub min_confidence_pct: f32,
    /// Bounded wait for the model adapter, in milliseconds
    pub adapter_timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            early_correction_tempo: 160.0,
            early_correction_ceiling: 0.4,
            model_confidence_floor: 0.1,
            model_blend_weight: 0.4,
            model_override_confidence: 0.85,
            blend_window: 0.2,
            half_tempo_discount: 0.85,
            double_tempo_discount: 0.70,
            min_confidence_pct: 5.0,
            adapter_timeout_ms: 1500,
        }
    }
}

impl Default for AnalysisConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            pitch: PitchConfig::default(),
            onset: OnsetConfig::default(),
            rhythm: RhythmConfig::default(),
            scale: ScaleConfig::default(),
            features: FeatureConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.onset.threshold_factor, 0.55);
        assert_eq!(config.onset.window_size, 1024);
        assert_eq!(config.pitch.noise_floor_rms, 0.005);
        assert_eq!(config.rhythm.polyrhythm_min_cv, 0.25);
        assert_eq!(config.scale.out_energy_penalty, 1.3);
        assert_eq!(config.classifier.model_blend_weight, 0.4);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AnalysisConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.onset.threshold_factor, config.onset.threshold_factor);
        assert_eq!(parsed.scale.pentatonic_margin, config.scale.pentatonic_margin);
        assert_eq!(
            parsed.classifier.adapter_timeout_ms,
            config.classifier.adapter_timeout_ms
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AnalysisConfig::load_from_file("/nonexistent/genrescope.json");
        assert_eq!(config.onset.window_size, 1024);
    }
}
