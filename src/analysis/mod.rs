// Analysis module - the clip analysis pipeline
//
// This module orchestrates the full pipeline for one clip:
//
//   samples -> onsets/rhythm -> spectral profile -> pitch contour -> scale
//           -> feature bundle -> genre classification
//
// Everything is synchronous CPU work except the optional trained-model
// call, which analyze_with_adapter awaits behind a bounded timeout. Each
// call owns its own intermediate structures; the only cross-call state is
// the spectral analyzer's previous-frame memory, which the facade resets
// per clip so repeated analyses of identical input stay bit-identical.

pub mod onset;
pub mod pitch;
pub mod rhythm;
pub mod scale;
pub mod spectral;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classify::adapter::{run_adapter, ModelAdapter, ModelAdapterResult};
use crate::classify::{ClassificationProvenance, GenreClassifier};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::{AcousticFeatureBundle, FeatureExtractor, KeyDetection, PITCH_CLASS_NAMES};

use crate::classify::genre::GenrePrediction;
use pitch::PitchDetector;
use rhythm::{RhythmAnalysis, RhythmAnalyzer};
use scale::{ScaleAnalysis, ScaleIdentifier};
use spectral::{SpectralAnalyzer, SpectralProfile};

/// Complete result of analyzing one clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub sample_rate: u32,
    pub duration_seconds: f32,
    pub rhythm: RhythmAnalysis,
    pub scale: ScaleAnalysis,
    pub spectral: SpectralProfile,
    /// Ranked genre predictions, descending, 3-5 entries
    pub predictions: Vec<GenrePrediction>,
    /// Debug/provenance side-channel; the predictions stand alone without it
    pub provenance: ClassificationProvenance,
    /// Fingerprint of the analyzed audio
    pub source_hash: String,
    /// True when rich feature extraction degraded to basic defaults
    pub basic_features: bool,
}

/// Long-lived analyzer that owns the pipeline components
///
/// Construct one per stream of clips; concurrent analyses belong on
/// separate instances (the flux memory is the one piece of per-instance
/// state). Construction is cheap enough to build fresh instances in tests.
pub struct GenreAnalyzer {
    sample_rate: u32,
    config: AnalysisConfig,
    pitch: PitchDetector,
    rhythm: RhythmAnalyzer,
    spectral: SpectralAnalyzer,
    scale: ScaleIdentifier,
    features: FeatureExtractor,
    classifier: GenreClassifier,
}

impl GenreAnalyzer {
    /// Create an analyzer for the given sample rate
    pub fn new(sample_rate: u32, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate { sample_rate });
        }

        Ok(Self {
            sample_rate,
            pitch: PitchDetector::with_config(sample_rate, config.pitch.clone()),
            rhythm: RhythmAnalyzer::with_config(
                sample_rate,
                config.onset.clone(),
                config.rhythm.clone(),
            ),
            spectral: SpectralAnalyzer::new(sample_rate, &config.features),
            scale: ScaleIdentifier::with_config(config.scale.clone()),
            features: FeatureExtractor::new(sample_rate, &config.features),
            classifier: GenreClassifier::with_config(config.classifier.clone()),
            config,
        })
    }

    /// Analyze a clip heuristically (no model adapter)
    pub fn analyze(&mut self, samples: &[f32]) -> Result<AnalysisReport, AnalysisError> {
        self.analyze_inner(samples, None)
    }

    /// Analyze a clip, consulting a model adapter with a bounded wait
    ///
    /// Adapter failure, timeout or an untrained result all degrade to the
    /// heuristic path within this same call.
    pub async fn analyze_with_adapter(
        &mut self,
        samples: &[f32],
        adapter: &ModelAdapter,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.validate_input(samples)?;

        let descriptors = self.extract_descriptors(samples);
        let timeout = Duration::from_millis(self.config.classifier.adapter_timeout_ms);
        let adapter_result = run_adapter(adapter, &descriptors.bundle, timeout).await;

        Ok(self.finish_report(samples, descriptors, adapter_result))
    }

    fn analyze_inner(
        &mut self,
        samples: &[f32],
        adapter_result: Option<ModelAdapterResult>,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.validate_input(samples)?;
        let descriptors = self.extract_descriptors(samples);
        Ok(self.finish_report(samples, descriptors, adapter_result))
    }

    fn validate_input(&self, samples: &[f32]) -> Result<(), AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput {
                reason: "empty sample buffer".to_string(),
            });
        }
        Ok(())
    }

    /// Run the descriptor stages and build the feature bundle
    fn extract_descriptors(&mut self, samples: &[f32]) -> ClipDescriptors {
        tracing::debug!("[Analyzer] Analyzing {} samples", samples.len());

        // Fresh flux memory per clip keeps repeated analyses bit-identical
        self.spectral.reset();

        let rhythm = self.rhythm.analyze(samples);
        tracing::debug!(
            "[Analyzer] Rhythm: {:.1} BPM from {} onsets (regularity {:.2})",
            rhythm.tempo,
            rhythm.peak_count,
            rhythm.regularity
        );

        let spectral = self.spectral.analyze(samples, rhythm.peak_count);
        let pitches = self.pitch.contour(samples);
        let scale = self.scale.identify(&pitches);
        tracing::debug!(
            "[Analyzer] Scale: {} (confidence {:.2}) from {} voiced frames",
            scale.scale,
            scale.confidence,
            pitches.len()
        );

        let key = key_from_scale(&scale);
        let bundle = self.features.extract(samples, rhythm.tempo, key);

        ClipDescriptors {
            rhythm,
            scale,
            spectral,
            bundle,
        }
    }

    fn finish_report(
        &self,
        samples: &[f32],
        descriptors: ClipDescriptors,
        adapter_result: Option<ModelAdapterResult>,
    ) -> AnalysisReport {
        let ClipDescriptors {
            rhythm,
            scale,
            spectral,
            bundle,
        } = descriptors;

        let outcome = self.classifier.classify(
            &rhythm,
            &scale,
            &spectral,
            Some(&bundle),
            adapter_result.as_ref(),
        );

        tracing::info!(
            "[Analyzer] Top prediction: {} ({}%)",
            outcome.predictions[0].genre,
            outcome.predictions[0].confidence
        );

        AnalysisReport {
            sample_rate: self.sample_rate,
            duration_seconds: samples.len() as f32 / self.sample_rate as f32,
            rhythm,
            scale,
            spectral,
            predictions: outcome.predictions,
            provenance: outcome.provenance,
            source_hash: bundle.source_hash().to_string(),
            basic_features: bundle.is_basic_fallback(),
        }
    }

    /// The classifier this analyzer uses (handy for advisory BPM checks)
    pub fn classifier(&self) -> &GenreClassifier {
        &self.classifier
    }
}

/// Mid-level descriptors produced for one clip before classification
struct ClipDescriptors {
    rhythm: RhythmAnalysis,
    scale: ScaleAnalysis,
    spectral: SpectralProfile,
    bundle: AcousticFeatureBundle,
}

/// Carry the scale result into the feature bundle's key slot
fn key_from_scale(scale: &ScaleAnalysis) -> Option<KeyDetection> {
    let root = scale.scale.split_whitespace().next()?;
    if !PITCH_CLASS_NAMES.contains(&root) {
        // "Chromatic" / "Unknown" labels carry no root
        return None;
    }
    Some(KeyDetection {
        key: root.to_string(),
        scale: scale.scale.clone(),
        strength: scale.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> GenreAnalyzer {
        GenreAnalyzer::new(44100, AnalysisConfig::default()).unwrap()
    }

    /// Decaying click every beat at the given BPM
    fn click_track(sample_rate: u32, bpm: f32, seconds: f32) -> Vec<f32> {
        let total = (sample_rate as f32 * seconds) as usize;
        let interval = (60.0 * sample_rate as f32 / bpm) as usize;
        let mut signal = vec![0.0; total];

        let mut pos = 0;
        while pos < total {
            for offset in 0..600 {
                if pos + offset < total {
                    signal[pos + offset] = 0.9 * (-(offset as f32) / 120.0).exp();
                }
            }
            pos += interval;
        }
        signal
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let result = GenreAnalyzer::new(0, AnalysisConfig::default());
        assert!(matches!(
            result,
            Err(AnalysisError::InvalidSampleRate { sample_rate: 0 })
        ));
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let mut analyzer = analyzer();
        let result = analyzer.analyze(&[]);
        assert!(matches!(result, Err(AnalysisError::InvalidInput { .. })));
    }

    #[test]
    fn test_silence_produces_well_formed_report() {
        let mut analyzer = analyzer();
        let report = analyzer.analyze(&vec![0.0; 44100]).unwrap();

        assert_eq!(report.rhythm.tempo, 0.0);
        assert_eq!(report.rhythm.regularity, 0.0);
        assert_eq!(report.scale.scale, "Unknown");
        assert!(!report.predictions.is_empty());
        let total: u32 = report.predictions.iter().map(|p| p.confidence as u32).sum();
        assert!(total <= 100);
    }

    #[test]
    fn test_click_track_tempo_and_regularity() {
        let mut analyzer = analyzer();
        let report = analyzer.analyze(&click_track(44100, 100.0, 8.0)).unwrap();

        assert!(
            (report.rhythm.tempo - 100.0).abs() <= 2.0,
            "expected 100 +/- 2 BPM, got {:.2}",
            report.rhythm.tempo
        );
        assert!(
            report.rhythm.regularity > 0.9,
            "regularity {:.3}",
            report.rhythm.regularity
        );
    }

    #[test]
    fn test_repeated_analysis_is_bit_identical() {
        let mut analyzer = analyzer();
        let signal = click_track(44100, 120.0, 4.0);

        let first = analyzer.analyze(&signal).unwrap();
        let second = analyzer.analyze(&signal).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_key_from_scale_parses_root() {
        let key = key_from_scale(&ScaleAnalysis {
            scale: "D# Dorian (Western Modal)".to_string(),
            score: 1.0,
            confidence: 0.8,
        })
        .unwrap();
        assert_eq!(key.key, "D#");
        assert_eq!(key.strength, 0.8);

        assert!(key_from_scale(&ScaleAnalysis {
            scale: "Chromatic".to_string(),
            score: 1.0,
            confidence: 0.9,
        })
        .is_none());
        assert!(key_from_scale(&ScaleAnalysis::unknown()).is_none());
    }
}
