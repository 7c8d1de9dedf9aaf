// GenreClassifier - rule-based scoring with optional model fusion
//
// The classifier is a linear pipeline of scoring passes over one mutable
// score table, not a state machine:
//
// 1. Input sanitization (NaN/missing -> safe defaults, ratios clamped)
// 2. Early tempo correction (octave-doubling artifacts halved up front)
// 3. Independent per-feature passes (passes.rs)
// 4. Ordered cross-feature disambiguation guards (rules.rs)
// 5. Adaptive re-weighting of the top three candidates
// 6. MFCC nudges and optional trained-model fusion
// 7. Clamp, normalize and rank into percentages
// 8. Blend-label detection for near-ties
// 9. BPM-plausibility annotation (advisory, never mutates the ranking)
//
// Stage order is load-bearing: the guards assume the per-feature passes
// already ran (their penalties correct accumulated scores), and the
// re-weighting assumes the guards already settled which genres lead.

pub mod adapter;
pub mod genre;
pub mod passes;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::analysis::rhythm::RhythmAnalysis;
use crate::analysis::scale::ScaleAnalysis;
use crate::analysis::spectral::SpectralProfile;
use crate::config::ClassifierConfig;
use crate::features::AcousticFeatureBundle;

use adapter::ModelAdapterResult;
use genre::{Genre, GenrePrediction, GenreScores};
use rules::GUARD_RULES;

/// Sanitized feature view shared by every pass and guard
#[derive(Debug, Clone)]
pub struct ClassifierInputs {
    pub tempo: f32,
    pub regularity: f32,
    pub complexity: f32,
    pub polyrhythmic: bool,
    pub percussiveness: f32,
    pub brightness: f32,
    pub centroid: f32,
    pub scale_label: String,
    pub scale_confidence: f32,
}

impl ClassifierInputs {
    fn sanitize(rhythm: &RhythmAnalysis, scale: &ScaleAnalysis, spectral: &SpectralProfile) -> Self {
        Self {
            tempo: finite_or(rhythm.tempo, 0.0).clamp(0.0, 400.0),
            regularity: finite_or(rhythm.regularity, 0.0).clamp(0.0, 1.0),
            complexity: finite_or(rhythm.temporal_complexity, 0.0).clamp(0.0, 1.0),
            polyrhythmic: rhythm.polyrhythmic,
            percussiveness: finite_or(spectral.percussiveness, 0.0).clamp(0.0, 1.0),
            brightness: finite_or(spectral.brightness, 0.0).clamp(0.0, 1.0),
            centroid: finite_or(spectral.centroid, 0.0).max(0.0),
            scale_label: scale.scale.clone(),
            scale_confidence: finite_or(scale.confidence, 0.0).clamp(0.0, 1.0),
        }
    }
}

fn finite_or(value: f32, default: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// A tempo correction applied or suggested by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoCorrection {
    /// "0.5x" or "2x"
    pub factor: String,
    pub from: f32,
    pub to: f32,
}

/// Suggested tempo fix attached to the BPM-plausibility verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoSuggestion {
    /// "0.5x" or "2x"
    pub factor: String,
    pub tempo: f32,
    /// How much to discount confidence if the suggestion is adopted
    pub confidence_discount: f32,
}

/// Advisory check of the detected tempo against the winner's BPM range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpmVerdict {
    pub genre: String,
    pub tempo: f32,
    pub in_range: bool,
    pub suggestion: Option<TempoSuggestion>,
}

/// How the trained-model adapter participated in one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterUsage {
    /// No adapter result was available
    Absent,
    /// A result arrived but was untrained or too unconfident to use
    Ignored,
    /// Trained predictions were blended into the score table
    Blended,
    /// Trained predictions replaced the heuristic ranking outright
    Overrode,
}

/// One genre's raw score snapshot for the provenance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    pub genre: String,
    pub score: f32,
}

/// Debug/provenance side-channel attached next to the prediction list
///
/// Everything in here is advisory; the primary prediction list is complete
/// without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationProvenance {
    pub raw_scores: Vec<RawScore>,
    pub tempo_before: f32,
    pub tempo_after: f32,
    pub early_correction: Option<TempoCorrection>,
    pub bpm_verdict: BpmVerdict,
    pub blend_detected: bool,
    pub adapter: AdapterUsage,
}

/// Ranked predictions plus the provenance side-channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub predictions: Vec<GenrePrediction>,
    pub provenance: ClassificationProvenance,
}

/// The rule-based genre scoring engine
pub struct GenreClassifier {
    config: ClassifierConfig,
}

impl GenreClassifier {
    /// Create a classifier with default parameters
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }

    /// Create a classifier with explicit configuration parameters
    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify one clip's descriptors into a ranked genre list
    ///
    /// Always returns a non-empty, descending prediction list; missing or
    /// NaN inputs are defaulted, never rejected.
    pub fn classify(
        &self,
        rhythm: &RhythmAnalysis,
        scale: &ScaleAnalysis,
        spectral: &SpectralProfile,
        features: Option<&AcousticFeatureBundle>,
        adapter_result: Option<&ModelAdapterResult>,
    ) -> ClassificationOutcome {
        // Stage 1: sanitize
        let mut inputs = ClassifierInputs::sanitize(rhythm, scale, spectral);
        let tempo_before = inputs.tempo;

        // Stage 2: early tempo correction. A very fast reading without the
        // percussive density to back it up is an octave-doubling artifact.
        let ceiling = self.config.early_correction_ceiling;
        let early_correction = if inputs.tempo > self.config.early_correction_tempo
            && inputs.percussiveness < ceiling
            && inputs.regularity < ceiling
            && inputs.complexity < ceiling
        {
            let halved = inputs.tempo / 2.0;
            log::info!(
                "[Classifier] Early tempo correction: {:.1} -> {:.1} BPM (sparse signal at doubled reading)",
                inputs.tempo,
                halved
            );
            let correction = TempoCorrection {
                factor: "0.5x".to_string(),
                from: inputs.tempo,
                to: halved,
            };
            inputs.tempo = halved;
            Some(correction)
        } else {
            None
        };

        // Stage 3: independent per-feature passes
        let mut scores = GenreScores::new();
        passes::tempo_pass(&inputs, &mut scores);
        passes::regularity_pass(&inputs, &mut scores);
        passes::percussiveness_pass(&inputs, &mut scores);
        passes::brightness_pass(&inputs, &mut scores);
        passes::scale_pass(&inputs, &mut scores);
        passes::complexity_pass(&inputs, &mut scores);
        passes::polyrhythm_pass(&inputs, &mut scores);

        // Stage 4: disambiguation guards, fixed order
        for rule in GUARD_RULES.iter() {
            if (rule.trigger)(&inputs) {
                log::debug!("[Classifier] Guard fired: {}", rule.name);
                (rule.apply)(&inputs, &mut scores);
            }
        }

        // Stage 5: second-order alignment adjustment for the leaders
        self.reweight_leaders(&inputs, &mut scores);

        // Stage 6: MFCC nudges, then model fusion
        if let Some(bundle) = features {
            mfcc_nudges(bundle.mfcc(), &mut scores);
        }
        let adapter_usage = self.fuse_adapter(adapter_result, &mut scores);

        let raw_scores: Vec<RawScore> = scores
            .entries()
            .map(|(genre, score)| RawScore {
                genre: genre.as_str().to_string(),
                score,
            })
            .collect();

        // Stage 7: normalize and rank
        let (mut predictions, top_genre) = self.normalize(&scores);

        // Stage 8: blend detection
        let blend_detected = self.detect_blend(&mut predictions);

        // Stage 9: advisory BPM plausibility for the winning genre
        let bpm_verdict = self.bpm_plausibility(inputs.tempo, top_genre);

        ClassificationOutcome {
            predictions,
            provenance: ClassificationProvenance {
                raw_scores,
                tempo_before,
                tempo_after: inputs.tempo,
                early_correction,
                bpm_verdict,
                blend_detected,
                adapter: adapter_usage,
            },
        }
    }

    /// Re-score the top three genres by how well the clip aligns with each
    /// genre's canonical profile. Every sub-term is weighted at 0.3 or less
    /// so this stays a correction layer, not a replacement for the passes.
    fn reweight_leaders(&self, inputs: &ClassifierInputs, scores: &mut GenreScores) {
        let leaders: Vec<Genre> = scores
            .ranked()
            .into_iter()
            .take(3)
            .map(|(genre, _)| genre)
            .collect();

        for genre in leaders {
            let profile = genre.profile();
            let (lo, hi) = profile.bpm_range;

            let tempo_align = if profile.tempo_in_range(inputs.tempo) {
                1.0
            } else {
                let distance = if inputs.tempo < lo {
                    lo - inputs.tempo
                } else {
                    inputs.tempo - hi
                };
                (1.0 - distance / (hi - lo)).clamp(0.0, 1.0)
            };

            let regularity_align =
                1.0 - (inputs.regularity - profile.target_regularity).abs().min(1.0);
            let poly_observed = if inputs.polyrhythmic { 1.0 } else { 0.0 };
            let poly_align = 1.0 - (poly_observed - profile.polyrhythm_affinity).abs();
            let brightness_align =
                1.0 - (inputs.brightness - profile.target_brightness).abs().min(1.0);

            let adjustment = 0.3 * tempo_align
                + 0.25 * regularity_align
                + 0.2 * poly_align
                + 0.25 * brightness_align;
            scores.add(genre, adjustment);
        }
    }

    /// Fold an adapter result into the score table
    ///
    /// Untrained or unconfident results are ignored outright; trained
    /// results blend at a fixed weight, or replace the ranking entirely
    /// when the model is confident enough to trust on its own.
    fn fuse_adapter(
        &self,
        result: Option<&ModelAdapterResult>,
        scores: &mut GenreScores,
    ) -> AdapterUsage {
        let Some(result) = result else {
            return AdapterUsage::Absent;
        };
        if !result.model_trained {
            log::debug!("[Classifier] Adapter result untrained, ignoring");
            return AdapterUsage::Ignored;
        }
        if !(result.confidence > self.config.model_confidence_floor) {
            log::debug!(
                "[Classifier] Adapter confidence {:.2} under floor, ignoring",
                result.confidence
            );
            return AdapterUsage::Ignored;
        }

        let mut adapter_scores = GenreScores::new();
        let mut adapter_total = 0.0f32;
        for prediction in &result.predictions {
            let Some(genre) = Genre::from_label(&prediction.genre) else {
                continue;
            };
            let confidence = finite_or(prediction.confidence, 0.0).clamp(0.0, 1.0);
            adapter_scores.add(genre, confidence);
            adapter_total += confidence;
        }
        if adapter_total <= 0.0 {
            log::warn!("[Classifier] Adapter predictions map to no known genre, ignoring");
            return AdapterUsage::Ignored;
        }

        if result.confidence >= self.config.model_override_confidence {
            *scores = adapter_scores;
            return AdapterUsage::Overrode;
        }

        // Blend: both distributions normalized to unit mass, then mixed
        let heuristic_total: f32 = scores.entries().map(|(_, s)| s.max(0.0)).sum();
        let weight = self.config.model_blend_weight;
        for genre in Genre::ALL {
            let heuristic = if heuristic_total > 0.0 {
                scores.get(genre).max(0.0) / heuristic_total
            } else {
                0.0
            };
            let model = adapter_scores.get(genre) / adapter_total;
            scores.set(genre, (1.0 - weight) * heuristic + weight * model);
        }
        AdapterUsage::Blended
    }

    /// Clamp scores, convert to percentages and build the top-N list
    ///
    /// Returns the predictions plus the top single genre (used for the BPM
    /// verdict even when a blend label replaces the displayed winner).
    fn normalize(&self, scores: &GenreScores) -> (Vec<GenrePrediction>, Genre) {
        let clamped: Vec<(Genre, f32)> = scores
            .entries()
            .map(|(genre, score)| (genre, score.max(0.0)))
            .collect();
        let total: f32 = clamped.iter().map(|(_, s)| s).sum();

        if total > 1e-9 {
            let mut ranked: Vec<(Genre, f32)> = clamped
                .into_iter()
                .map(|(genre, score)| (genre, score / total * 100.0))
                .collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            let top_genre = ranked[0].0;

            let survivors: Vec<&(Genre, f32)> = ranked
                .iter()
                .filter(|(_, pct)| *pct > self.config.min_confidence_pct)
                .collect();

            // With too few meaningful survivors the filter is waived so the
            // caller never sees a near-empty list
            let predictions: Vec<GenrePrediction> = if survivors.len() >= 3 {
                survivors
                    .into_iter()
                    .take(5)
                    .map(|(genre, pct)| GenrePrediction {
                        genre: genre.as_str().to_string(),
                        confidence: *pct as u8,
                    })
                    .collect()
            } else {
                ranked
                    .iter()
                    .take(5)
                    .map(|(genre, pct)| GenrePrediction {
                        genre: genre.as_str().to_string(),
                        confidence: *pct as u8,
                    })
                    .collect()
            };
            (predictions, top_genre)
        } else {
            // Every score non-positive: rank relative to the best raw score
            // so the output is still a well-formed descending list
            let max_score = scores.max_score();
            let mut ranked: Vec<(Genre, f32)> = scores
                .entries()
                .map(|(genre, score)| (genre, 1.0 / (1.0 + (max_score - score))))
                .collect();
            let relative_total: f32 = ranked.iter().map(|(_, r)| r).sum();
            for (_, relative) in ranked.iter_mut() {
                *relative = *relative / relative_total * 100.0;
            }
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            let top_genre = ranked[0].0;

            let predictions = ranked
                .iter()
                .take(5)
                .map(|(genre, pct)| GenrePrediction {
                    genre: genre.as_str().to_string(),
                    confidence: *pct as u8,
                })
                .collect();
            (predictions, top_genre)
        }
    }

    /// Replace the winner with a hyphenated blend label when the top two
    /// confidences sit within the blend window of each other
    fn detect_blend(&self, predictions: &mut [GenrePrediction]) -> bool {
        if predictions.len() < 2 {
            return false;
        }
        let first = predictions[0].confidence as f32;
        let second = predictions[1].confidence as f32;
        if first > 0.0 && second >= first * (1.0 - self.config.blend_window) {
            let blended = format!("{}-{}", predictions[0].genre, predictions[1].genre);
            let averaged = ((first + second) / 2.0) as u8;
            predictions[0] = GenrePrediction {
                genre: blended,
                confidence: averaged,
            };
            true
        } else {
            false
        }
    }

    /// Check a tempo against a genre's canonical BPM range
    ///
    /// Advisory only: when the tempo is out of range, the half or double
    /// reading is tested against the range and reported with a confidence
    /// discount. The ranking itself is never mutated here.
    pub fn bpm_plausibility(&self, tempo: f32, genre: Genre) -> BpmVerdict {
        let profile = genre.profile();

        let suggestion = if profile.tempo_in_range(tempo) {
            None
        } else if profile.tempo_in_range(tempo / 2.0) {
            Some(TempoSuggestion {
                factor: "0.5x".to_string(),
                tempo: tempo / 2.0,
                confidence_discount: self.config.half_tempo_discount,
            })
        } else if profile.tempo_in_range(tempo * 2.0) {
            Some(TempoSuggestion {
                factor: "2x".to_string(),
                tempo: tempo * 2.0,
                confidence_discount: self.config.double_tempo_discount,
            })
        } else {
            None
        };

        BpmVerdict {
            genre: genre.as_str().to_string(),
            tempo,
            in_range: profile.tempo_in_range(tempo),
            suggestion,
        }
    }
}

impl Default for GenreClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Small heuristic nudges from the low-order MFCC coefficients
///
/// Independent of any trained model; a zeroed vector (degraded bundle)
/// nudges nothing.
fn mfcc_nudges(mfcc: &[f32; 13], scores: &mut GenreScores) {
    if mfcc.iter().all(|&c| c == 0.0) {
        return;
    }

    // c1 tracks the spectral tilt: positive means energy sits low
    if mfcc[1] > 0.0 {
        scores.add(Genre::HipHop, 0.25);
        scores.add(Genre::Reggae, 0.15);
        scores.add(Genre::Blues, 0.1);
    } else {
        scores.add(Genre::Electronic, 0.2);
        scores.add(Genre::Metal, 0.15);
    }
    if mfcc[2] > 0.0 {
        scores.add(Genre::Jazz, 0.1);
        scores.add(Genre::Classical, 0.1);
    }
}
