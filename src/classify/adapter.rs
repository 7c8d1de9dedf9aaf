// Trained-model adapter boundary
//
// The classifier core never talks to a model directly; it sees an optional
// ModelAdapterResult that already survived this boundary. run_adapter wraps
// the (potentially slow, IO-backed) prediction call in a bounded tokio
// timeout and collapses every failure mode - timeout, panic, error,
// malformed output - into None, logged as a degraded-mode event.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{log_adapter_degraded, AdapterError};
use crate::features::AcousticFeatureBundle;

use super::genre::Genre;

/// One (label, confidence) pair from an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterPrediction {
    pub genre: String,
    pub confidence: f32,
}

/// What an adapter returns for one feature bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAdapterResult {
    /// Label the model ranks first
    pub top_genre: String,
    /// Confidence of the top label, in [0, 1]
    pub confidence: f32,
    /// Full ranked prediction list
    pub predictions: Vec<AdapterPrediction>,
    /// True only when a genuinely trained model produced this result;
    /// stubs and fallbacks must report false so fusion ignores them
    pub model_trained: bool,
}

/// A pluggable genre model behind the adapter boundary
pub trait GenreModel: Send + Sync {
    /// Predict genre confidences for one feature bundle
    fn predict(&self, bundle: &AcousticFeatureBundle) -> Result<ModelAdapterResult, AdapterError>;
}

/// Adapter capability as seen by the core
///
/// Modeled as a tagged variant rather than a truthy check so the fusion
/// logic is an exhaustive match: Absent contributes nothing, Heuristic may
/// answer but is never blended, Trained results are blended or may
/// override.
pub enum ModelAdapter {
    /// No model configured
    Absent,
    /// A heuristic stub; its results carry `model_trained: false`
    Heuristic(Arc<dyn GenreModel>),
    /// A genuinely trained model
    Trained(Arc<dyn GenreModel>),
}

impl ModelAdapter {
    fn model(&self) -> Option<Arc<dyn GenreModel>> {
        match self {
            ModelAdapter::Absent => None,
            ModelAdapter::Heuristic(model) | ModelAdapter::Trained(model) => {
                Some(Arc::clone(model))
            }
        }
    }
}

/// Invoke an adapter with a bounded wait
///
/// Returns None for every failure mode: adapter absent, timeout, panic,
/// prediction error, or a result shape the core cannot use. Failures are
/// logged; the caller proceeds heuristically within the same analysis call.
pub async fn run_adapter(
    adapter: &ModelAdapter,
    bundle: &AcousticFeatureBundle,
    timeout: Duration,
) -> Option<ModelAdapterResult> {
    let model = adapter.model()?;
    let bundle = bundle.clone();

    let prediction = tokio::time::timeout(
        timeout,
        tokio::task::spawn_blocking(move || model.predict(&bundle)),
    )
    .await;

    let result = match prediction {
        Err(_) => {
            log_adapter_degraded(
                &AdapterError::Timeout {
                    waited_ms: timeout.as_millis() as u64,
                },
                "run_adapter",
            );
            return None;
        }
        Ok(Err(join_err)) => {
            log_adapter_degraded(
                &AdapterError::Inference {
                    reason: format!("adapter task failed: {}", join_err),
                },
                "run_adapter",
            );
            return None;
        }
        Ok(Ok(Err(err))) => {
            log_adapter_degraded(&err, "run_adapter");
            return None;
        }
        Ok(Ok(Ok(result))) => result,
    };

    if let Err(err) = validate_result(&result) {
        log_adapter_degraded(&err, "run_adapter");
        return None;
    }
    Some(result)
}

/// Reject result shapes the fusion step cannot interpret
fn validate_result(result: &ModelAdapterResult) -> Result<(), AdapterError> {
    if result.predictions.is_empty() {
        return Err(AdapterError::MalformedResult {
            reason: "empty prediction list".to_string(),
        });
    }
    if !result.confidence.is_finite() || !(0.0..=1.0).contains(&result.confidence) {
        return Err(AdapterError::MalformedResult {
            reason: format!("top confidence {} outside [0, 1]", result.confidence),
        });
    }
    if result
        .predictions
        .iter()
        .any(|p| !p.confidence.is_finite() || p.confidence < 0.0)
    {
        return Err(AdapterError::MalformedResult {
            reason: "non-finite or negative prediction confidence".to_string(),
        });
    }
    Ok(())
}

/// Serialized per-genre feature centroids for the bundled trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelWeights {
    pub centroids: Vec<GenreCentroid>,
}

/// One genre's centroid in normalized feature space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreCentroid {
    pub genre: String,
    /// [tempo/200, brightness-scaled centroid, onset strength, mfcc 1-4]
    pub features: Vec<f32>,
}

/// Nearest-centroid model loaded from a JSON weight file
pub struct TrainedModel {
    weights: ModelWeights,
}

impl TrainedModel {
    /// Wrap an in-memory weight set
    pub fn new(weights: ModelWeights) -> Self {
        Self { weights }
    }

    /// Load weights from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AdapterError> {
        let contents = std::fs::read_to_string(path)?;
        let weights: ModelWeights = serde_json::from_str(&contents)?;
        if weights.centroids.is_empty() {
            return Err(AdapterError::LoadFailed {
                reason: "weight file has no centroids".to_string(),
            });
        }
        Ok(Self::new(weights))
    }

    fn feature_vector(bundle: &AcousticFeatureBundle) -> Vec<f32> {
        let mfcc = bundle.mfcc();
        vec![
            (bundle.tempo() / 200.0).clamp(0.0, 2.0),
            (bundle.spectral().centroid / 8000.0).clamp(0.0, 1.0),
            bundle.onset_strength(),
            mfcc[1] / 50.0,
            mfcc[2] / 50.0,
            mfcc[3] / 50.0,
            mfcc[4] / 50.0,
        ]
    }
}

impl GenreModel for TrainedModel {
    fn predict(&self, bundle: &AcousticFeatureBundle) -> Result<ModelAdapterResult, AdapterError> {
        let observed = Self::feature_vector(bundle);

        let mut similarities: Vec<(String, f32)> = self
            .weights
            .centroids
            .iter()
            .map(|centroid| {
                let distance: f32 = centroid
                    .features
                    .iter()
                    .zip(observed.iter())
                    .map(|(c, o)| (c - o) * (c - o))
                    .sum::<f32>()
                    .sqrt();
                (centroid.genre.clone(), 1.0 / (1.0 + distance))
            })
            .collect();

        let total: f32 = similarities.iter().map(|(_, s)| s).sum();
        if total <= 0.0 {
            return Err(AdapterError::Inference {
                reason: "degenerate similarity distribution".to_string(),
            });
        }
        for (_, similarity) in similarities.iter_mut() {
            *similarity /= total;
        }
        similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let predictions: Vec<AdapterPrediction> = similarities
            .into_iter()
            .map(|(genre, confidence)| AdapterPrediction { genre, confidence })
            .collect();

        Ok(ModelAdapterResult {
            top_genre: predictions[0].genre.clone(),
            confidence: predictions[0].confidence,
            predictions,
            model_trained: true,
        })
    }
}

/// Heuristic stub used when no trained weights are available
///
/// Guesses from tempo alone and reports `model_trained: false`, which the
/// fusion step treats as "ignore me".
pub struct HeuristicStub;

impl GenreModel for HeuristicStub {
    fn predict(&self, bundle: &AcousticFeatureBundle) -> Result<ModelAdapterResult, AdapterError> {
        let tempo = bundle.tempo();
        let guess = if tempo < 70.0 {
            Genre::Ambient
        } else if tempo < 100.0 {
            Genre::Reggae
        } else if tempo < 130.0 {
            Genre::Pop
        } else {
            Genre::Electronic
        };

        Ok(ModelAdapterResult {
            top_genre: guess.as_str().to_string(),
            confidence: 0.3,
            predictions: vec![AdapterPrediction {
                genre: guess.as_str().to_string(),
                confidence: 0.3,
            }],
            model_trained: false,
        })
    }
}
