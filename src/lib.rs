//! # Genrescope
//!
//! Music genre analysis for short audio clips, combining a deterministic
//! signal-processing pipeline with a rule-based scoring engine and an
//! optional trained-model adapter.
//!
//! ## Pipeline
//!
//! ```text
//! PCM samples -> onsets -> rhythm descriptors -+
//!             -> spectral profile             -+-> genre scoring -> ranked
//!             -> pitch contour -> scale       -+       |           top-N
//!             -> feature bundle ------------------> model fusion
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use genrescope::analyze_clip;
//!
//! let samples: Vec<f32> = vec![]; // mono, normalized to [-1.0, 1.0]
//! let report = analyze_clip(&samples, 44100)?;
//!
//! for prediction in &report.predictions {
//!     println!("{}: {}%", prediction.genre, prediction.confidence);
//! }
//! # Ok::<(), genrescope::AnalysisError>(())
//! ```

pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod features;

// Re-export main types
pub use analysis::{AnalysisReport, GenreAnalyzer};
pub use classify::adapter::{
    GenreModel, HeuristicStub, ModelAdapter, ModelAdapterResult, TrainedModel,
};
pub use classify::genre::{Genre, GenrePrediction};
pub use classify::{ClassificationOutcome, GenreClassifier};
pub use config::AnalysisConfig;
pub use error::{AdapterError, AnalysisError};
pub use features::{AcousticFeatureBundle, FeatureExtractor};

/// Analyze one clip with default configuration and no model adapter
///
/// # Arguments
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
///
/// # Errors
/// `AnalysisError::InvalidInput` for an empty buffer,
/// `AnalysisError::InvalidSampleRate` for a zero sample rate. Everything
/// else degrades internally and still produces a report.
pub fn analyze_clip(samples: &[f32], sample_rate: u32) -> Result<AnalysisReport, AnalysisError> {
    let mut analyzer = GenreAnalyzer::new(sample_rate, AnalysisConfig::default())?;
    analyzer.analyze(samples)
}
