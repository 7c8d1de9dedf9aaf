// Error types for the genre analysis pipeline
//
// Two error families exist: AnalysisError for the synchronous analysis
// core (only an unusable input buffer is fatal there) and AdapterError for
// the trained-model boundary, where every failure is caught, logged and
// downgraded to "adapter absent" for that call.

use log::warn;
use std::fmt;

/// Errors surfaced by the analysis core
///
/// The pipeline degrades instead of failing: silence, NaN inputs and
/// missing features all resolve to safe defaults. The only hard failure is
/// an input the framing stage cannot work with at all.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Input buffer is empty or otherwise unusable at the framing stage
    InvalidInput { reason: String },

    /// Sample rate is zero or implausible for audio analysis
    InvalidSampleRate { sample_rate: u32 },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput { reason } => {
                write!(f, "invalid input buffer: {}", reason)
            }
            AnalysisError::InvalidSampleRate { sample_rate } => {
                write!(f, "invalid sample rate: {} Hz", sample_rate)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Errors raised at the trained-model adapter boundary
///
/// None of these propagate past `run_adapter`; they are logged and the
/// classification proceeds heuristically within the same call.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// Model weights could not be loaded or parsed
    LoadFailed { reason: String },

    /// Inference call failed mid-prediction
    Inference { reason: String },

    /// Adapter returned a result the core cannot interpret
    MalformedResult { reason: String },

    /// Adapter did not answer within the bounded wait
    Timeout { waited_ms: u64 },
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::LoadFailed { reason } => {
                write!(f, "model load failed: {}", reason)
            }
            AdapterError::Inference { reason } => {
                write!(f, "model inference failed: {}", reason)
            }
            AdapterError::MalformedResult { reason } => {
                write!(f, "malformed adapter result: {}", reason)
            }
            AdapterError::Timeout { waited_ms } => {
                write!(f, "adapter timed out after {} ms", waited_ms)
            }
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        AdapterError::LoadFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::LoadFailed {
            reason: err.to_string(),
        }
    }
}

/// Log an adapter failure as a degraded-mode event
///
/// Called whenever the trained-model boundary misbehaves; the caller then
/// continues as if no adapter were configured for this call.
pub fn log_adapter_degraded(err: &AdapterError, context: &str) {
    warn!(
        "[Adapter] Degraded to heuristic path in {}: {}",
        context, err
    );
}
