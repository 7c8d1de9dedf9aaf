// Rich feature extraction - the bundle handed to classifiers
//
// This module builds the AcousticFeatureBundle consumed by the rule engine
// and by trained-model adapters. Extraction degrades gracefully: a clip too
// short for even one FFT frame yields a bundle with zeroed rich features
// and the basic-fallback marker set, never an error.
//
// Module organization:
// - fft: windowed magnitude spectra
// - mel: mel filterbank, MFCC and chroma projections
// - mod.rs: FeatureExtractor coordinator and bundle types

pub mod fft;
pub mod mel;

use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;
use fft::FftProcessor;
use mel::{chroma_projection, mfcc_from_log_mel, MelFilterbank, MFCC_SIZE};

/// Names for the 12 pitch classes, sharps convention
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Aggregate spectral shape of a clip
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralShape {
    /// Energy-weighted mean frequency in Hz
    pub centroid: f32,
    /// Spread (standard deviation) around the centroid in Hz
    pub spread: f32,
    /// 85% energy rolloff frequency in Hz
    pub rolloff: f32,
    /// Mean positive spectral difference between consecutive frames
    pub flux: f32,
}

/// Key/scale estimate attached to a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDetection {
    /// Root pitch class name ("C".."B")
    pub key: String,
    /// Scale label, e.g. "C Major (Western)"
    pub scale: String,
    /// Estimate strength in [0, 1]
    pub strength: f32,
}

/// Feature bundle passed between extraction and classification
///
/// Bundles are immutable once constructed. The source hash is derived from
/// the audio at construction time; replacing the audio means building a new
/// bundle, never patching fields of an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcousticFeatureBundle {
    mfcc: [f32; MFCC_SIZE],
    spectral: SpectralShape,
    onset_strength: f32,
    tempo: f32,
    key_detection: Option<KeyDetection>,
    raw_audio_ref: Option<Vec<f32>>,
    source_hash: String,
    basic_fallback: bool,
}

impl AcousticFeatureBundle {
    /// Mean MFCC vector across the clip (zeroed in basic-fallback mode)
    pub fn mfcc(&self) -> &[f32; MFCC_SIZE] {
        &self.mfcc
    }

    /// Aggregate spectral shape
    pub fn spectral(&self) -> &SpectralShape {
        &self.spectral
    }

    /// Mean onset strength in [0, 1]
    pub fn onset_strength(&self) -> f32 {
        self.onset_strength
    }

    /// Tempo estimate carried from rhythm analysis, in BPM
    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    /// Key estimate, when one was available or derivable
    pub fn key_detection(&self) -> Option<&KeyDetection> {
        self.key_detection.as_ref()
    }

    /// Bounded reference to the source samples
    pub fn raw_audio_ref(&self) -> Option<&[f32]> {
        self.raw_audio_ref.as_deref()
    }

    /// Deterministic fingerprint of the source audio
    ///
    /// Built from the clip length, total energy and 8 evenly sampled
    /// points; used to detect stale or duplicate inputs downstream.
    pub fn source_hash(&self) -> &str {
        &self.source_hash
    }

    /// True when the rich extractor degraded and basic defaults were used
    pub fn is_basic_fallback(&self) -> bool {
        self.basic_fallback
    }
}

/// Deterministic fingerprint of a sample buffer
///
/// Length, total energy and 8 evenly spaced samples, each rendered as raw
/// bit patterns so the hash is exact and platform-independent.
pub fn source_hash(samples: &[f32]) -> String {
    if samples.is_empty() {
        return "0".to_string();
    }

    let energy: f32 = samples.iter().map(|s| s * s).sum();
    let mut hash = format!("{:x}:{:08x}", samples.len(), energy.to_bits());

    let stride = (samples.len() / 8).max(1);
    for i in 0..8 {
        let idx = (i * stride).min(samples.len() - 1);
        hash.push_str(&format!(":{:08x}", samples[idx].to_bits()));
    }
    hash
}

/// FeatureExtractor coordinates the rich feature pipeline
///
/// Walks the clip in overlapping frames, averaging MFCC, spectral shape
/// and chroma observations into one bundle.
pub struct FeatureExtractor {
    sample_rate: u32,
    fft: FftProcessor,
    mel: MelFilterbank,
    hop_size: usize,
    max_clip_samples: usize,
}

impl FeatureExtractor {
    /// Create an extractor for the given sample rate
    pub fn new(sample_rate: u32, config: &FeatureConfig) -> Self {
        let fft = FftProcessor::new(config.fft_size);
        let mel = MelFilterbank::new(sample_rate, config.fft_size, config.mel_bands);
        let max_clip_samples = (config.max_clip_seconds * sample_rate as f32) as usize;

        Self {
            sample_rate,
            fft,
            mel,
            hop_size: config.hop_size.max(1),
            max_clip_samples,
        }
    }

    /// Extract a feature bundle from a clip
    ///
    /// # Arguments
    /// * `samples` - Mono audio samples
    /// * `tempo` - Tempo estimate from rhythm analysis, in BPM
    /// * `key` - Key estimate from scale analysis, if available
    ///
    /// Never fails: clips too short for rich extraction produce a bundle
    /// with zeroed MFCC/spectral fields and the basic-fallback marker set.
    pub fn extract(
        &self,
        samples: &[f32],
        tempo: f32,
        key: Option<KeyDetection>,
    ) -> AcousticFeatureBundle {
        let hash = source_hash(samples);
        let bounded: Option<Vec<f32>> = if samples.is_empty() {
            None
        } else {
            Some(samples[..samples.len().min(self.max_clip_samples)].to_vec())
        };

        match self.rich_features(samples) {
            Some((mfcc, spectral, chroma)) => {
                let key_detection = key.or_else(|| derive_key_from_chroma(&chroma));
                AcousticFeatureBundle {
                    mfcc,
                    spectral,
                    onset_strength: self.onset_strength(samples),
                    tempo: if tempo.is_finite() { tempo.max(0.0) } else { 0.0 },
                    key_detection,
                    raw_audio_ref: bounded,
                    source_hash: hash,
                    basic_fallback: false,
                }
            }
            None => {
                log::warn!(
                    "[Features] Rich extraction unavailable for {} samples, using basic fallback",
                    samples.len()
                );
                AcousticFeatureBundle {
                    mfcc: [0.0; MFCC_SIZE],
                    spectral: SpectralShape::default(),
                    onset_strength: self.onset_strength(samples),
                    tempo: if tempo.is_finite() { tempo.max(0.0) } else { 0.0 },
                    key_detection: key,
                    raw_audio_ref: bounded,
                    source_hash: hash,
                    basic_fallback: true,
                }
            }
        }
    }

    /// Frame-averaged MFCC, spectral shape and chroma profile
    ///
    /// Returns None when the clip cannot fill a single FFT frame.
    fn rich_features(&self, samples: &[f32]) -> Option<([f32; MFCC_SIZE], SpectralShape, [f32; 12])> {
        let fft_size = self.fft.size();
        if samples.len() < fft_size {
            return None;
        }

        let mut mfcc_acc = [0.0f32; MFCC_SIZE];
        let mut chroma_acc = [0.0f32; 12];
        let mut centroid_acc = 0.0f32;
        let mut spread_acc = 0.0f32;
        let mut rolloff_acc = 0.0f32;
        let mut flux_acc = 0.0f32;
        let mut prev_spectrum: Option<Vec<f32>> = None;
        let mut frames = 0usize;

        let mut pos = 0;
        while pos + fft_size <= samples.len() {
            let spectrum = self.fft.magnitude_spectrum(&samples[pos..pos + fft_size]);

            let log_mel = self.mel.log_mel(&spectrum);
            let mfcc = mfcc_from_log_mel(&log_mel);
            for (acc, c) in mfcc_acc.iter_mut().zip(mfcc.iter()) {
                *acc += c;
            }

            let chroma = chroma_projection(&spectrum, &self.fft, self.sample_rate);
            for (acc, c) in chroma_acc.iter_mut().zip(chroma.iter()) {
                *acc += c;
            }

            let (centroid, spread) = centroid_and_spread(&spectrum, &self.fft, self.sample_rate);
            centroid_acc += centroid;
            spread_acc += spread;
            rolloff_acc += rolloff(&spectrum, &self.fft, self.sample_rate);

            if let Some(prev) = &prev_spectrum {
                flux_acc += spectrum
                    .iter()
                    .zip(prev.iter())
                    .map(|(curr, prev)| (curr - prev).max(0.0))
                    .sum::<f32>();
            }
            prev_spectrum = Some(spectrum);

            frames += 1;
            pos += self.hop_size;
        }

        if frames == 0 {
            return None;
        }

        let n = frames as f32;
        for acc in mfcc_acc.iter_mut() {
            *acc /= n;
        }
        for acc in chroma_acc.iter_mut() {
            *acc /= n;
        }

        let spectral = SpectralShape {
            centroid: centroid_acc / n,
            spread: spread_acc / n,
            rolloff: rolloff_acc / n,
            flux: if frames > 1 {
                flux_acc / (frames - 1) as f32
            } else {
                0.0
            },
        };

        Some((mfcc_acc, spectral, chroma_acc))
    }

    /// Mean positive frame-energy rise, normalized by the loudest frame
    fn onset_strength(&self, samples: &[f32]) -> f32 {
        let window = self.hop_size * 2;
        if samples.len() < window * 2 {
            return 0.0;
        }

        let energies: Vec<f32> = samples
            .chunks(window)
            .map(|chunk| {
                let sum_squares: f32 = chunk.iter().map(|s| s * s).sum();
                (sum_squares / chunk.len() as f32).sqrt()
            })
            .collect();

        let max_energy = energies.iter().copied().fold(0.0f32, f32::max);
        if max_energy < 1e-9 {
            return 0.0;
        }

        let rises: f32 = energies
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).max(0.0))
            .sum();
        (rises / ((energies.len() - 1) as f32 * max_energy)).clamp(0.0, 1.0)
    }
}

/// Energy-weighted centroid and spread of one spectrum, in Hz
fn centroid_and_spread(spectrum: &[f32], fft: &FftProcessor, sample_rate: u32) -> (f32, f32) {
    let magnitude_sum: f32 = spectrum.iter().sum();
    if magnitude_sum < 1e-10 {
        return (0.0, 0.0);
    }

    let centroid: f32 = spectrum
        .iter()
        .enumerate()
        .map(|(bin, &mag)| fft.bin_frequency(bin, sample_rate) * mag)
        .sum::<f32>()
        / magnitude_sum;

    let variance: f32 = spectrum
        .iter()
        .enumerate()
        .map(|(bin, &mag)| {
            let d = fft.bin_frequency(bin, sample_rate) - centroid;
            d * d * mag
        })
        .sum::<f32>()
        / magnitude_sum;

    (centroid, variance.sqrt())
}

/// Frequency below which 85% of the spectral energy is contained
fn rolloff(spectrum: &[f32], fft: &FftProcessor, sample_rate: u32) -> f32 {
    let total_energy: f32 = spectrum.iter().map(|&m| m * m).sum();
    if total_energy < 1e-10 {
        return 0.0;
    }

    let threshold = 0.85 * total_energy;
    let mut cumulative = 0.0;
    for (bin, &mag) in spectrum.iter().enumerate() {
        cumulative += mag * mag;
        if cumulative >= threshold {
            return fft.bin_frequency(bin, sample_rate);
        }
    }
    fft.bin_frequency(spectrum.len() - 1, sample_rate)
}

/// Fallback key estimate from an averaged chroma profile
fn derive_key_from_chroma(chroma: &[f32; 12]) -> Option<KeyDetection> {
    let total: f32 = chroma.iter().sum();
    if total < 1e-9 {
        return None;
    }

    let (peak_class, &peak) = chroma
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))?;

    // Peakiness above a flat profile maps to strength
    let flat = total / 12.0;
    let strength = ((peak - flat) / (total - flat)).clamp(0.0, 1.0);

    Some(KeyDetection {
        key: PITCH_CLASS_NAMES[peak_class].to_string(),
        scale: "Unknown".to_string(),
        strength,
    })
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

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(44100, &FeatureConfig::default())
    }

    #[test]
    fn test_bundle_from_sine() {
        let signal = sine(44100, 440.0, 44100);
        let bundle = extractor().extract(&signal, 120.0, None);

        assert!(!bundle.is_basic_fallback());
        assert_eq!(bundle.tempo(), 120.0);
        assert!(bundle.spectral().centroid > 200.0);
        assert!(bundle.mfcc().iter().any(|&c| c.abs() > 1e-6));
        assert!(bundle.raw_audio_ref().is_some());
    }

    #[test]
    fn test_short_clip_degrades_to_basic() {
        let signal = sine(44100, 440.0, 256);
        let bundle = extractor().extract(&signal, 0.0, None);

        assert!(bundle.is_basic_fallback());
        assert!(bundle.mfcc().iter().all(|&c| c == 0.0));
        assert_eq!(bundle.spectral().centroid, 0.0);
    }

    #[test]
    fn test_source_hash_deterministic_and_input_sensitive() {
        let a = sine(44100, 440.0, 4096);
        let mut b = a.clone();
        b[100] += 0.25;

        assert_eq!(source_hash(&a), source_hash(&a));
        assert_ne!(source_hash(&a), source_hash(&b));
    }

    #[test]
    fn test_raw_audio_ref_bounded() {
        // 20 seconds of audio must be trimmed to the 15 second cap
        let long = vec![0.1f32; 44100 * 20];
        let bundle = extractor().extract(&long, 0.0, None);
        assert_eq!(bundle.raw_audio_ref().unwrap().len(), 44100 * 15);
    }

    #[test]
    fn test_key_derived_from_chroma_when_absent() {
        let signal = sine(44100, 440.0, 44100);
        let bundle = extractor().extract(&signal, 0.0, None);

        let key = bundle.key_detection().expect("key should be derived");
        assert_eq!(key.key, "A");
        assert!(key.strength > 0.0);
    }

    #[test]
    fn test_nan_tempo_defaulted() {
        let signal = sine(44100, 440.0, 8192);
        let bundle = extractor().extract(&signal, f32::NAN, None);
        assert_eq!(bundle.tempo(), 0.0);
    }
}
