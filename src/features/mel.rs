// Mel-domain feature extraction - log-mel spectra, MFCCs and chroma
//
// The mel filterbank uses the standard 2595*log10(1 + f/700) warping with
// triangular filters. MFCCs are the DCT-II of the log-mel energies, kept to
// the first 13 coefficients. The chroma projection folds spectrum bins onto
// the 12 pitch classes.

use crate::features::fft::FftProcessor;

/// Number of MFCC coefficients kept
pub const MFCC_SIZE: usize = 13;

/// Triangular mel filterbank over `num_bins` spectrum bins
pub struct MelFilterbank {
    filters: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build a filterbank of `mel_bands` triangular filters
    pub fn new(sample_rate: u32, fft_size: usize, mel_bands: usize) -> Self {
        let num_bins = fft_size / 2 + 1;
        let f_max = sample_rate as f32 / 2.0;

        let mel_min = hz_to_mel(0.0);
        let mel_max = hz_to_mel(f_max);

        // Band edges evenly spaced on the mel axis, mapped back to bins
        let bin_points: Vec<usize> = (0..mel_bands + 2)
            .map(|i| {
                let mel = mel_min + (mel_max - mel_min) * i as f32 / (mel_bands + 1) as f32;
                let hz = mel_to_hz(mel);
                (((fft_size as f32 + 1.0) * hz / sample_rate as f32).floor() as usize)
                    .min(num_bins - 1)
            })
            .collect();

        let mut filters = vec![vec![0.0; num_bins]; mel_bands];
        for (m, filter) in filters.iter_mut().enumerate() {
            let left = bin_points[m];
            let center = bin_points[m + 1];
            let right = bin_points[m + 2];

            for k in left..center {
                filter[k] = (k - left) as f32 / (center - left).max(1) as f32;
            }
            for k in center..right {
                filter[k] = (right - k) as f32 / (right - center).max(1) as f32;
            }
        }

        Self { filters }
    }

    /// Project a magnitude spectrum onto log-mel band energies
    pub fn log_mel(&self, spectrum: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .iter()
                    .zip(spectrum.iter())
                    .map(|(w, m)| w * m)
                    .sum();
                (energy + 1e-6).ln()
            })
            .collect()
    }
}

/// First `MFCC_SIZE` cepstral coefficients of a log-mel frame (DCT-II)
pub fn mfcc_from_log_mel(log_mel: &[f32]) -> [f32; MFCC_SIZE] {
    let mut coeffs = [0.0f32; MFCC_SIZE];
    let n = log_mel.len();
    if n == 0 {
        return coeffs;
    }

    for (k, coeff) in coeffs.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (m, &e) in log_mel.iter().enumerate() {
            acc += e
                * (std::f32::consts::PI * k as f32 * (m as f32 + 0.5) / n as f32).cos();
        }
        *coeff = acc;
    }
    coeffs
}

/// Fold a magnitude spectrum onto the 12 pitch classes
///
/// Bins below 55 Hz (well under the lowest analyzed fundamental) are
/// skipped to keep DC leakage out of the profile. The result is normalized
/// to sum to 1 when any energy is present.
pub fn chroma_projection(spectrum: &[f32], fft: &FftProcessor, sample_rate: u32) -> [f32; 12] {
    let mut chroma = [0.0f32; 12];

    for (bin, &mag) in spectrum.iter().enumerate() {
        let freq = fft.bin_frequency(bin, sample_rate);
        if freq < 55.0 {
            continue;
        }
        let midi = 12.0 * (freq / 440.0).log2() + 69.0;
        let class = (midi.round() as i32).rem_euclid(12) as usize;
        chroma[class] += mag;
    }

    let total: f32 = chroma.iter().sum();
    if total > 1e-9 {
        for c in chroma.iter_mut() {
            *c /= total;
        }
    }
    chroma
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}
