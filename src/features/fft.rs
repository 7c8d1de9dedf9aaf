// FFT helper - windowed magnitude spectra
//
// Shared by spectral analysis and the rich feature extractor. The forward
// transform is planned once at construction; a Hann window is pre-computed
// to reduce spectral leakage.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Computes magnitude spectra from fixed-size audio windows
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a processor for the given FFT size
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let window = hann_window(fft_size);

        Self {
            fft,
            fft_size,
            window,
        }
    }

    /// FFT size this processor was planned for
    pub fn size(&self) -> usize {
        self.fft_size
    }

    /// Center frequency of spectrum bin `bin` at the given sample rate
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }

    /// Compute the magnitude spectrum of one audio window
    ///
    /// Input shorter than the FFT size is zero-padded; input longer is
    /// truncated. Only positive frequencies are returned
    /// (`fft_size / 2 + 1` bins).
    pub fn magnitude_spectrum(&self, audio: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = Vec::with_capacity(self.fft_size);
        for (sample, coeff) in audio.iter().zip(self.window.iter()) {
            buffer.push(Complex::new(sample * coeff, 0.0));
        }
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}

/// Pre-computed Hann window of the given length
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / (size as f32 - 1.0)).cos())
        })
        .collect()
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

    #[test]
    fn test_hann_window_endpoints() {
        let window = hann_window(1024);
        assert!(window[0].abs() < 1e-6);
        assert!(window[1023].abs() < 1e-6);
        assert!((window[512] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_sine_peak_bin() {
        let sample_rate = 44100;
        let processor = FftProcessor::new(2048);
        let signal = sine(sample_rate, 440.0, 2048);

        let spectrum = processor.magnitude_spectrum(&signal);
        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        let peak_freq = processor.bin_frequency(peak_bin, sample_rate);
        assert!(
            (peak_freq - 440.0).abs() < 44.0,
            "peak at {} Hz, expected near 440 Hz",
            peak_freq
        );
    }

    #[test]
    fn test_short_input_zero_padded() {
        let processor = FftProcessor::new(2048);
        let spectrum = processor.magnitude_spectrum(&[0.5; 100]);
        assert_eq!(spectrum.len(), 1025);
    }

    #[test]
    fn test_silence_spectrum_is_zero() {
        let processor = FftProcessor::new(1024);
        let spectrum = processor.magnitude_spectrum(&vec![0.0; 1024]);
        assert!(spectrum.iter().all(|&m| m < 1e-9));
    }
}
