//! # Fast Fourier Transform (FFT) Module
//!
//! This module provides the spectral side of the pitch pipeline: an in-place
//! radix-2 transform over split real/imaginary buffers, the matching inverse,
//! magnitude extraction and the Hann analysis window.
//!
//! ## Features
//! - Iterative Cooley-Tukey transform, no recursion, O(N log N)
//! - Natural frequency ordering: DC at index 0, Nyquist at index N/2
//! - Hann windowing for reduced spectral leakage
//! - Structural checks before any work is done

use crate::error::{Result, TunerError};
use std::f32::consts::PI;

/// Applies a Hann window to a block, returning the windowed copy.
///
/// Sample `i` is scaled by `0.5 * (1 - cos(2*pi*i / (N - 1)))`, so both ends of
/// the block are tapered to zero. Blocks shorter than two samples are
/// returned unchanged.
///
/// # Arguments
/// * `samples` - Audio block to window
///
/// # Returns
/// * `Vec<f32>` - Windowed samples, same length as the input
pub fn hann_window(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    if n < 2 {
        return samples.to_vec();
    }
    let n_minus_1 = (n - 1) as f32;
    samples
        .iter()
        .enumerate()
        .map(|(i, &sample)| {
            let multiplier = 0.5 * (1.0 - (2.0 * PI * i as f32 / n_minus_1).cos());
            sample * multiplier
        })
        .collect()
}

/// Checks that a real/imaginary buffer pair can be transformed.
fn check_buffers(real: &[f32], imag: &[f32]) -> Result<()> {
    let n = real.len();
    if !n.is_power_of_two() {
        return Err(TunerError::InvalidInput(format!(
            "transform length must be a positive power of two, got {n}"
        )));
    }
    if imag.len() != n {
        return Err(TunerError::InvalidInput(format!(
            "real and imaginary buffers differ in length ({n} vs {})",
            imag.len()
        )));
    }
    Ok(())
}

/// Performs a forward FFT in place on split real/imaginary buffers.
///
/// The buffers are first permuted into bit-reversed order, then combined
/// stage by stage (butterflies of size 2, 4, 8, ... N). For butterfly `k` in a
/// stage of size `size` the twiddle angle is `-2*pi*k*(N/size)/N`, read from a
/// table of `N/2` precomputed factors.
///
/// # Arguments
/// * `real` - Real components (modified in-place)
/// * `imag` - Imaginary components (modified in-place)
///
/// # Errors
/// * `TunerError::InvalidInput` - Length is not a positive power of two, or the
///   buffers differ in length
pub fn transform(real: &mut [f32], imag: &mut [f32]) -> Result<()> {
    check_buffers(real, imag)?;
    let n = real.len();
    if n == 1 {
        return Ok(());
    }

    // Bit-reversal permutation
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
    }

    let twiddles: Vec<(f32, f32)> = (0..n / 2)
        .map(|j| {
            let angle = -2.0 * PI * j as f32 / n as f32;
            (angle.cos(), angle.sin())
        })
        .collect();

    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let step = n / size;
        for start in (0..n).step_by(size) {
            for k in 0..half {
                let (w_re, w_im) = twiddles[k * step];
                let even = start + k;
                let odd = even + half;

                let t_re = real[odd] * w_re - imag[odd] * w_im;
                let t_im = real[odd] * w_im + imag[odd] * w_re;

                real[odd] = real[even] - t_re;
                imag[odd] = imag[even] - t_im;
                real[even] += t_re;
                imag[even] += t_im;
            }
        }
        size *= 2;
    }

    Ok(())
}

/// Performs an inverse FFT in place, including the 1/N scaling.
///
/// Implemented through the forward transform on the conjugated input, so it
/// shares the structural checks of [`transform`].
pub fn inverse_transform(real: &mut [f32], imag: &mut [f32]) -> Result<()> {
    check_buffers(real, imag)?;
    imag.iter_mut().for_each(|v| *v = -*v);
    transform(real, imag)?;
    let scale = 1.0 / real.len() as f32;
    for (re, im) in real.iter_mut().zip(imag.iter_mut()) {
        *re *= scale;
        *im = -*im * scale;
    }
    Ok(())
}

/// Calculates the magnitude of each frequency-domain coefficient.
///
/// # Returns
/// * `Vec<f32>` - `sqrt(re^2 + im^2)` per index, over the full spectrum
pub fn magnitudes(real: &[f32], imag: &[f32]) -> Vec<f32> {
    real.iter()
        .zip(imag)
        .map(|(re, im)| (re * re + im * im).sqrt())
        .collect()
}
