//! Profile conditioning ahead of landmark extraction.
//!
//! - Optional linear detrend: subtracts the least-squares line through all
//!   samples (index as abscissa).
//! - Optional Gaussian smoothing with half-sample symmetric reflection at the
//!   borders (`d c b a | a b c d | d c b a`).
//!
//! Neither step changes the length or the index space, so every later stage
//! reports positions that map directly back onto the raw profile.

use crate::error::ProfileError;
use crate::types::{RowProfile, MIN_PROFILE_LEN};
use log::debug;
use serde::{Deserialize, Serialize};

/// Normalizer knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeParams {
    /// Gaussian kernel radius in samples (`0` disables smoothing). The kernel
    /// uses `sigma = smoothing_window / 4`, i.e. a 4-sigma truncation.
    pub smoothing_window: usize,
    /// Remove the least-squares linear trend before smoothing.
    pub detrend: bool,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            smoothing_window: 0,
            detrend: false,
        }
    }
}

impl NormalizeParams {
    /// Shortest profile these settings accept.
    pub fn min_len(&self) -> usize {
        MIN_PROFILE_LEN.max(2 * self.smoothing_window + 1)
    }
}

/// Normalised, odd-length Gaussian kernel.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    taps: Vec<f64>,
}

impl GaussianKernel {
    /// Kernel with the given radius and `sigma = radius / 4`.
    pub fn with_radius(radius: usize) -> Self {
        Self::new(radius, radius as f64 / 4.0)
    }

    pub fn new(radius: usize, sigma: f64) -> Self {
        if radius == 0 || sigma <= 0.0 {
            return Self { taps: vec![1.0] };
        }
        let inv = 1.0 / (2.0 * sigma * sigma);
        let mut taps: Vec<f64> = (0..=2 * radius)
            .map(|k| {
                let d = k as f64 - radius as f64;
                (-d * d * inv).exp()
            })
            .collect();
        let sum: f64 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }
        Self { taps }
    }

    /// Taps in left-to-right order.
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    pub fn radius(&self) -> usize {
        self.taps.len() / 2
    }

    /// Convolve `data` with the kernel using symmetric reflection at the borders.
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let radius = self.radius() as isize;
        let mut out = Vec::with_capacity(n);
        for i in 0..n as isize {
            let mut acc = 0.0;
            for (k, &tap) in self.taps.iter().enumerate() {
                let idx = reflect_index(i + k as isize - radius, n);
                acc += tap * data[idx];
            }
            out.push(acc);
        }
        out
    }
}

/// Half-sample symmetric reflection of an out-of-range index.
fn reflect_index(mut idx: isize, len: usize) -> usize {
    let n = len as isize;
    if n <= 1 {
        return 0;
    }
    loop {
        if idx < 0 {
            idx = -idx - 1;
        } else if idx >= n {
            idx = 2 * n - idx - 1;
        } else {
            return idx as usize;
        }
    }
}

/// Subtract the least-squares line `y = m·i + k` from the samples.
pub fn detrend_linear(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return data.to_vec();
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) * 0.5;
    let mean_y = data.iter().sum::<f64>() / nf;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in data.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    data.iter()
        .enumerate()
        .map(|(i, &y)| y - (slope * i as f64 + intercept))
        .collect()
}

/// Condition a raw profile. The output keeps the id and the length.
pub fn normalize_profile(
    profile: &RowProfile,
    params: &NormalizeParams,
) -> Result<RowProfile, ProfileError> {
    let min_len = params.min_len();
    if profile.len() < min_len {
        return Err(ProfileError::invalid(format!(
            "profile '{}' has {} samples, smoothing window {} needs at least {min_len}",
            profile.id(),
            profile.len(),
            params.smoothing_window
        )));
    }

    let mut samples = if params.detrend {
        detrend_linear(profile.samples())
    } else {
        profile.samples().to_vec()
    };
    if params.smoothing_window > 0 {
        let kernel = GaussianKernel::with_radius(params.smoothing_window);
        samples = kernel.apply(&samples);
    }
    debug!(
        "normalize '{}': n={} detrend={} smoothing_window={}",
        profile.id(),
        samples.len(),
        params.detrend,
        params.smoothing_window
    );
    Ok(profile.with_samples(samples))
}
