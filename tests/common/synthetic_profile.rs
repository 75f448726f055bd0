/// Sum of Gaussian bumps sampled at integer positions `0..len`.
///
/// Each bump is `(center, amplitude, sigma)`; a negative amplitude carves a
/// valley into `baseline`.
pub fn gaussian_mix(len: usize, baseline: f64, bumps: &[(f64, f64, f64)]) -> Vec<f64> {
    assert!(len > 0, "profile length must be positive");
    (0..len)
        .map(|i| {
            let x = i as f64;
            baseline
                + bumps
                    .iter()
                    .map(|&(c, a, s)| a * (-(x - c).powi(2) / (2.0 * s * s)).exp())
                    .sum::<f64>()
        })
        .collect()
}

/// Two shield walls at 2 and 18 (sigma 2, amplitude 10) over 21 samples.
pub fn twin_peaks() -> Vec<f64> {
    gaussian_mix(21, 0.0, &[(2.0, 10.0, 2.0), (18.0, 10.0, 2.0)])
}

/// Deterministic pseudo-noise in `[-amplitude, amplitude]` (LCG, fixed seed).
pub fn add_noise(samples: &mut [f64], amplitude: f64, seed: u64) {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    for v in samples.iter_mut() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
        *v += amplitude * (2.0 * unit - 1.0);
    }
}
