//! Prominence-filtered peak and valley detection on a 1D profile.
//!
//! Candidates are interior local extrema; a flat run counts once, at its
//! midpoint, when both neighbours on the outside of the run agree on the
//! extremum type. Runs touching the profile border are never candidates.
//!
//! Prominence follows the isolation-depth definition: for a peak of height
//! `v`, walk outwards on each side until a strictly higher sample (or the
//! border) and remember the lowest sample passed; the prominence is the drop
//! from `v` to the higher of the two minima. Valleys use the mirrored rule.
//!
//! The separation filter is greedy in prominence order (ties: lower index),
//! applied independently per [`LandmarkKind`].

use crate::types::{Landmark, LandmarkKind, RowProfile};
use log::debug;
use serde::{Deserialize, Serialize};

/// Detector knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectParams {
    /// Candidates with a smaller prominence are discarded.
    pub min_prominence: f64,
    /// Minimum index distance between two kept landmarks of the same kind.
    /// Values `<= 1` disable the filter.
    pub min_separation: usize,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            min_prominence: 0.5,
            min_separation: 1,
        }
    }
}

/// Find peaks and valleys, ordered by index.
pub fn find_landmarks(profile: &RowProfile, params: &DetectParams) -> Vec<Landmark> {
    let data = profile.samples();
    let mut out = find_kind(data, LandmarkKind::Peak, params);
    out.extend(find_kind(data, LandmarkKind::Valley, params));
    out.sort_by_key(|l| l.index);
    debug!(
        "find_landmarks '{}': {} peaks, {} valleys (min_prominence={}, min_separation={})",
        profile.id(),
        out.iter().filter(|l| l.is_peak()).count(),
        out.iter().filter(|l| l.is_valley()).count(),
        params.min_prominence,
        params.min_separation
    );
    out
}

/// Peaks only, ordered by index.
pub fn find_peaks(profile: &RowProfile, params: &DetectParams) -> Vec<Landmark> {
    find_kind(profile.samples(), LandmarkKind::Peak, params)
}

/// Valleys only, ordered by index.
pub fn find_valleys(profile: &RowProfile, params: &DetectParams) -> Vec<Landmark> {
    find_kind(profile.samples(), LandmarkKind::Valley, params)
}

/// Valley with the smallest value (ties: lower index).
pub fn lowest_valley(landmarks: &[Landmark]) -> Option<&Landmark> {
    landmarks
        .iter()
        .filter(|l| l.is_valley())
        .fold(None, |best: Option<&Landmark>, l| match best {
            Some(b) if b.value <= l.value => Some(b),
            _ => Some(l),
        })
}

fn find_kind(data: &[f64], kind: LandmarkKind, params: &DetectParams) -> Vec<Landmark> {
    // Valleys are peaks of the negated signal; values are flipped back below.
    let signal: Vec<f64> = match kind {
        LandmarkKind::Peak => data.to_vec(),
        LandmarkKind::Valley => data.iter().map(|v| -v).collect(),
    };

    let mut candidates: Vec<Landmark> = local_maxima(&signal)
        .into_iter()
        .filter_map(|idx| {
            let prominence = prominence(&signal, idx);
            (prominence >= params.min_prominence)
                .then(|| Landmark::new(kind, idx, data[idx], prominence))
        })
        .collect();

    if params.min_separation > 1 {
        candidates = enforce_separation(candidates, params.min_separation);
    }
    candidates
}

/// Interior local maxima; flat tops resolve to their midpoint index.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut maxima = Vec::new();
    if n < 3 {
        return maxima;
    }
    let mut i = 1;
    while i < n - 1 {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let last = ahead - 1;
                maxima.push((i + last) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

/// Isolation depth of the maximum at `peak`.
fn prominence(x: &[f64], peak: usize) -> f64 {
    let v = x[peak];

    let mut left_min = v;
    for &s in x[..peak].iter().rev() {
        if s > v {
            break;
        }
        left_min = left_min.min(s);
    }

    let mut right_min = v;
    for &s in &x[peak + 1..] {
        if s > v {
            break;
        }
        right_min = right_min.min(s);
    }

    v - left_min.max(right_min)
}

fn enforce_separation(mut candidates: Vec<Landmark>, min_separation: usize) -> Vec<Landmark> {
    candidates.sort_by(|a, b| {
        b.prominence
            .partial_cmp(&a.prominence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    let mut kept: Vec<Landmark> = Vec::with_capacity(candidates.len());
    for cand in candidates {
        if kept
            .iter()
            .all(|k| k.index.abs_diff(cand.index) >= min_separation)
        {
            kept.push(cand);
        }
    }
    kept.sort_by_key(|l| l.index);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(samples: &[f64]) -> RowProfile {
        RowProfile::new("t", samples.to_vec()).unwrap()
    }

    fn loose() -> DetectParams {
        DetectParams {
            min_prominence: 0.0,
            min_separation: 1,
        }
    }

    #[test]
    fn finds_simple_peak_and_valley() {
        let p = profile(&[0.0, 2.0, 1.0, -1.0, 0.5]);
        let marks = find_landmarks(&p, &loose());
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].kind, LandmarkKind::Peak);
        assert_eq!(marks[0].index, 1);
        assert_eq!(marks[1].kind, LandmarkKind::Valley);
        assert_eq!(marks[1].index, 3);
        assert_eq!(marks[1].value, -1.0);
    }

    #[test]
    fn plateau_resolves_to_midpoint() {
        let p = profile(&[0.0, 1.0, 3.0, 3.0, 3.0, 3.0, 1.0, 0.0]);
        let peaks = find_peaks(&p, &loose());
        assert_eq!(peaks.len(), 1);
        // run 2..=5, floor midpoint
        assert_eq!(peaks[0].index, 3);
    }

    #[test]
    fn border_runs_are_not_extrema() {
        let p = profile(&[5.0, 5.0, 4.0, 3.0, 3.0]);
        assert!(find_landmarks(&p, &loose()).is_empty());
    }

    #[test]
    fn shoulder_is_not_a_peak() {
        let p = profile(&[0.0, 2.0, 2.0, 3.0, 1.0]);
        let peaks = find_peaks(&p, &loose());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 3);
    }

    #[test]
    fn prominence_uses_higher_base() {
        // Peak at 3 (height 5): left walk reaches the border (min 0.0), right
        // walk passes the lower peak at 6 and stops at 8 (min 0.5).
        let x = [0.0, 1.0, 4.0, 5.0, 3.0, 2.0, 4.0, 0.5, 6.0, 0.0];
        assert!((prominence(&x, 3) - 4.5).abs() < 1e-12);
        assert!((prominence(&x, 6) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn prominence_threshold_filters() {
        let p = profile(&[0.0, 1.0, 0.8, 5.0, 0.0]);
        let params = DetectParams {
            min_prominence: 0.5,
            min_separation: 1,
        };
        let peaks = find_peaks(&p, &params);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 3);
    }

    #[test]
    fn separation_keeps_more_prominent() {
        let p = profile(&[0.0, 3.0, 0.0, 5.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let params = DetectParams {
            min_prominence: 0.0,
            min_separation: 3,
        };
        let idx: Vec<usize> = find_peaks(&p, &params).iter().map(|l| l.index).collect();
        assert_eq!(idx, vec![3, 7]);
    }

    #[test]
    fn separation_tie_keeps_lower_index() {
        let p = profile(&[0.0, 4.0, 0.0, 4.0, 0.0]);
        let params = DetectParams {
            min_prominence: 0.0,
            min_separation: 3,
        };
        let peaks = find_peaks(&p, &params);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 1);
    }

    #[test]
    fn single_dominant_valley_is_found_near_minimum() {
        let samples: Vec<f64> = (0..41)
            .map(|i| {
                let x = i as f64 - 17.3;
                10.0 - 8.0 * (-x * x / 18.0).exp()
            })
            .collect();
        let p = profile(&samples);
        let valleys = find_valleys(&p, &DetectParams::default());
        assert_eq!(valleys.len(), 1);
        assert!((valleys[0].position - 17.3).abs() <= 1.0);
    }

    #[test]
    fn lowest_valley_prefers_lower_index_on_tie() {
        let marks = vec![
            Landmark::new(LandmarkKind::Valley, 4, 1.0, 2.0),
            Landmark::new(LandmarkKind::Peak, 6, 9.0, 2.0),
            Landmark::new(LandmarkKind::Valley, 8, 1.0, 3.0),
        ];
        assert_eq!(lowest_valley(&marks).map(|l| l.index), Some(4));
    }
}
