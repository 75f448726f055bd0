//! Plateau/edge crossings on both halves of the profile.
//!
//! The profile is split around the valley, leaving `split_margin` samples
//! out on each side. In each half the shield top is modelled as a horizontal
//! line through the flattest run containing the half's maximum, and the
//! walls as the steepest rising and falling sliding-window lines. Each wall
//! line is intersected with its half's plateau level:
//!
//! ```text
//!        outer_left  inner_left        inner_right  outer_right
//!             ______________              ______________
//!            /              \            /              \
//!   ________/                \____  ____/                \________
//!                                 \/
//!                               valley
//! ```

use crate::error::ProfileError;
use crate::gradient::{flattest_segment_containing_max, steepest_segments, LineModel};
use crate::intersect::intersect_lines;
use crate::types::{IntersectionPoint, RowProfile, SampleWindow, Side};
use log::debug;
use serde::{Deserialize, Serialize};

/// Plateau/edge analysis knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapezoidParams {
    /// Samples excluded on each side of the valley before splitting.
    pub split_margin: usize,
    /// Length of the plateau run.
    pub plateau_len: usize,
    /// Length of the sliding wall segments.
    pub segment_len: usize,
}

impl Default for TrapezoidParams {
    fn default() -> Self {
        Self {
            split_margin: 6,
            plateau_len: 9,
            segment_len: 3,
        }
    }
}

/// The four wall/plateau crossings plus the plateau lines used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrapezoidEdges {
    pub outer_left: IntersectionPoint,
    pub inner_left: IntersectionPoint,
    pub inner_right: IntersectionPoint,
    pub outer_right: IntersectionPoint,
    pub plateaus: [LineModel; 2],
}

/// Locate the wall/plateau crossings around a valley at `valley_x`.
pub fn locate_trapezoid(
    profile: &RowProfile,
    valley_x: f64,
    params: &TrapezoidParams,
) -> Result<TrapezoidEdges, ProfileError> {
    let split = profile.nearest_index(valley_x.floor());
    let last = profile.len() - 1;

    let left_end = split.checked_sub(params.split_margin + 1);
    let right_start = split + params.split_margin;
    let (Some(left_end), true) = (left_end, right_start <= last) else {
        return Err(ProfileError::InsufficientData {
            context: "trapezoid halves",
            needed: 2 * params.split_margin + 3,
            found: profile.len(),
        });
    };
    let left = SampleWindow::new(0, left_end);
    let right = SampleWindow::new(right_start, last);

    let (outer_left, inner_left, plateau_left) = half_crossings(profile, left, Side::Left, params)?;
    let (inner_right, outer_right, plateau_right) =
        half_crossings(profile, right, Side::Right, params)?;
    debug!(
        "locate_trapezoid '{}': outer=({:.3}, {:.3}) inner=({:.3}, {:.3})",
        profile.id(),
        outer_left.position,
        outer_right.position,
        inner_left.position,
        inner_right.position
    );
    Ok(TrapezoidEdges {
        outer_left,
        inner_left,
        inner_right,
        outer_right,
        plateaus: [plateau_left, plateau_right],
    })
}

/// Rising and falling wall crossings with the plateau of one half.
fn half_crossings(
    profile: &RowProfile,
    window: SampleWindow,
    side: Side,
    params: &TrapezoidParams,
) -> Result<(IntersectionPoint, IntersectionPoint, LineModel), ProfileError> {
    let plateau = flattest_segment_containing_max(profile, window, params.plateau_len)?;
    let walls = steepest_segments(profile, window, params.segment_len)?;
    let rising = intersect_lines(&walls.rising, &plateau, Some(side))?;
    let falling = intersect_lines(&walls.falling, &plateau, Some(side))?;
    Ok((rising, falling, plateau))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two flat-topped shields with linear walls around a central valley.
    fn two_trapezoids() -> RowProfile {
        let mut s = vec![0.0; 60];
        let shape = |x: f64, lo: f64, hi: f64| -> f64 {
            // rise over [lo, lo+4], flat to hi-4, fall to hi
            if x <= lo || x >= hi {
                0.0
            } else if x < lo + 4.0 {
                (x - lo) * 2.5
            } else if x > hi - 4.0 {
                (hi - x) * 2.5
            } else {
                10.0
            }
        };
        for (i, v) in s.iter_mut().enumerate() {
            let x = i as f64;
            *v = shape(x, 2.0, 22.0) + shape(x, 38.0, 58.0);
        }
        RowProfile::new("trap", s).unwrap()
    }

    #[test]
    fn finds_four_wall_crossings() {
        let p = two_trapezoids();
        let edges = locate_trapezoid(&p, 30.0, &TrapezoidParams::default()).unwrap();
        assert!((edges.outer_left.position - 6.0).abs() < 0.5, "{edges:?}");
        assert!((edges.inner_left.position - 18.0).abs() < 0.5, "{edges:?}");
        assert!((edges.inner_right.position - 42.0).abs() < 0.5, "{edges:?}");
        assert!((edges.outer_right.position - 54.0).abs() < 0.5, "{edges:?}");
        assert_eq!(edges.plateaus[0].intercept, 10.0);
    }

    #[test]
    fn valley_near_border_is_insufficient() {
        let p = two_trapezoids();
        let err = locate_trapezoid(&p, 3.0, &TrapezoidParams::default()).unwrap_err();
        assert!(matches!(err, ProfileError::InsufficientData { .. }));
    }
}
