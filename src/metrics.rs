//! Inner/outer distances, their ratio and the valley placement.
//!
//! The outer distance spans the two outer peaks around the valley. The inner
//! distance spans the left and right parabola/edge-line intersections. When
//! those are missing, [`InnerFallback`] picks the replacement pair: the
//! innermost peaks around the valley (default) or the steepest-difference
//! midpoints. An undefined value is always an error; nothing is replaced by
//! zero or NaN.
//!
//! Positioning offsets (`positioning_scale` set):
//!
//! - peak path: `scale · |outer_balance − 0.5|`, the unsigned displacement of
//!   the valley from the centre of the outer peaks;
//! - wall path ([`trapezoid_metrics`]): `scale · (outer_balance − inner_balance) / 2`,
//!   signed, the mean of the outer balance and the inner balance measured
//!   from the right wall, minus one half.

use crate::error::ProfileError;
use crate::gradient::EdgePair;
use crate::trapezoid::TrapezoidEdges;
use crate::types::{
    AlignmentResult, InnerSource, IntersectionPoint, Landmark, TrapezoidMetrics, ValleyPlacement,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Which peak on each side of the valley bounds the outer distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OuterPeakPolicy {
    /// Leftmost and rightmost qualifying peaks.
    #[default]
    Outermost,
    /// Highest peak on each side (tie: outermost).
    Highest,
}

/// Replacement for the inner pair when intersections are unavailable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InnerFallback {
    /// No replacement; the intersection error is the profile's result.
    Disabled,
    /// Nearest peak on each side of the valley.
    #[default]
    InnerPeaks,
    /// Midpoints of the steepest differences on each side.
    EdgeMidpoints,
}

/// Aggregator knobs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricParams {
    /// Samples per physical unit; enables the `*_units` fields.
    pub pixels_per_unit: Option<f64>,
    /// Scale applied to the balance offsets.
    pub positioning_scale: Option<f64>,
    pub inner_fallback: InnerFallback,
    pub outer_peaks: OuterPeakPolicy,
}

/// Everything the aggregator combines for one profile.
#[derive(Clone, Debug)]
pub struct AggregateInput<'a> {
    pub profile_id: &'a str,
    pub landmarks: &'a [Landmark],
    pub valley: &'a Landmark,
    pub edges: &'a EdgePair,
    /// Left and right parabola/edge-line crossings, when both exist.
    pub intersections: Option<[IntersectionPoint; 2]>,
    pub trapezoid: Option<&'a TrapezoidEdges>,
}

/// `inner / outer`; zero or non-finite inputs are undefined.
pub fn distance_ratio(inner: f64, outer: f64) -> Result<f64, ProfileError> {
    if !inner.is_finite() || !outer.is_finite() {
        return Err(ProfileError::undefined(format!(
            "non-finite distances (inner={inner}, outer={outer})"
        )));
    }
    if outer == 0.0 {
        return Err(ProfileError::undefined("outer distance is zero"));
    }
    let ratio = inner / outer;
    if !ratio.is_finite() {
        return Err(ProfileError::undefined(format!(
            "ratio {inner} / {outer} is not finite"
        )));
    }
    Ok(ratio)
}

/// Left and right outer peaks around `valley`.
pub fn select_outer_peaks<'l>(
    landmarks: &'l [Landmark],
    valley: &Landmark,
    policy: OuterPeakPolicy,
) -> Result<[&'l Landmark; 2], ProfileError> {
    let v = valley.position;
    let left = landmarks
        .iter()
        .filter(|l| l.is_peak() && l.position < v);
    let right = landmarks
        .iter()
        .filter(|l| l.is_peak() && l.position > v);

    let (left, right) = match policy {
        OuterPeakPolicy::Outermost => (
            left.min_by(|a, b| a.position.total_cmp(&b.position)),
            right.max_by(|a, b| a.position.total_cmp(&b.position)),
        ),
        // Equal heights: the peak farther from the valley ranks higher.
        OuterPeakPolicy::Highest => (
            left.max_by(|a, b| {
                a.value
                    .total_cmp(&b.value)
                    .then(b.position.total_cmp(&a.position))
            }),
            right.max_by(|a, b| {
                a.value
                    .total_cmp(&b.value)
                    .then(a.position.total_cmp(&b.position))
            }),
        ),
    };

    match (left, right) {
        (Some(l), Some(r)) => Ok([l, r]),
        (None, _) => Err(ProfileError::undefined(format!(
            "no peak left of the valley at {v:.3}"
        ))),
        (_, None) => Err(ProfileError::undefined(format!(
            "no peak right of the valley at {v:.3}"
        ))),
    }
}

/// Nearest peak strictly left and strictly right of `valley`.
pub fn select_inner_peaks<'l>(
    landmarks: &'l [Landmark],
    valley: &Landmark,
) -> Result<[&'l Landmark; 2], ProfileError> {
    let v = valley.position;
    let peaks = || landmarks.iter().filter(|l| l.is_peak());
    let left = peaks()
        .filter(|l| l.position < v)
        .max_by(|a, b| a.position.total_cmp(&b.position));
    let right = peaks()
        .filter(|l| l.position > v)
        .min_by(|a, b| a.position.total_cmp(&b.position));
    match (left, right) {
        (Some(l), Some(r)) => Ok([l, r]),
        _ => Err(ProfileError::undefined(format!(
            "no inner peak pair around the valley at {v:.3}"
        ))),
    }
}

/// Relative position of `x` between `left` and `right`.
fn balance(x: f64, left: f64, right: f64, what: &str) -> Result<f64, ProfileError> {
    let span = right - left;
    if span == 0.0 || !span.is_finite() {
        return Err(ProfileError::undefined(format!(
            "{what} reference pair has zero span"
        )));
    }
    Ok((x - left) / span)
}

fn balances(
    valley_x: f64,
    outer: (f64, f64),
    inner: (f64, f64),
) -> Result<(f64, f64), ProfileError> {
    Ok((
        balance(valley_x, outer.0, outer.1, "outer")?,
        balance(valley_x, inner.0, inner.1, "inner")?,
    ))
}

fn peak_placement(
    valley_x: f64,
    outer: (f64, f64),
    inner: (f64, f64),
    params: &MetricParams,
) -> Result<ValleyPlacement, ProfileError> {
    let (outer_balance, inner_balance) = balances(valley_x, outer, inner)?;
    Ok(ValleyPlacement {
        outer_balance,
        inner_balance,
        positioning_offset: params
            .positioning_scale
            .map(|scale| scale * (outer_balance - 0.5).abs()),
    })
}

fn wall_placement(
    valley_x: f64,
    outer: (f64, f64),
    inner: (f64, f64),
    params: &MetricParams,
) -> Result<ValleyPlacement, ProfileError> {
    let (outer_balance, inner_balance) = balances(valley_x, outer, inner)?;
    Ok(ValleyPlacement {
        outer_balance,
        inner_balance,
        positioning_offset: params
            .positioning_scale
            .map(|scale| 0.5 * scale * (outer_balance - inner_balance)),
    })
}

fn to_units(distance: f64, pixels_per_unit: Option<f64>) -> Result<Option<f64>, ProfileError> {
    match pixels_per_unit {
        None => Ok(None),
        Some(ppu) if ppu > 0.0 && ppu.is_finite() => Ok(Some(distance / ppu)),
        Some(ppu) => Err(ProfileError::undefined(format!(
            "pixels_per_unit must be positive, got {ppu}"
        ))),
    }
}

/// Distances and placement from the four wall crossings.
pub fn trapezoid_metrics(
    edges: &TrapezoidEdges,
    valley_x: f64,
    params: &MetricParams,
) -> Result<TrapezoidMetrics, ProfileError> {
    let inner = (edges.inner_left.position, edges.inner_right.position);
    let outer = (edges.outer_left.position, edges.outer_right.position);
    let inner_distance = (inner.1 - inner.0).abs();
    let outer_distance = (outer.1 - outer.0).abs();
    Ok(TrapezoidMetrics {
        inner_distance,
        outer_distance,
        ratio: distance_ratio(inner_distance, outer_distance)?,
        placement: wall_placement(valley_x, outer, inner, params)?,
        edges: edges.clone(),
    })
}

/// Combine the stage outputs of one profile into an [`AlignmentResult`].
pub fn aggregate(
    input: AggregateInput<'_>,
    params: &MetricParams,
) -> Result<AlignmentResult, ProfileError> {
    let valley = input.valley;
    let [left_peak, right_peak] = select_outer_peaks(input.landmarks, valley, params.outer_peaks)?;
    let outer = (left_peak.position, right_peak.position);
    let outer_distance = (outer.1 - outer.0).abs();

    let (inner, inner_source) = match (&input.intersections, params.inner_fallback) {
        (Some([l, r]), _) => ((l.position, r.position), InnerSource::Intersections),
        (None, InnerFallback::Disabled) => {
            return Err(ProfileError::undefined(
                "no intersections and inner fallback disabled",
            ));
        }
        (None, InnerFallback::InnerPeaks) => {
            let [l, r] = select_inner_peaks(input.landmarks, valley)?;
            debug!(
                "aggregate '{}': inner distance from peaks at {} and {}",
                input.profile_id, l.index, r.index
            );
            ((l.position, r.position), InnerSource::InnerPeaks)
        }
        (None, InnerFallback::EdgeMidpoints) => {
            let (l, r) = input.edges.both().ok_or_else(|| {
                ProfileError::undefined("no intersections and fewer than two edges")
            })?;
            debug!(
                "aggregate '{}': inner distance from edge midpoints",
                input.profile_id
            );
            ((l.midpoint(), r.midpoint()), InnerSource::EdgeMidpoints)
        }
    };
    let inner_distance = (inner.1 - inner.0).abs();
    let ratio = distance_ratio(inner_distance, outer_distance)?;

    let trapezoid = input
        .trapezoid
        .map(|edges| trapezoid_metrics(edges, valley.position, params))
        .transpose()?;

    Ok(AlignmentResult {
        profile_id: input.profile_id.to_string(),
        inner_distance,
        outer_distance,
        ratio,
        inner_distance_units: to_units(inner_distance, params.pixels_per_unit)?,
        outer_distance_units: to_units(outer_distance, params.pixels_per_unit)?,
        inner_source,
        placement: peak_placement(valley.position, outer, inner, params)?,
        valley: valley.clone(),
        outer_peaks: [left_peak.clone(), right_peak.clone()],
        intersections: input.intersections,
        edges: input.edges.iter().cloned().collect(),
        landmarks: input.landmarks.to_vec(),
        trapezoid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::{GradientFeature, LineModel, SlopeDirection};
    use crate::types::{LandmarkKind, SampleWindow, Side};

    fn peak(index: usize, value: f64) -> Landmark {
        Landmark::new(LandmarkKind::Peak, index, value, 1.0)
    }

    fn valley(position: f64) -> Landmark {
        let mut v = Landmark::new(LandmarkKind::Valley, position.round() as usize, 0.0, 1.0);
        v.position = position;
        v
    }

    fn crossing(position: f64, side: Side) -> IntersectionPoint {
        IntersectionPoint {
            position,
            value: 1.0,
            side: Some(side),
        }
    }

    fn feature(side: Side, start: usize) -> GradientFeature {
        GradientFeature {
            side,
            direction: SlopeDirection::Ascending,
            start,
            end: start + 1,
            slope: 1.0,
            magnitude: 1.0,
            line_window: SampleWindow::new(start, start + 1),
            points: vec![[start as f64, 0.0], [start as f64 + 1.0, 1.0]],
        }
    }

    #[test]
    fn ratio_of_ten_over_twenty() {
        assert_eq!(distance_ratio(10.0, 20.0).unwrap(), 0.5);
    }

    #[test]
    fn zero_outer_distance_is_undefined() {
        assert!(matches!(
            distance_ratio(10.0, 0.0),
            Err(ProfileError::MetricUndefined { .. })
        ));
        assert!(distance_ratio(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn outermost_and_highest_policies_differ() {
        let landmarks = vec![peak(1, 5.0), peak(4, 9.0), peak(14, 9.0), peak(18, 3.0)];
        let v = valley(10.0);
        let [l, r] = select_outer_peaks(&landmarks, &v, OuterPeakPolicy::Outermost).unwrap();
        assert_eq!((l.index, r.index), (1, 18));
        let [l, r] = select_outer_peaks(&landmarks, &v, OuterPeakPolicy::Highest).unwrap();
        assert_eq!((l.index, r.index), (4, 14));
    }

    #[test]
    fn highest_ties_resolve_outward() {
        let landmarks = vec![peak(2, 7.0), peak(6, 7.0), peak(12, 7.0), peak(16, 7.0)];
        let [l, r] = select_outer_peaks(&landmarks, &valley(9.0), OuterPeakPolicy::Highest).unwrap();
        assert_eq!((l.index, r.index), (2, 16));
    }

    #[test]
    fn missing_side_peak_is_undefined() {
        let landmarks = vec![peak(2, 7.0)];
        let err = select_outer_peaks(&landmarks, &valley(9.0), OuterPeakPolicy::Outermost)
            .unwrap_err();
        assert!(matches!(err, ProfileError::MetricUndefined { .. }));
    }

    #[test]
    fn aggregate_from_intersections() {
        let landmarks = vec![peak(0, 10.0), valley(10.0), peak(20, 10.0)];
        let v = valley(10.0);
        let edges = EdgePair::default();
        let params = MetricParams {
            pixels_per_unit: Some(2.0),
            positioning_scale: Some(3000.0),
            ..MetricParams::default()
        };
        let result = aggregate(
            AggregateInput {
                profile_id: "p",
                landmarks: &landmarks,
                valley: &v,
                edges: &edges,
                intersections: Some([crossing(5.0, Side::Left), crossing(15.0, Side::Right)]),
                trapezoid: None,
            },
            &params,
        )
        .unwrap();
        assert_eq!(result.inner_distance, 10.0);
        assert_eq!(result.outer_distance, 20.0);
        assert_eq!(result.ratio, 0.5);
        assert_eq!(result.inner_distance_units, Some(5.0));
        assert_eq!(result.outer_distance_units, Some(10.0));
        assert_eq!(result.inner_source, InnerSource::Intersections);
        assert_eq!(result.placement.outer_balance, 0.5);
        assert_eq!(result.placement.inner_balance, 0.5);
        assert_eq!(result.placement.positioning_offset, Some(0.0));
        assert_eq!(result.landmarks.len(), 3);
    }

    #[test]
    fn shifted_valley_gives_unsigned_peak_offset() {
        let landmarks = vec![peak(0, 10.0), peak(20, 10.0)];
        let v = valley(12.0);
        let params = MetricParams {
            positioning_scale: Some(100.0),
            ..MetricParams::default()
        };
        let result = aggregate(
            AggregateInput {
                profile_id: "p",
                landmarks: &landmarks,
                valley: &v,
                edges: &EdgePair::default(),
                intersections: Some([crossing(7.0, Side::Left), crossing(17.0, Side::Right)]),
                trapezoid: None,
            },
            &params,
        )
        .unwrap();
        // outer balance 0.6: 100 · |0.6 − 0.5|
        let offset = result.placement.positioning_offset.unwrap();
        assert!((offset - 10.0).abs() < 1e-9, "{offset}");
        assert_eq!(result.placement.inner_balance, 0.5);
    }

    #[test]
    fn inner_fallback_modes() {
        let landmarks = vec![peak(0, 10.0), peak(6, 8.0), peak(13, 8.0), peak(20, 10.0)];
        let v = valley(10.0);
        let edges = EdgePair {
            left: Some(feature(Side::Left, 4)),
            right: Some(feature(Side::Right, 15)),
        };
        let input = AggregateInput {
            profile_id: "p",
            landmarks: &landmarks,
            valley: &v,
            edges: &edges,
            intersections: None,
            trapezoid: None,
        };
        let with = |inner_fallback| MetricParams {
            inner_fallback,
            ..MetricParams::default()
        };

        let err = aggregate(input.clone(), &with(InnerFallback::Disabled)).unwrap_err();
        assert!(matches!(err, ProfileError::MetricUndefined { .. }));

        let result = aggregate(input.clone(), &MetricParams::default()).unwrap();
        assert_eq!(result.inner_source, InnerSource::InnerPeaks);
        assert_eq!(result.inner_distance, 7.0);
        assert_eq!(result.outer_distance, 20.0);
        assert_eq!(result.placement.inner_balance, 4.0 / 7.0);

        let result = aggregate(input, &with(InnerFallback::EdgeMidpoints)).unwrap();
        assert_eq!(result.inner_source, InnerSource::EdgeMidpoints);
        assert_eq!(result.inner_distance, 11.0);
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn inner_peaks_need_both_sides() {
        let landmarks = vec![peak(2, 10.0), peak(5, 9.0)];
        let err = select_inner_peaks(&landmarks, &valley(8.0)).unwrap_err();
        assert!(matches!(err, ProfileError::MetricUndefined { .. }));
        let [l, r] = select_inner_peaks(&[peak(2, 1.0), peak(5, 1.0), peak(12, 1.0)], &valley(8.0))
            .map(|[l, r]| [l.index, r.index])
            .unwrap();
        assert_eq!((l, r), (5, 12));
    }

    #[test]
    fn wall_offset_combines_outer_and_right_wall_balance() {
        let at = |position| IntersectionPoint {
            position,
            value: 10.0,
            side: None,
        };
        let edges = TrapezoidEdges {
            outer_left: at(0.0),
            inner_left: at(10.0),
            inner_right: at(30.0),
            outer_right: at(40.0),
            plateaus: [
                LineModel::horizontal(10.0, SampleWindow::new(0, 9)),
                LineModel::horizontal(10.0, SampleWindow::new(31, 40)),
            ],
        };
        let params = MetricParams {
            positioning_scale: Some(3000.0),
            ..MetricParams::default()
        };
        // outer balance 0.55, inner balance 0.6 (0.4 from the right wall):
        // 3000 · ((0.55 + 0.4) / 2 − 0.5) = −75
        let m = trapezoid_metrics(&edges, 22.0, &params).unwrap();
        let offset = m.placement.positioning_offset.unwrap();
        assert!((offset + 75.0).abs() < 1e-9, "{offset}");
        assert_eq!(m.inner_distance, 20.0);
        assert_eq!(m.outer_distance, 40.0);

        let centred = trapezoid_metrics(&edges, 20.0, &params).unwrap();
        assert_eq!(centred.placement.positioning_offset, Some(0.0));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let landmarks = vec![peak(0, 10.0), peak(20, 10.0)];
        let v = valley(10.0);
        let params = MetricParams {
            pixels_per_unit: Some(0.0),
            ..MetricParams::default()
        };
        let err = aggregate(
            AggregateInput {
                profile_id: "p",
                landmarks: &landmarks,
                valley: &v,
                edges: &EdgePair::default(),
                intersections: Some([crossing(5.0, Side::Left), crossing(15.0, Side::Right)]),
                trapezoid: None,
            },
            &params,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::MetricUndefined { .. }));
    }
}
