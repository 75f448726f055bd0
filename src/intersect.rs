//! Analytic crossings between the valley parabola and edge lines.
//!
//! The valid domain of a crossing is the hull of the contributing source
//! windows: the parabola's fit window and the line's sample window, plus the
//! gap between them. Roots outside it are rejected instead of extrapolated.
//! When both roots of a parabola/line system qualify, the one nearer the
//! parabola vertex is used (ties: smaller position).

use crate::error::ProfileError;
use crate::gradient::LineModel;
use crate::refine::ParabolicFit;
use crate::types::{IntersectionPoint, SampleWindow, Side};

const EPS: f64 = 1e-12;

/// Crossing of `fit` with `line` inside the hull of their windows.
pub fn intersect_parabola_line(
    fit: &ParabolicFit,
    line: &LineModel,
    side: Option<Side>,
) -> Result<IntersectionPoint, ProfileError> {
    // The hull includes any gap between the two windows; a crossing there is
    // accepted even though no sample supports it.
    let domain = fit.window.hull(&line.window);
    let qa = fit.a;
    let qb = fit.b - line.slope;
    let qc = fit.c - line.intercept;

    let roots: Vec<f64> = if qa.abs() <= EPS {
        if qb.abs() <= EPS {
            return Err(ProfileError::no_intersection(
                side,
                "line coincides with or runs parallel to a degenerate parabola",
            ));
        }
        vec![-qc / qb]
    } else {
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return Err(ProfileError::no_intersection(
                side,
                format!("no real crossing (discriminant {disc:.3e})"),
            ));
        }
        // Stable form: avoids cancellation when qb dominates.
        let sq = disc.sqrt();
        let q = -0.5 * (qb + qb.signum() * sq);
        let mut r = vec![q / qa];
        if q.abs() > EPS {
            r.push(qc / q);
        } else {
            r.push(-qb / qa - r[0]);
        }
        r
    };

    let vertex_x = fit.vertex().map(|(x, _)| x).unwrap_or_else(|| {
        0.5 * (fit.window.start + fit.window.end) as f64
    });
    let best = roots
        .into_iter()
        .filter(|x| x.is_finite() && domain.contains(*x))
        .min_by(|a, b| {
            let da = (a - vertex_x).abs();
            let db = (b - vertex_x).abs();
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        });

    match best {
        Some(x) => Ok(IntersectionPoint {
            position: x,
            value: line.eval(x),
            side,
        }),
        None => Err(ProfileError::no_intersection(
            side,
            format!(
                "crossings fall outside [{}, {}]",
                domain.start, domain.end
            ),
        )),
    }
}

/// Crossing of two lines inside the hull of their windows.
pub fn intersect_lines(
    first: &LineModel,
    second: &LineModel,
    side: Option<Side>,
) -> Result<IntersectionPoint, ProfileError> {
    let dm = first.slope - second.slope;
    if dm.abs() <= EPS {
        return Err(ProfileError::no_intersection(side, "lines are parallel"));
    }
    let x = (second.intercept - first.intercept) / dm;
    let domain: SampleWindow = first.window.hull(&second.window);
    if !x.is_finite() || !domain.contains(x) {
        return Err(ProfileError::no_intersection(
            side,
            format!("crossing {x:.3} outside [{}, {}]", domain.start, domain.end),
        ));
    }
    Ok(IntersectionPoint {
        position: x,
        value: first.eval(x),
        side,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_parabola() -> ParabolicFit {
        // y = (x - 5)^2 over [2, 8]
        ParabolicFit {
            a: 1.0,
            b: -10.0,
            c: 25.0,
            window: SampleWindow::new(2, 8),
            rms_residual: 0.0,
        }
    }

    #[test]
    fn horizontal_line_picks_root_nearer_vertex() {
        let line = LineModel::horizontal(4.0, SampleWindow::new(0, 10));
        // Roots 3 and 7 are equidistant from 5: the smaller wins.
        let p = intersect_parabola_line(&unit_parabola(), &line, None).unwrap();
        assert!((p.position - 3.0).abs() < 1e-12);
        assert!((p.value - 4.0).abs() < 1e-12);
    }

    #[test]
    fn steep_line_crosses_inside_hull() {
        // y = -6x + 22 crosses (x-5)^2 at x = 1 and x = 3, both inside [0, 8].
        let line = LineModel {
            slope: -6.0,
            intercept: 22.0,
            window: SampleWindow::new(0, 2),
        };
        let p = intersect_parabola_line(&unit_parabola(), &line, Some(Side::Left)).unwrap();
        assert!((p.position - 3.0).abs() < 1e-9);
        assert_eq!(p.side, Some(Side::Left));
    }

    #[test]
    fn root_outside_domain_is_rejected() {
        // Tangent to (x-5)^2 at x = 30: double root far outside [2, 12].
        let line = LineModel {
            slope: 50.0,
            intercept: -875.0,
            window: SampleWindow::new(10, 12),
        };
        let err = intersect_parabola_line(&unit_parabola(), &line, Some(Side::Right)).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::NoIntersection {
                side: Some(Side::Right),
                ..
            }
        ));
    }

    #[test]
    fn line_below_parabola_has_no_crossing() {
        let line = LineModel::horizontal(-1.0, SampleWindow::new(0, 10));
        assert!(intersect_parabola_line(&unit_parabola(), &line, None).is_err());
    }

    #[test]
    fn crossing_in_gap_between_windows_is_accepted() {
        let fit = ParabolicFit {
            window: SampleWindow::new(5, 8),
            ..unit_parabola()
        };
        // Roots 3 and 7 both lie in the hull [0, 8]; 3 sits between the windows.
        let line = LineModel::horizontal(4.0, SampleWindow::new(0, 1));
        let p = intersect_parabola_line(&fit, &line, Some(Side::Left)).unwrap();
        assert!((p.position - 3.0).abs() < 1e-12);

        // Without the gap only the root at 7 remains.
        let line = LineModel::horizontal(4.0, SampleWindow::new(6, 7));
        let p = intersect_parabola_line(&fit, &line, Some(Side::Right)).unwrap();
        assert!((p.position - 7.0).abs() < 1e-12);
    }

    #[test]
    fn lines_cross_inside_hull() {
        let a = LineModel {
            slope: 2.0,
            intercept: 0.0,
            window: SampleWindow::new(0, 3),
        };
        let b = LineModel::horizontal(8.0, SampleWindow::new(5, 9));
        let p = intersect_lines(&a, &b, None).unwrap();
        assert!((p.position - 4.0).abs() < 1e-12);
        assert!((p.value - 8.0).abs() < 1e-12);
    }

    #[test]
    fn parallel_lines_do_not_cross() {
        let a = LineModel::horizontal(1.0, SampleWindow::new(0, 3));
        let b = LineModel::horizontal(2.0, SampleWindow::new(4, 6));
        assert!(matches!(
            intersect_lines(&a, &b, None),
            Err(ProfileError::NoIntersection { .. })
        ));
    }
}
