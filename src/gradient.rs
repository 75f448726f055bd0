//! Steepest-slope localisation around a reference position.
//!
//! [`locate_edges`] scans first differences on each side of the reference
//! (typically the refined valley) and keeps the largest magnitude per side.
//! Ties go to the difference nearest the reference. Each resulting
//! [`GradientFeature`] carries the samples around the steep pair so a
//! [`LineModel`] can be fitted downstream.
//!
//! The sliding-segment helpers ([`steepest_segments`],
//! [`flattest_segment_containing_max`]) serve the plateau/edge analysis in
//! [`crate::trapezoid`].

use crate::error::ProfileError;
use crate::types::{RowProfile, SampleWindow, Side};
use log::debug;
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-12;

/// Locator knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientParams {
    /// Samples searched on each side of the reference.
    pub search_radius: usize,
    /// Extra samples on each side of the steep pair used for the line fit.
    pub line_margin: usize,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            search_radius: 12,
            line_margin: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlopeDirection {
    Ascending,
    Descending,
}

/// Steepest first difference `y[end] - y[start]` on one side of the reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientFeature {
    pub side: Side,
    pub direction: SlopeDirection,
    pub start: usize,
    pub end: usize,
    /// Signed slope per sample.
    pub slope: f64,
    pub magnitude: f64,
    /// Window of the samples in `points`.
    pub line_window: SampleWindow,
    /// `[x, y]` samples around the steep pair for line fitting.
    pub points: Vec<[f64; 2]>,
}

impl GradientFeature {
    /// Sub-sample position of the steep pair.
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.start + self.end) as f64
    }

    pub fn line(&self) -> Result<LineModel, ProfileError> {
        LineModel::fit(&self.points, self.line_window)
    }
}

/// Steepest features left and right of the reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgePair {
    pub left: Option<GradientFeature>,
    pub right: Option<GradientFeature>,
}

impl EdgePair {
    pub fn get(&self, side: Side) -> Option<&GradientFeature> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    pub fn both(&self) -> Option<(&GradientFeature, &GradientFeature)> {
        Some((self.left.as_ref()?, self.right.as_ref()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GradientFeature> {
        self.left.iter().chain(self.right.iter())
    }
}

/// Least-squares line `y = slope·x + intercept` with its source window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineModel {
    pub slope: f64,
    pub intercept: f64,
    pub window: SampleWindow,
}

impl LineModel {
    /// Fit through `points`; needs two points with distinct abscissae.
    pub fn fit(points: &[[f64; 2]], window: SampleWindow) -> Result<Self, ProfileError> {
        if points.len() < 2 {
            return Err(ProfileError::InsufficientData {
                context: "line fit",
                needed: 2,
                found: points.len(),
            });
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for p in points {
            let dx = p[0] - mean_x;
            sxx += dx * dx;
            sxy += dx * (p[1] - mean_y);
        }
        if sxx <= EPS {
            return Err(ProfileError::InsufficientData {
                context: "line fit (distinct abscissae)",
                needed: 2,
                found: 1,
            });
        }
        let slope = sxy / sxx;
        Ok(Self {
            slope,
            intercept: mean_y - slope * mean_x,
            window,
        })
    }

    pub fn horizontal(level: f64, window: SampleWindow) -> Self {
        Self {
            slope: 0.0,
            intercept: level,
            window,
        }
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Steepest ascent/descent on each side of `reference`.
///
/// Fails only when the combined search window holds fewer than two samples;
/// a side with fewer than two samples, or a flat side, yields `None`.
pub fn locate_edges(
    profile: &RowProfile,
    reference: f64,
    params: &GradientParams,
) -> Result<EdgePair, ProfileError> {
    let r = profile.nearest_index(reference);
    let radius = params.search_radius;
    let full = profile.clipped_window(r, radius, radius);
    if full.len() < 2 {
        return Err(ProfileError::InsufficientData {
            context: "gradient search window",
            needed: 2,
            found: full.len(),
        });
    }

    let left = profile.clipped_window(r, radius, 0);
    let right = profile.clipped_window(r, 0, radius);
    let edges = EdgePair {
        left: steepest_on_side(profile, left, Side::Left, params.line_margin),
        right: steepest_on_side(profile, right, Side::Right, params.line_margin),
    };
    debug!(
        "locate_edges '{}': reference={reference:.3} left={:?} right={:?}",
        profile.id(),
        edges.left.as_ref().map(|f| (f.start, f.slope)),
        edges.right.as_ref().map(|f| (f.start, f.slope)),
    );
    Ok(edges)
}

fn steepest_on_side(
    profile: &RowProfile,
    window: SampleWindow,
    side: Side,
    line_margin: usize,
) -> Option<GradientFeature> {
    if window.len() < 2 {
        return None;
    }
    let data = profile.samples();
    // Difference index `i` stands for the pair (i, i + 1); walk away from the reference.
    let order: Box<dyn Iterator<Item = usize>> = match side {
        Side::Left => Box::new((window.start..window.end).rev()),
        Side::Right => Box::new(window.start..window.end),
    };
    let mut best: Option<(usize, f64)> = None;
    for i in order {
        let d = data[i + 1] - data[i];
        if best.map_or(true, |(_, b)| d.abs() > b.abs()) {
            best = Some((i, d));
        }
    }
    let (start, slope) = best?;
    if slope.abs() <= EPS {
        return None;
    }

    let line_window = SampleWindow::new(
        start.saturating_sub(line_margin).max(window.start),
        (start + 1 + line_margin).min(window.end),
    );
    let points = line_window
        .indices()
        .map(|i| [i as f64, data[i]])
        .collect();
    Some(GradientFeature {
        side,
        direction: if slope > 0.0 {
            SlopeDirection::Ascending
        } else {
            SlopeDirection::Descending
        },
        start,
        end: start + 1,
        slope,
        magnitude: slope.abs(),
        line_window,
        points,
    })
}

/// Steepest rising and falling segments found by a sliding line fit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SteepestSegments {
    pub rising: LineModel,
    pub falling: LineModel,
}

fn segment_points(data: &[f64], window: SampleWindow) -> Vec<[f64; 2]> {
    window.indices().map(|i| [i as f64, data[i]]).collect()
}

/// Slide a `segment_len`-sample window over `window`, fit a line to each
/// placement, and keep the largest positive and most negative slopes (first
/// placement wins ties).
pub fn steepest_segments(
    profile: &RowProfile,
    window: SampleWindow,
    segment_len: usize,
) -> Result<SteepestSegments, ProfileError> {
    let segment_len = segment_len.max(2);
    if window.len() < segment_len {
        return Err(ProfileError::InsufficientData {
            context: "steepest segment search",
            needed: segment_len,
            found: window.len(),
        });
    }
    let data = profile.samples();
    let mut rising: Option<LineModel> = None;
    let mut falling: Option<LineModel> = None;
    for start in window.start..=window.end + 1 - segment_len {
        let seg = SampleWindow::new(start, start + segment_len - 1);
        let line = LineModel::fit(&segment_points(data, seg), seg)?;
        if rising.map_or(true, |r| line.slope > r.slope) {
            rising = Some(line);
        }
        if falling.map_or(true, |f| line.slope < f.slope) {
            falling = Some(line);
        }
    }
    match (rising, falling) {
        (Some(rising), Some(falling)) => Ok(SteepestSegments { rising, falling }),
        _ => Err(ProfileError::InsufficientData {
            context: "steepest segment search",
            needed: segment_len,
            found: window.len(),
        }),
    }
}

/// Most horizontal `segment_len`-sample run inside `window` that contains the
/// window maximum, returned as a horizontal line at the run's mean level.
pub fn flattest_segment_containing_max(
    profile: &RowProfile,
    window: SampleWindow,
    segment_len: usize,
) -> Result<LineModel, ProfileError> {
    let segment_len = segment_len.max(2);
    if window.len() < segment_len {
        return Err(ProfileError::InsufficientData {
            context: "plateau search",
            needed: segment_len,
            found: window.len(),
        });
    }
    let data = profile.samples();
    let mut max_idx = window.start;
    for i in window.indices() {
        if data[i] > data[max_idx] {
            max_idx = i;
        }
    }

    let first = window.start.max((max_idx + 1).saturating_sub(segment_len));
    let last = max_idx.min(window.end + 1 - segment_len);
    let mut best: Option<(f64, SampleWindow)> = None;
    for start in first..=last {
        let seg = SampleWindow::new(start, start + segment_len - 1);
        let line = LineModel::fit(&segment_points(data, seg), seg)?;
        if best.map_or(true, |(s, _)| line.slope.abs() < s) {
            best = Some((line.slope.abs(), seg));
        }
    }
    let (_, seg) = best.ok_or(ProfileError::InsufficientData {
        context: "plateau search",
        needed: segment_len,
        found: window.len(),
    })?;
    let level = seg.indices().map(|i| data[i]).sum::<f64>() / seg.len() as f64;
    Ok(LineModel::horizontal(level, seg))
}
