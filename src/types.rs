use crate::error::ProfileError;
use crate::gradient::GradientFeature;
use crate::trapezoid::TrapezoidEdges;
use serde::{Deserialize, Serialize};

/// Smallest profile that still has one interior sample with two neighbours.
pub const MIN_PROFILE_LEN: usize = 3;

/// Named row profile: one intensity sample per column index.
///
/// Construction validates the invariants (length and finiteness); afterwards
/// the samples are read-only. Deserialization goes through [`RowProfile::new`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProfileRecord")]
pub struct RowProfile {
    id: String,
    samples: Vec<f64>,
}

#[derive(Deserialize)]
struct ProfileRecord {
    id: String,
    samples: Vec<f64>,
}

impl TryFrom<ProfileRecord> for RowProfile {
    type Error = ProfileError;

    fn try_from(record: ProfileRecord) -> Result<Self, Self::Error> {
        RowProfile::new(record.id, record.samples)
    }
}

impl RowProfile {
    pub fn new(id: impl Into<String>, samples: Vec<f64>) -> Result<Self, ProfileError> {
        let id = id.into();
        if samples.len() < MIN_PROFILE_LEN {
            return Err(ProfileError::invalid(format!(
                "profile '{id}' has {} samples, need at least {MIN_PROFILE_LEN}",
                samples.len()
            )));
        }
        if let Some(idx) = samples.iter().position(|v| !v.is_finite()) {
            return Err(ProfileError::invalid(format!(
                "profile '{id}' has a non-finite sample at index {idx}"
            )));
        }
        Ok(Self { id, samples })
    }

    /// Same id, new samples. Used by stages that keep the index space.
    pub(crate) fn with_samples(&self, samples: Vec<f64>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            id: self.id.clone(),
            samples,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Full index range of the profile.
    pub fn window(&self) -> SampleWindow {
        SampleWindow::new(0, self.samples.len().saturating_sub(1))
    }

    /// `[center - left, center + right]` clipped to the profile.
    pub fn clipped_window(&self, center: usize, left: usize, right: usize) -> SampleWindow {
        let last = self.samples.len().saturating_sub(1);
        let center = center.min(last);
        SampleWindow::new(center.saturating_sub(left), center.saturating_add(right).min(last))
    }

    /// Nearest sample index to a sub-sample position, clamped to the profile.
    pub fn nearest_index(&self, position: f64) -> usize {
        let last = self.samples.len().saturating_sub(1);
        if !position.is_finite() || position <= 0.0 {
            return 0;
        }
        (position.round() as usize).min(last)
    }
}

/// Inclusive range of sample indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub start: usize,
    pub end: usize,
}

impl SampleWindow {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "window start {start} after end {end}");
        Self { start, end }
    }

    /// Number of samples covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    #[inline]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.start as f64 && x <= self.end as f64
    }

    /// Smallest window covering both `self` and `other`.
    pub fn hull(&self, other: &SampleWindow) -> SampleWindow {
        SampleWindow::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandmarkKind {
    Peak,
    Valley,
}

/// Which side of the reference valley a feature was found on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Detected peak or valley.
///
/// `index` is where the detector found the extremum and never changes.
/// `position`/`value` start out equal to the sample and are replaced by the
/// parabola vertex when a valley is refined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub kind: LandmarkKind,
    pub index: usize,
    pub position: f64,
    pub value: f64,
    pub prominence: f64,
    pub refined: bool,
}

impl Landmark {
    pub fn new(kind: LandmarkKind, index: usize, value: f64, prominence: f64) -> Self {
        Self {
            kind,
            index,
            position: index as f64,
            value,
            prominence,
            refined: false,
        }
    }

    pub fn is_peak(&self) -> bool {
        self.kind == LandmarkKind::Peak
    }

    pub fn is_valley(&self) -> bool {
        self.kind == LandmarkKind::Valley
    }
}

/// Point where two fitted primitives cross.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntersectionPoint {
    pub position: f64,
    pub value: f64,
    pub side: Option<Side>,
}

/// Where the inner distance came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InnerSource {
    /// Parabola/edge-line intersections on both sides.
    Intersections,
    /// Nearest peaks around the valley; intersections were unavailable.
    InnerPeaks,
    /// Midpoints of the steepest differences; intersections were unavailable.
    EdgeMidpoints,
}

/// Relative placement of the valley between its reference pairs (0.5 = centred).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValleyPlacement {
    /// Valley position relative to the outer peak pair.
    pub outer_balance: f64,
    /// Valley position relative to the inner reference pair.
    pub inner_balance: f64,
    /// Set when `positioning_scale` is configured. Peak path:
    /// `scale * |outer_balance - 0.5|`. Wall path:
    /// `scale * (outer_balance - inner_balance) / 2`, positive means shifted right.
    pub positioning_offset: Option<f64>,
}

/// Plateau/edge variant of the distance metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrapezoidMetrics {
    /// Span between the two inner wall crossings.
    pub inner_distance: f64,
    /// Span between the two outer wall crossings.
    pub outer_distance: f64,
    pub ratio: f64,
    pub placement: ValleyPlacement,
    pub edges: TrapezoidEdges,
}

/// Per-profile output record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub profile_id: String,
    /// Inner distance in samples.
    pub inner_distance: f64,
    /// Outer distance in samples.
    pub outer_distance: f64,
    /// `inner_distance / outer_distance`.
    pub ratio: f64,
    /// Inner/outer distance in physical units, when a scale is configured.
    pub inner_distance_units: Option<f64>,
    pub outer_distance_units: Option<f64>,
    pub inner_source: InnerSource,
    pub placement: ValleyPlacement,
    /// Refined (or fallback) reference valley.
    pub valley: Landmark,
    /// Left and right peaks spanning the outer distance.
    pub outer_peaks: [Landmark; 2],
    /// Left and right intersections when `inner_source` is `Intersections`.
    pub intersections: Option<[IntersectionPoint; 2]>,
    pub edges: Vec<GradientFeature>,
    /// Every landmark reported by the detector.
    pub landmarks: Vec<Landmark>,
    /// Present when the plateau/edge analysis is enabled.
    pub trapezoid: Option<TrapezoidMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_profile_is_validated() {
        let short = serde_json::from_str::<RowProfile>(r#"{"id": "p", "samples": [1.0, 2.0]}"#);
        assert!(short.is_err());

        let profile: RowProfile =
            serde_json::from_str(r#"{"id": "p", "samples": [1.0, 0.0, 1.0]}"#).unwrap();
        assert_eq!(profile.id(), "p");
        assert_eq!(profile.samples(), [1.0, 0.0, 1.0]);
    }
}
