//! Intermediate products of one profile analysis.
//!
//! [`ProfileTrace`] keeps what each stage produced so callers can plot or
//! inspect the landmarks, fits and crossings behind an [`AlignmentResult`].
//! It is filled up to the stage that failed, so a failing profile still
//! shows how far it got.

mod timing;

pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};

use crate::error::ProfileError;
use crate::gradient::{EdgePair, LineModel};
use crate::refine::Refinement;
use crate::trapezoid::TrapezoidEdges;
use crate::types::{AlignmentResult, IntersectionPoint, Landmark};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProfileTrace {
    pub profile_id: String,
    /// Samples after detrending and smoothing.
    pub normalized: Vec<f64>,
    pub landmarks: Vec<Landmark>,
    pub refinement: Option<Refinement>,
    pub edges: EdgePair,
    /// Left and right edge lines, where they could be fitted.
    pub lines: [Option<LineModel>; 2],
    pub intersections: Option<[IntersectionPoint; 2]>,
    pub trapezoid: Option<TrapezoidEdges>,
    pub timings: TimingBreakdown,
}

/// Result of a traced analysis.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub result: Result<AlignmentResult, ProfileError>,
    pub trace: ProfileTrace,
}
