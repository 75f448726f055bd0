//! Profile analysis end to end.
//!
//! [`ProfileAnalyzer`] runs the stages forward, once per profile:
//! normalize → detect → refine the lowest valley → locate edges → intersect
//! the valley parabola with the edge lines → (optional plateau/edge
//! crossings) → aggregate. Batches map the analyzer over many profiles;
//! one profile failing never affects another.
//!
//! ```no_run
//! use shield_align::{AnalyzerParams, ProfileAnalyzer, RowProfile};
//!
//! # fn example(samples: Vec<f64>) -> Result<(), shield_align::ProfileError> {
//! let profile = RowProfile::new("row-001", samples)?;
//! let analyzer = ProfileAnalyzer::new(AnalyzerParams::default());
//! let result = analyzer.analyze(&profile)?;
//! println!("ratio={:.4}", result.ratio);
//! # Ok(())
//! # }
//! ```

use crate::diagnostics::{elapsed_ms, AnalysisReport, ProfileTrace};
use crate::error::ProfileError;
use crate::extrema::{find_landmarks, lowest_valley, DetectParams};
use crate::gradient::{locate_edges, EdgePair, GradientParams};
use crate::intersect::intersect_parabola_line;
use crate::metrics::{aggregate, AggregateInput, InnerFallback, MetricParams};
use crate::normalize::{normalize_profile, NormalizeParams};
use crate::refine::{refine_valley, Refinement, RefineParams};
use crate::source::ProfileSource;
use crate::trapezoid::{locate_trapezoid, TrapezoidParams};
use crate::types::{AlignmentResult, IntersectionPoint, RowProfile, Side};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// All analysis knobs; every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerParams {
    pub normalize: NormalizeParams,
    pub detect: DetectParams,
    pub refine: RefineParams,
    pub gradient: GradientParams,
    pub metrics: MetricParams,
    /// Enables the plateau/edge crossings when present.
    pub trapezoid: Option<TrapezoidParams>,
}

/// Outcome for one profile of a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchEntry {
    pub id: String,
    pub result: Result<AlignmentResult, ProfileError>,
}

impl BatchEntry {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProfileAnalyzer {
    params: AnalyzerParams,
}

impl ProfileAnalyzer {
    pub fn new(params: AnalyzerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AnalyzerParams {
        &self.params
    }

    pub fn analyze(&self, profile: &RowProfile) -> Result<AlignmentResult, ProfileError> {
        self.analyze_with_trace(profile).result
    }

    /// Analyze and keep every intermediate product.
    pub fn analyze_with_trace(&self, profile: &RowProfile) -> AnalysisReport {
        let total_start = Instant::now();
        let mut trace = ProfileTrace {
            profile_id: profile.id().to_string(),
            ..ProfileTrace::default()
        };
        let result = self.run(profile, &mut trace);
        trace.timings.total_ms = elapsed_ms(total_start);
        match &result {
            Ok(r) => debug!(
                "analyze '{}': ratio={:.4} inner={:.3} outer={:.3} ({:?}) in {:.3} ms",
                r.profile_id,
                r.ratio,
                r.inner_distance,
                r.outer_distance,
                r.inner_source,
                trace.timings.total_ms
            ),
            Err(e) => debug!("analyze '{}': failed: {e}", profile.id()),
        }
        AnalysisReport { result, trace }
    }

    fn run(
        &self,
        profile: &RowProfile,
        trace: &mut ProfileTrace,
    ) -> Result<AlignmentResult, ProfileError> {
        let p = &self.params;

        let stage = Instant::now();
        let normalized = normalize_profile(profile, &p.normalize)?;
        trace.normalized = normalized.samples().to_vec();
        trace.timings.push_since("normalize", stage);

        let stage = Instant::now();
        let landmarks = find_landmarks(&normalized, &p.detect);
        trace.landmarks = landmarks.clone();
        trace.timings.push_since("detect", stage);

        let stage = Instant::now();
        let valley = lowest_valley(&landmarks)
            .ok_or_else(|| ProfileError::undefined("no valley detected"))?;
        let refinement = refine_valley(&normalized, valley, &p.refine);
        trace.refinement = Some(refinement.clone());
        trace.timings.push_since("refine", stage);

        let stage = Instant::now();
        let edges = locate_edges(&normalized, refinement.landmark.position, &p.gradient)?;
        trace.edges = edges.clone();
        trace.timings.push_since("gradient", stage);

        let stage = Instant::now();
        let intersections = match crossings(&refinement, &edges, trace) {
            Ok(points) => Some(points),
            Err(e) if p.metrics.inner_fallback != InnerFallback::Disabled => {
                debug!(
                    "analyze '{}': {e}; falling back to {:?}",
                    profile.id(),
                    p.metrics.inner_fallback
                );
                None
            }
            Err(e) => return Err(e),
        };
        trace.intersections = intersections;
        trace.timings.push_since("intersect", stage);

        let trapezoid = match &p.trapezoid {
            Some(params) => {
                let stage = Instant::now();
                let edges = locate_trapezoid(&normalized, refinement.landmark.position, params)?;
                trace.trapezoid = Some(edges.clone());
                trace.timings.push_since("trapezoid", stage);
                Some(edges)
            }
            None => None,
        };

        let stage = Instant::now();
        let result = aggregate(
            AggregateInput {
                profile_id: profile.id(),
                landmarks: &landmarks,
                valley: &refinement.landmark,
                edges: &edges,
                intersections,
                trapezoid: trapezoid.as_ref(),
            },
            &p.metrics,
        )?;
        trace.timings.push_since("aggregate", stage);
        Ok(result)
    }
}

/// Left and right crossings of the valley parabola with the edge lines.
fn crossings(
    refinement: &Refinement,
    edges: &EdgePair,
    trace: &mut ProfileTrace,
) -> Result<[IntersectionPoint; 2], ProfileError> {
    let fit = refinement.convex_fit().ok_or_else(|| {
        ProfileError::no_intersection(
            None,
            format!("valley not refined ({:?})", refinement.outcome),
        )
    })?;
    let mut points = [None, None];
    for (slot, side) in [Side::Left, Side::Right].into_iter().enumerate() {
        let feature = edges
            .get(side)
            .ok_or_else(|| ProfileError::no_intersection(Some(side), "no edge on this side"))?;
        let line = feature.line()?;
        trace.lines[slot] = Some(line);
        points[slot] = Some(intersect_parabola_line(fit, &line, Some(side))?);
    }
    match points {
        [Some(left), Some(right)] => Ok([left, right]),
        _ => Err(ProfileError::no_intersection(None, "missing crossing")),
    }
}

/// Analyze every profile; output order and ids follow the input.
pub fn analyze_batch(analyzer: &ProfileAnalyzer, profiles: &[RowProfile]) -> Vec<BatchEntry> {
    let run = |profile: &RowProfile| BatchEntry {
        id: profile.id().to_string(),
        result: analyzer.analyze(profile),
    };
    #[cfg(feature = "parallel")]
    let entries: Vec<BatchEntry> = profiles.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let entries: Vec<BatchEntry> = profiles.iter().map(run).collect();
    log_batch(&entries);
    entries
}

/// Load and analyze every profile of `source`.
///
/// Only listing the source can fail as a whole; a profile that fails to load
/// is recorded as an error entry.
pub fn analyze_source<S: ProfileSource + ?Sized>(
    source: &S,
    analyzer: &ProfileAnalyzer,
) -> Result<Vec<BatchEntry>, ProfileError> {
    let ids = source.ids()?;
    let run = |id: &String| BatchEntry {
        id: id.clone(),
        result: source.load(id).and_then(|p| analyzer.analyze(&p)),
    };
    #[cfg(feature = "parallel")]
    let entries: Vec<BatchEntry> = ids.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let entries: Vec<BatchEntry> = ids.iter().map(run).collect();
    log_batch(&entries);
    Ok(entries)
}

fn log_batch(entries: &[BatchEntry]) {
    let ok = entries.iter().filter(|e| e.is_ok()).count();
    debug!("batch: {ok}/{} profiles analyzed", entries.len());
}
