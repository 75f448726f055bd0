#![doc = include_str!("../README.md")]

// Analysis stages, in pipeline order.
pub mod normalize;
pub mod extrema;
pub mod refine;
pub mod gradient;
pub mod intersect;
pub mod trapezoid;
pub mod metrics;

// Orchestration, data model and results.
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod types;

// Caller-side layers: sources, files, grouping, tool configs.
pub mod config;
pub mod io;
pub mod report;
pub mod source;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::ProfileError;
pub use crate::pipeline::{
    analyze_batch, analyze_source, AnalyzerParams, BatchEntry, ProfileAnalyzer,
};
pub use crate::types::{AlignmentResult, Landmark, LandmarkKind, RowProfile, Side};

pub use crate::diagnostics::{AnalysisReport, ProfileTrace};
pub use crate::source::{InMemorySource, ProfileSource};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use shield_align::prelude::*;
///
/// # fn main() -> Result<(), ProfileError> {
/// let samples: Vec<f64> = (0..=20)
///     .map(|i| {
///         let x = i as f64;
///         10.0 * (-(x - 2.0).powi(2) / 8.0).exp() + 10.0 * (-(x - 18.0).powi(2) / 8.0).exp()
///     })
///     .collect();
/// let profile = RowProfile::new("demo", samples)?;
/// let result = ProfileAnalyzer::new(AnalyzerParams::default()).analyze(&profile)?;
/// println!("inner={:.3} outer={:.3} ratio={:.4}", result.inner_distance, result.outer_distance, result.ratio);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{AlignmentResult, AnalyzerParams, ProfileAnalyzer, ProfileError, RowProfile};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    pub use crate::extrema::{find_landmarks, find_peaks, find_valleys, lowest_valley, DetectParams};
    pub use crate::gradient::{
        flattest_segment_containing_max, locate_edges, steepest_segments, EdgePair,
        GradientFeature, GradientParams, LineModel, SlopeDirection,
    };
    pub use crate::intersect::{intersect_lines, intersect_parabola_line};
    pub use crate::metrics::{
        aggregate, distance_ratio, select_inner_peaks, select_outer_peaks, AggregateInput,
        InnerFallback, MetricParams, OuterPeakPolicy,
    };
    pub use crate::normalize::{normalize_profile, NormalizeParams};
    pub use crate::refine::{fit_parabola, refine_valley, ParabolicFit, RefineOutcome, RefineParams};
    pub use crate::trapezoid::{locate_trapezoid, TrapezoidEdges, TrapezoidParams};
    pub use crate::diagnostics::{StageTiming, TimingBreakdown};
}
