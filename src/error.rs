//! Error kinds reported by the geometric and metric stages.
//!
//! Detection and refinement never fail: they return empty or unrefined
//! results instead. Everything downstream of them returns a typed
//! [`ProfileError`] which batch processing records against the profile id.

use crate::types::Side;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileError {
    /// Profile too short or malformed for the configured windows.
    #[error("invalid profile: {reason}")]
    InvalidProfile { reason: String },
    /// A window clipped to the profile bounds left too few samples.
    #[error("insufficient data for {context} ({found} < {needed} samples)")]
    InsufficientData {
        context: &'static str,
        needed: usize,
        found: usize,
    },
    /// The fitted primitives have no crossing inside their valid domain.
    #[error("no {side:?} intersection: {reason}")]
    NoIntersection {
        side: Option<Side>,
        reason: String,
    },
    /// Division by zero or missing inputs for a distance or ratio.
    #[error("metric undefined: {reason}")]
    MetricUndefined { reason: String },
    /// The profile could not be produced by its source.
    #[error("failed to load profile {id}: {reason}")]
    Source { id: String, reason: String },
}

impl ProfileError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ProfileError::InvalidProfile {
            reason: reason.into(),
        }
    }

    pub(crate) fn undefined(reason: impl Into<String>) -> Self {
        ProfileError::MetricUndefined {
            reason: reason.into(),
        }
    }

    pub(crate) fn no_intersection(side: Option<Side>, reason: impl Into<String>) -> Self {
        ProfileError::NoIntersection {
            side,
            reason: reason.into(),
        }
    }

    /// Short machine-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ProfileError::InvalidProfile { .. } => "invalid_profile",
            ProfileError::InsufficientData { .. } => "insufficient_data",
            ProfileError::NoIntersection { .. } => "no_intersection",
            ProfileError::MetricUndefined { .. } => "metric_undefined",
            ProfileError::Source { .. } => "source",
        }
    }
}
