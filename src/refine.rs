//! Sub-sample valley refinement by least-squares parabola fitting.
//!
//! The fit window is `[index - w, index + w]` clipped to the profile, where
//! `index` is the detector's sample index. Because the window never follows
//! the refined position, refining twice gives the same answer.
//!
//! The quadratic is solved in coordinates centred on `index` (better
//! conditioned normal equations) and then mapped back to absolute index
//! space, which is what the intersection stage consumes.
//!
//! Every failure mode falls back to the unrefined landmark; the reason is
//! reported through [`RefineOutcome`].

use crate::types::{Landmark, RowProfile, SampleWindow};
use log::{debug, warn};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Refiner knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    /// Samples taken on each side of the valley index.
    pub half_width: usize,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self { half_width: 3 }
    }
}

/// Quadratic `y = a·x² + b·x + c` over an inclusive sample window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParabolicFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub window: SampleWindow,
    /// Root-mean-square residual over the window samples.
    pub rms_residual: f64,
}

impl ParabolicFit {
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        (self.a * x + self.b) * x + self.c
    }

    #[inline]
    pub fn slope_at(&self, x: f64) -> f64 {
        2.0 * self.a * x + self.b
    }

    pub fn is_convex(&self) -> bool {
        self.a > 0.0
    }

    /// Vertex `(x, y)`; `None` for a degenerate (`a == 0`) fit.
    pub fn vertex(&self) -> Option<(f64, f64)> {
        if self.a == 0.0 || !self.a.is_finite() {
            return None;
        }
        let x = -self.b / (2.0 * self.a);
        Some((x, self.c - self.b * self.b / (4.0 * self.a)))
    }
}

/// Why a refinement did or did not move the landmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineOutcome {
    Refined,
    NotAValley,
    TooFewSamples,
    Singular,
    NotConvex,
    VertexOutsideWindow,
}

/// Refined (or fallback) landmark together with the fit that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub landmark: Landmark,
    /// Present whenever the least-squares system could be solved.
    pub fit: Option<ParabolicFit>,
    pub outcome: RefineOutcome,
}

impl Refinement {
    fn unchanged(landmark: &Landmark, fit: Option<ParabolicFit>, outcome: RefineOutcome) -> Self {
        Self {
            landmark: landmark.clone(),
            fit,
            outcome,
        }
    }

    pub fn is_refined(&self) -> bool {
        self.outcome == RefineOutcome::Refined
    }

    /// Fit usable by the intersection stage (refined, convex).
    pub fn convex_fit(&self) -> Option<&ParabolicFit> {
        self.fit
            .as_ref()
            .filter(|_| self.outcome == RefineOutcome::Refined)
    }
}

/// Least-squares quadratic through `profile[window]`, centred on `origin`.
///
/// Returns `None` for windows under three samples or a singular system.
pub fn fit_parabola(
    profile: &RowProfile,
    window: SampleWindow,
    origin: usize,
) -> Option<ParabolicFit> {
    if window.len() < 3 {
        return None;
    }
    let data = profile.samples();
    let x0 = origin as f64;

    // Power sums of u = x - x0 and the moments of y.
    let mut s = [0.0f64; 5];
    let mut t = [0.0f64; 3];
    for i in window.indices() {
        let u = i as f64 - x0;
        let y = data[i];
        let mut p = 1.0;
        for (k, sk) in s.iter_mut().enumerate() {
            *sk += p;
            if k < 3 {
                t[k] += p * y;
            }
            p *= u;
        }
    }

    let m = Matrix3::new(s[4], s[3], s[2], s[3], s[2], s[1], s[2], s[1], s[0]);
    let rhs = Vector3::new(t[2], t[1], t[0]);
    let sol = m.lu().solve(&rhs)?;
    let (a, bu, cu) = (sol[0], sol[1], sol[2]);
    if !(a.is_finite() && bu.is_finite() && cu.is_finite()) {
        warn!("fit_parabola: non-finite coefficients over {window:?}");
        return None;
    }

    let mut sse = 0.0;
    for i in window.indices() {
        let u = i as f64 - x0;
        let r = (a * u + bu) * u + cu - data[i];
        sse += r * r;
    }

    Some(ParabolicFit {
        a,
        b: bu - 2.0 * a * x0,
        c: (a * x0 - bu) * x0 + cu,
        window,
        rms_residual: (sse / window.len() as f64).sqrt(),
    })
}

/// Refine a valley to the vertex of its local parabola.
pub fn refine_valley(profile: &RowProfile, valley: &Landmark, params: &RefineParams) -> Refinement {
    if !valley.is_valley() {
        return Refinement::unchanged(valley, None, RefineOutcome::NotAValley);
    }
    let window = profile.clipped_window(valley.index, params.half_width, params.half_width);
    if window.len() < 3 {
        debug!(
            "refine_valley '{}': window {window:?} too small at index {}",
            profile.id(),
            valley.index
        );
        return Refinement::unchanged(valley, None, RefineOutcome::TooFewSamples);
    }

    let Some(fit) = fit_parabola(profile, window, valley.index) else {
        return Refinement::unchanged(valley, None, RefineOutcome::Singular);
    };
    if !fit.is_convex() {
        debug!(
            "refine_valley '{}': concave fit (a={:.3e}) at index {}",
            profile.id(),
            fit.a,
            valley.index
        );
        return Refinement::unchanged(valley, Some(fit), RefineOutcome::NotConvex);
    }

    // Vertex relative to the centre keeps the cancellation small.
    let x0 = valley.index as f64;
    let bu = fit.slope_at(x0);
    let u = -bu / (2.0 * fit.a);
    let x_star = x0 + u;
    if !window.contains(x_star) {
        debug!(
            "refine_valley '{}': vertex {x_star:.3} outside {window:?}",
            profile.id()
        );
        return Refinement::unchanged(valley, Some(fit), RefineOutcome::VertexOutsideWindow);
    }
    let value = fit.eval(x0) - bu * bu / (4.0 * fit.a);

    let mut refined = valley.clone();
    refined.position = x_star;
    refined.value = value;
    refined.refined = true;
    Refinement {
        landmark: refined,
        fit: Some(fit),
        outcome: RefineOutcome::Refined,
    }
}
