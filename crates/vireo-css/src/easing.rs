//! Easing functions: the CSS named curves, cubic-bezier, and steps.

use serde::{Deserialize, Serialize};

/// Position for stepped easing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    /// Jump at the start of each interval.
    Start,
    /// Jump at the end of each interval.
    #[default]
    End,
}

/// Easing specification for animations and transitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimingFunction {
    /// Linear interpolation (no easing).
    Linear,
    /// CSS `ease`.
    Ease,
    /// CSS `ease-in`.
    EaseIn,
    /// CSS `ease-out`.
    EaseOut,
    /// CSS `ease-in-out`.
    EaseInOut,
    /// Custom cubic bezier curve.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// Stepped easing with discrete jumps.
    Steps { count: u32, position: StepPosition },
}

impl Default for TimingFunction {
    fn default() -> Self {
        Self::Linear
    }
}

impl TimingFunction {
    /// Evaluate the curve at `t ∈ [0, 1]`.
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            TimingFunction::Linear => t,
            TimingFunction::Ease => bezier(0.25, 0.1, 0.25, 1.0, t),
            TimingFunction::EaseIn => bezier(0.42, 0.0, 1.0, 1.0, t),
            TimingFunction::EaseOut => bezier(0.0, 0.0, 0.58, 1.0, t),
            TimingFunction::EaseInOut => bezier(0.42, 0.0, 0.58, 1.0, t),
            TimingFunction::CubicBezier { x1, y1, x2, y2 } => bezier(x1, y1, x2, y2, t),
            TimingFunction::Steps { count, position } => {
                if count == 0 {
                    return t;
                }
                let steps = count as f64;
                let current = match position {
                    StepPosition::Start => (t * steps).ceil(),
                    StepPosition::End => (t * steps).floor(),
                };
                (current / steps).clamp(0.0, 1.0)
            }
        }
    }
}

/// Solve a unit cubic bezier `(0,0) (x1,y1) (x2,y2) (1,1)` for the given
/// input progress. Newton-Raphson with a bisection fallback for flat slopes.
fn bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let cx = 3.0 * x1;
    let bx = 3.0 * (x2 - x1) - cx;
    let ax = 1.0 - cx - bx;

    let cy = 3.0 * y1;
    let by = 3.0 * (y2 - y1) - cy;
    let ay = 1.0 - cy - by;

    let sample_x = |t: f64| ((ax * t + bx) * t + cx) * t;
    let sample_y = |t: f64| ((ay * t + by) * t + cy) * t;
    let sample_dx = |t: f64| (3.0 * ax * t + 2.0 * bx) * t + cx;

    const EPS: f64 = 1e-7;

    // Newton-Raphson, usually converges in a handful of iterations.
    let mut t = x;
    for _ in 0..8 {
        let err = sample_x(t) - x;
        if err.abs() < EPS {
            return sample_y(t);
        }
        let d = sample_dx(t);
        if d.abs() < 1e-6 {
            break;
        }
        t -= err / d;
    }

    // Bisection fallback.
    let (mut lo, mut hi) = (0.0, 1.0);
    t = x;
    while hi - lo > EPS {
        if sample_x(t) < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.0;
    }
    sample_y(t)
}
