//! One running animation: the timing state machine over a set of curves.

use std::collections::HashMap;

use vireo_css::interpolate::LengthEnv;
use vireo_css::keyframes::{AnimationData, AnimationDirection, AnimationFillMode, AnimationPlayState};
use vireo_css::property::CssPropertyId;
use vireo_css::StyleMap;

use crate::animation::curve::AnimationCurve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// In the delay phase with no backwards fill; contributes nothing.
    Inactive,
    Frame {
        values: StyleMap,
        /// First frame this animation ever produced.
        started: bool,
        /// The iteration counter advanced since the last frame.
        new_iteration: bool,
    },
    Finished {
        /// End values to keep applied (fill-mode forwards/both); `None`
        /// means revert to the committed style.
        retained: Option<StyleMap>,
    },
}

/// A single running animation, transition-generated or keyframe-declared.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub data: AnimationData,
    pub curves: HashMap<CssPropertyId, AnimationCurve>,
    pub state: AnimationState,
    pub is_transition: bool,
    start_time_ms: Option<f64>,
    pause_started_ms: Option<f64>,
    last_iteration: Option<u64>,
    started_reported: bool,
}

impl Animation {
    pub fn new(data: AnimationData, is_transition: bool) -> Self {
        let state = match data.play_state {
            AnimationPlayState::Running => AnimationState::Idle,
            AnimationPlayState::Paused => AnimationState::Paused,
        };
        Self {
            name: data.name.clone(),
            data,
            curves: HashMap::new(),
            state,
            is_transition,
            start_time_ms: None,
            pause_started_ms: None,
            last_iteration: None,
            started_reported: false,
        }
    }

    pub fn add_curve(&mut self, curve: AnimationCurve) {
        self.curves.insert(curve.property, curve);
    }

    pub fn animated_properties(&self) -> impl Iterator<Item = CssPropertyId> + '_ {
        self.curves.keys().copied()
    }

    pub fn pause(&mut self, now_ms: f64) {
        if self.state == AnimationState::Playing {
            self.state = AnimationState::Paused;
            self.pause_started_ms = Some(now_ms);
        }
    }

    pub fn resume(&mut self, now_ms: f64) {
        if self.state == AnimationState::Paused {
            if let (Some(start), Some(paused_at)) = (self.start_time_ms, self.pause_started_ms) {
                self.start_time_ms = Some(start + (now_ms - paused_at));
            }
            self.pause_started_ms = None;
            self.state = if self.start_time_ms.is_some() {
                AnimationState::Playing
            } else {
                AnimationState::Idle
            };
        }
    }

    pub fn stop(&mut self) {
        self.state = AnimationState::Stopped;
    }

    /// End values of every curve, for fill-forwards retention.
    pub fn end_values(&self) -> StyleMap {
        self.curves
            .iter()
            .filter_map(|(prop, curve)| curve.end_value().map(|v| (*prop, v.clone())))
            .collect()
    }

    fn directed_progress(&self, iteration: u64, progress: f64) -> f64 {
        let reversed = match self.data.direction {
            AnimationDirection::Normal => false,
            AnimationDirection::Reverse => true,
            AnimationDirection::Alternate => iteration % 2 == 1,
            AnimationDirection::AlternateReverse => iteration % 2 == 0,
        };
        if reversed { 1.0 - progress } else { progress }
    }

    fn fills_backwards(&self) -> bool {
        matches!(
            self.data.fill_mode,
            AnimationFillMode::Backwards | AnimationFillMode::Both
        )
    }

    fn fills_forwards(&self) -> bool {
        matches!(
            self.data.fill_mode,
            AnimationFillMode::Forwards | AnimationFillMode::Both
        )
    }

    fn sample(&self, directed: f64, env: &LengthEnv) -> StyleMap {
        let mut out = StyleMap::default();
        for (prop, curve) in &self.curves {
            let value = if curve.scaled_duration_ms <= 0.0 {
                // Zero-duration curves have no timeline; pick an endpoint.
                if directed >= 1.0 {
                    curve.end_value().cloned()
                } else {
                    curve.start_value().cloned()
                }
            } else {
                curve.get_value(directed * curve.scaled_duration_ms, env)
            };
            if let Some(value) = value {
                out.insert(*prop, value);
            }
        }
        out
    }

    /// Advance to `now_ms` and produce this frame's values.
    ///
    /// `strict_zero_duration` selects the corrected progress for the
    /// zero-duration + delay + fill-backwards corner; the default keeps the
    /// engine's historical answer of 1.0.
    pub fn tick(&mut self, now_ms: f64, env: &LengthEnv, strict_zero_duration: bool) -> TickOutcome {
        match self.state {
            AnimationState::Stopped => return TickOutcome::Finished { retained: None },
            AnimationState::Idle => {
                self.start_time_ms = Some(now_ms);
                self.state = AnimationState::Playing;
            }
            AnimationState::Paused => {
                if self.start_time_ms.is_none() {
                    // Declared paused before ever running: hold the first frame.
                    let p = self.directed_progress(0, 0.0);
                    return self.frame(self.sample(p, env));
                }
            }
            AnimationState::Playing => {}
        }

        let start = self.start_time_ms.unwrap_or(now_ms);
        let effective_now = self.pause_started_ms.unwrap_or(now_ms);
        let elapsed = effective_now - start - self.data.delay_ms;
        let duration = self.data.duration_ms;

        if elapsed < 0.0 {
            if duration <= 0.0 && self.data.delay_ms != 0.0 && self.fills_backwards() {
                // Historical quirk: the delay phase of a zero-duration
                // backwards-filled animation reports end progress.
                let p = if strict_zero_duration { 0.0 } else { 1.0 };
                return self.frame(self.sample(p, env));
            }
            if self.fills_backwards() {
                let p = self.directed_progress(0, 0.0);
                return self.frame(self.sample(p, env));
            }
            return TickOutcome::Inactive;
        }

        if duration <= 0.0 {
            return self.finish(env);
        }

        let count = if self.data.is_infinite() {
            f64::INFINITY
        } else {
            self.data.iteration_count.max(0.0)
        };
        let iterations = elapsed / duration;
        if iterations >= count {
            return self.finish(env);
        }

        let iteration = iterations.floor() as u64;
        let progress = iterations - iteration as f64;
        let directed = self.directed_progress(iteration, progress);
        let new_iteration = self.last_iteration.is_some_and(|last| last != iteration);
        self.last_iteration = Some(iteration);
        let started = !self.started_reported;
        self.started_reported = true;
        TickOutcome::Frame {
            values: self.sample(directed, env),
            started,
            new_iteration,
        }
    }

    fn frame(&mut self, values: StyleMap) -> TickOutcome {
        let started = !self.started_reported;
        self.started_reported = true;
        TickOutcome::Frame {
            values,
            started,
            new_iteration: false,
        }
    }

    fn finish(&mut self, env: &LengthEnv) -> TickOutcome {
        self.state = AnimationState::Stopped;
        if !self.fills_forwards() {
            return TickOutcome::Finished { retained: None };
        }
        // The fill frame is the directed progress at the exact end of the
        // final iteration, which for fractional counts is mid-timeline.
        let count = self.data.iteration_count.max(0.0);
        let fract = count.fract();
        let (iteration, progress) = if fract == 0.0 {
            ((count as u64).saturating_sub(1), 1.0)
        } else {
            (count.floor() as u64, fract)
        };
        let directed = self.directed_progress(iteration, progress);
        TickOutcome::Finished {
            retained: Some(self.sample(directed, env)),
        }
    }
}
