// Animation playback timing. Frames advance on a fixed cadence and wrap.
// An animation with no frames is accepted but never advances.

use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{Animation, AnimationFrame, Millis, Rgb};

/// Scheduler state. There is no explicit stop: `Idle` is only left by `bind`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    Idle,
    Playing {
        animation: Animation,
        next_frame: usize,
        accumulated: Millis,
    },
}

/// A frame that became due on this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAdvance<'a> {
    pub index: usize,
    pub frame: &'a AnimationFrame,
}

/// Threshold-gated frame advance over the bound animation.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    frame_interval: Millis,
    state: PlaybackState,
}

impl PlaybackScheduler {
    pub fn new(frame_interval: Millis) -> Self {
        PlaybackScheduler {
            frame_interval,
            state: PlaybackState::Idle,
        }
    }

    /// Start playing `animation` from frame 0.
    pub fn bind(&mut self, animation: Animation) {
        if animation.frames.is_empty() {
            warn!(filename = %animation.filename, "animation has no frames, playback will not advance");
        }
        self.state = PlaybackState::Playing {
            animation,
            next_frame: 0,
            accumulated: Millis::zero(),
        };
    }

    /// Drop any bound animation.
    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    pub fn next_frame_index(&self) -> Option<usize> {
        match &self.state {
            PlaybackState::Playing { next_frame, .. } => Some(*next_frame),
            PlaybackState::Idle => None,
        }
    }

    pub fn animation(&self) -> Option<&Animation> {
        match &self.state {
            PlaybackState::Playing { animation, .. } => Some(animation),
            PlaybackState::Idle => None,
        }
    }

    /// Account for `elapsed` time. Returns the frame to apply if one is due.
    pub fn tick(&mut self, elapsed: Millis) -> Option<FrameAdvance<'_>> {
        let frame_interval = self.frame_interval;
        let PlaybackState::Playing {
            animation,
            next_frame,
            accumulated,
        } = &mut self.state
        else {
            return None;
        };

        let frame_count = animation.frames.len();
        if frame_count == 0 {
            return None;
        }

        *accumulated = *accumulated + elapsed;
        if *accumulated <= frame_interval {
            return None;
        }

        let index = *next_frame;
        *next_frame = (index + 1) % frame_count;
        *accumulated = Millis::zero();

        let frame = animation.frames.get(index)?;
        Some(FrameAdvance { index, frame })
    }
}

/// Frame color count differs from the rendered light count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountMismatch {
    pub frame_id: Option<i64>,
    pub colors: usize,
    pub lights: usize,
}

/// Apply `frame` to `lights` index for index, over the overlapping prefix.
pub fn recolor(frame: &AnimationFrame, lights: &mut [Rgb]) -> Option<CountMismatch> {
    for (light, color) in lights.iter_mut().zip(&frame.lights) {
        *light = color.to_rgb();
    }

    if frame.lights.len() == lights.len() {
        debug!(frame_id = ?frame.frame_id, lights = lights.len(), "frame applied");
        return None;
    }

    let mismatch = CountMismatch {
        frame_id: frame.frame_id,
        colors: frame.lights.len(),
        lights: lights.len(),
    };
    warn!(
        frame_id = ?mismatch.frame_id,
        colors = mismatch.colors,
        lights = mismatch.lights,
        "frame color count does not match light count"
    );
    Some(mismatch)
}
