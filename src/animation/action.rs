use crate::model::AnimationClip;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once and hold the last frame
    Once,
    /// Wrap around forever
    Repeat,
}

/// Playback handle for one clip bound to a mixer.
#[derive(Debug, Clone)]
pub struct ClipAction {
    clip: Arc<AnimationClip>,
    time: f32,
    time_scale: f32,
    weight: f32,
    loop_mode: LoopMode,
    running: bool,
}

impl ClipAction {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::Repeat,
            running: false,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn play(&mut self) -> &mut Self {
        self.running = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.running = false;
        self.time = 0.0;
        self
    }

    /// Rewind to time zero without changing running state
    pub fn reset(&mut self) -> &mut Self {
        self.time = 0.0;
        self
    }

    pub fn set_effective_weight(&mut self, weight: f32) -> &mut Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    pub fn set_effective_time_scale(&mut self, time_scale: f32) -> &mut Self {
        self.time_scale = time_scale;
        self
    }

    pub fn set_loop(&mut self, loop_mode: LoopMode) -> &mut Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Weight the mixer actually applies: zero when stopped
    pub fn effective_weight(&self) -> f32 {
        if self.running { self.weight } else { 0.0 }
    }

    pub fn advance(&mut self, dt: f32) {
        if !self.running {
            return;
        }
        self.time += dt * self.time_scale;

        let duration = self.clip.duration;
        if duration <= 0.0 {
            self.time = 0.0;
            return;
        }
        match self.loop_mode {
            LoopMode::Repeat => self.time = self.time.rem_euclid(duration),
            LoopMode::Once => self.time = self.time.clamp(0.0, duration),
        }
    }
}
