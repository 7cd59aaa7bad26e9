//! Idle/talking crossfade state machine.
//!
//! The blend is a single talking weight in [0, 1]; idle gets the complement,
//! so the two weights always sum to 1. A request for the opposite stance while
//! a fade is running retargets the blend in place: it reverses from the
//! current weights at the same fixed rate instead of restarting or queueing.

/// The two stances the speaking flag can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    Idle,
    Talking,
}

impl Stance {
    pub fn from_speaking(speaking: bool) -> Self {
        if speaking { Stance::Talking } else { Stance::Idle }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    IdleActive,
    TalkingActive,
    /// A fade toward `target` is in flight
    Transitioning { target: Stance },
}

#[derive(Debug, Clone)]
pub struct SpeakingCrossfade {
    state: PlaybackState,
    talking_weight: f32,
    fade_duration: f32,
}

impl SpeakingCrossfade {
    pub fn new(fade_duration: f32) -> Self {
        Self {
            state: PlaybackState::IdleActive,
            talking_weight: 0.0,
            fade_duration,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// The stance the blend is at or heading toward.
    pub fn target(&self) -> Stance {
        match self.state {
            PlaybackState::IdleActive => Stance::Idle,
            PlaybackState::TalkingActive => Stance::Talking,
            PlaybackState::Transitioning { target } => target,
        }
    }

    /// (idle, talking) weights
    pub fn weights(&self) -> (f32, f32) {
        (1.0 - self.talking_weight, self.talking_weight)
    }

    pub fn weight_of(&self, stance: Stance) -> f32 {
        match stance {
            Stance::Idle => 1.0 - self.talking_weight,
            Stance::Talking => self.talking_weight,
        }
    }

    /// Request a stance. Returns `true` when the incoming clip was fully faded
    /// out and must restart from time zero.
    pub fn request(&mut self, target: Stance) -> bool {
        if self.target() == target {
            return false;
        }
        let restart = self.weight_of(target) <= 0.0;
        self.state = PlaybackState::Transitioning { target };
        if self.fade_duration <= 0.0 {
            self.advance(0.0);
        }
        restart
    }

    /// Move the blend toward its target by `dt` time units.
    pub fn advance(&mut self, dt: f32) {
        let PlaybackState::Transitioning { target } = self.state else {
            return;
        };

        let step = if self.fade_duration > 0.0 {
            dt / self.fade_duration
        } else {
            1.0
        };
        match target {
            Stance::Talking => {
                self.talking_weight = (self.talking_weight + step).min(1.0);
                if self.talking_weight >= 1.0 {
                    self.state = PlaybackState::TalkingActive;
                }
            }
            Stance::Idle => {
                self.talking_weight = (self.talking_weight - step).max(0.0);
                if self.talking_weight <= 0.0 {
                    self.state = PlaybackState::IdleActive;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 0.016;

    fn run(fade: &mut SpeakingCrossfade, seconds: f32) {
        let ticks = (seconds / STEP).ceil() as usize;
        for _ in 0..ticks {
            fade.advance(STEP);
        }
    }

    #[test]
    fn starts_idle_at_full_weight() {
        let fade = SpeakingCrossfade::new(0.5);
        assert_eq!(fade.state(), PlaybackState::IdleActive);
        assert_eq!(fade.weights(), (1.0, 0.0));
    }

    #[test]
    fn request_transitions_synchronously() {
        let mut fade = SpeakingCrossfade::new(0.5);
        assert!(fade.request(Stance::Talking));
        assert_eq!(
            fade.state(),
            PlaybackState::Transitioning {
                target: Stance::Talking
            }
        );
    }

    #[test]
    fn completes_after_fade_window() {
        let mut fade = SpeakingCrossfade::new(0.5);
        fade.request(Stance::Talking);
        run(&mut fade, 0.6);
        assert_eq!(fade.state(), PlaybackState::TalkingActive);
        assert_eq!(fade.weights(), (0.0, 1.0));

        assert!(fade.request(Stance::Idle));
        run(&mut fade, 0.6);
        assert_eq!(fade.state(), PlaybackState::IdleActive);
        assert_eq!(fade.weights(), (1.0, 0.0));
    }

    #[test]
    fn repeated_request_is_ignored() {
        let mut fade = SpeakingCrossfade::new(0.5);
        fade.request(Stance::Talking);
        run(&mut fade, 0.2);
        let before = fade.weights();
        assert!(!fade.request(Stance::Talking));
        assert_eq!(fade.weights(), before);
    }

    #[test]
    fn reversal_mid_fade_retargets_without_restart() {
        let mut fade = SpeakingCrossfade::new(0.5);
        fade.request(Stance::Talking);
        run(&mut fade, 0.25);
        let (_, talking) = fade.weights();
        assert!(talking > 0.0 && talking < 1.0);

        // Idle still has weight, so it is not restarted
        assert!(!fade.request(Stance::Idle));
        fade.advance(STEP);
        assert!(fade.weights().1 < talking);

        run(&mut fade, 0.5);
        assert_eq!(fade.state(), PlaybackState::IdleActive);
    }

    #[test]
    fn rapid_toggling_never_zeroes_both_weights() {
        let mut fade = SpeakingCrossfade::new(0.5);
        for i in 0..200 {
            if i % 3 == 0 {
                fade.request(Stance::from_speaking(i % 2 == 0));
            }
            fade.advance(STEP);
            let (idle, talking) = fade.weights();
            assert!(idle > 0.0 || talking > 0.0);
            assert!((idle + talking - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_duration_snaps() {
        let mut fade = SpeakingCrossfade::new(0.0);
        fade.request(Stance::Talking);
        assert_eq!(fade.state(), PlaybackState::TalkingActive);
        assert_eq!(fade.weights(), (0.0, 1.0));
    }
}
