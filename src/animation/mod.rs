// Animation playback: clip sampling, actions, mixer and the speaking crossfade

pub mod action;
pub mod crossfade;
pub mod interpolation;
pub mod mixer;
pub mod skeleton;

pub use action::{ClipAction, LoopMode};
pub use crossfade::{PlaybackState, SpeakingCrossfade, Stance};
pub use interpolation::*;
pub use mixer::AnimationMixer;
pub use skeleton::*;
