//! Concrete PSG engine
//!
//! A tick-based YM2149 / AY-3-8910 model implementing
//! [`SynthEngine`](crate::SynthEngine).

pub mod chip;
pub mod constants;
pub mod dc_filter;
pub mod generators;
pub mod mixer;

pub use chip::Ym2149Engine;
