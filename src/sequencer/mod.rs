//! Scripted demo sequencer.
//!
//! DESIGN
//! ======
//! The offline demo bypasses the analysis service entirely. `script` holds
//! the timeline as a declarative stage list, `typewriter` splits text into
//! reveal units, and `player` interprets the stages against any output
//! surface.

pub mod player;
pub mod script;
pub mod typewriter;
