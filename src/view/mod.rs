//! Terminal presentation.
//!
//! Purely reactive: `render` turns transcript entries into text, `feed`
//! follows session snapshots, and `demo` is the output surface for the
//! scripted sequencer. No module here holds domain logic.

pub mod demo;
pub mod feed;
pub mod render;
