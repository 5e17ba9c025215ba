//! Append-only terminal feed that follows session snapshots.
//!
//! A terminal cannot re-render in place, so "scroll to newest" becomes
//! "print only what is new": messages past the last one shown, and the busy
//! line when a turn starts.

use super::render::Renderer;
use crate::services::session::SessionSnapshot;

pub struct ChatFeed {
    renderer: Renderer,
    shown: usize,
    busy: bool,
    started: bool,
}

impl ChatFeed {
    #[must_use]
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer, shown: 0, busy: false, started: false }
    }

    /// Output for everything that changed since the previous snapshot.
    /// Empty when nothing did.
    pub fn update(&mut self, snapshot: &SessionSnapshot) -> String {
        let mut out = String::new();
        if !self.started {
            self.started = true;
            if snapshot.messages.is_empty() && !snapshot.busy {
                out.push_str(&self.renderer.welcome());
            }
        }

        for message in snapshot.messages.iter().skip(self.shown) {
            out.push_str(&self.renderer.message(message));
            out.push('\n');
        }
        self.shown = self.shown.max(snapshot.messages.len());

        if snapshot.busy && !self.busy {
            out.push_str(&self.renderer.busy());
        }
        self.busy = snapshot.busy;
        out
    }
}
