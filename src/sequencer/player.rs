//! Generic timeline interpreter.
//!
//! The player walks a stage list in order and drives a `StageSink`. Pacing
//! only decides whether the waits are real; the sink sees the same calls in
//! the same order either way.

use std::io;
use std::time::Duration;

use tracing::info;

use super::script::{Stage, Table};
use super::typewriter::{self, Unit};

/// Output surface for a played timeline.
pub trait StageSink {
    fn clear(&mut self) -> io::Result<()>;
    fn loader_start(&mut self, label: &str) -> io::Result<()>;
    fn loader_end(&mut self) -> io::Result<()>;
    fn reveal(&mut self, unit: Unit<'_>) -> io::Result<()>;
    /// Called once a typewriter block is fully revealed.
    fn text_end(&mut self) -> io::Result<()>;
    fn table(&mut self, table: &Table) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep for every delay and typewriter tick.
    Realtime,
    /// Skip all waits.
    Instant,
}

pub struct Player {
    pacing: Pacing,
    type_interval: Duration,
}

impl Player {
    #[must_use]
    pub fn new(pacing: Pacing, type_interval: Duration) -> Self {
        Self { pacing, type_interval }
    }

    /// Play `script` to the end and return the kinds of the stages played.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the sink. Stages after it are not
    /// played.
    pub async fn play(&self, script: &[Stage], sink: &mut dyn StageSink) -> io::Result<Vec<&'static str>> {
        info!(stages = script.len(), pacing = ?self.pacing, "sequencer: play");
        let mut played = Vec::with_capacity(script.len());

        for stage in script {
            match stage {
                Stage::Clear => sink.clear()?,
                Stage::Loader { label, delay_ms } => {
                    sink.loader_start(label)?;
                    self.wait(Duration::from_millis(*delay_ms)).await;
                    sink.loader_end()?;
                }
                Stage::Typewriter { text } => {
                    for unit in typewriter::units(text) {
                        self.wait(self.type_interval * unit.hidden_ticks()).await;
                        sink.reveal(unit)?;
                        self.wait(self.type_interval).await;
                    }
                    sink.text_end()?;
                }
                Stage::Table { table } => sink.table(table)?,
                Stage::Pause { delay_ms } => self.wait(Duration::from_millis(*delay_ms)).await,
            }
            played.push(stage.kind());
        }

        info!(stages = played.len(), "sequencer: done");
        Ok(played)
    }

    async fn wait(&self, duration: Duration) {
        if self.pacing == Pacing::Realtime && !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
#[path = "player_test.rs"]
mod tests;
