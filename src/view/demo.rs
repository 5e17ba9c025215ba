//! Terminal surface for the scripted demo.

use std::io::{self, Write};

use super::render::{Palette, Renderer};
use crate::sequencer::player::StageSink;
use crate::sequencer::script::Table;
use crate::sequencer::typewriter::Unit;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Writes demo stages to any `Write`, flushing after each reveal so the
/// typewriter is visible.
pub struct TerminalSurface<W> {
    out: W,
    renderer: Renderer,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, renderer: Renderer) -> Self {
        Self { out, renderer }
    }

    /// Show the welcome view that the script's opening clear removes.
    pub fn welcome(&mut self) -> io::Result<()> {
        self.out.write_all(self.renderer.welcome().as_bytes())?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn ansi(&self) -> bool {
        self.renderer.palette() == Palette::Ansi
    }
}

impl<W: Write> StageSink for TerminalSurface<W> {
    fn clear(&mut self) -> io::Result<()> {
        if self.ansi() {
            self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        self.out.flush()
    }

    fn loader_start(&mut self, label: &str) -> io::Result<()> {
        write!(self.out, "⟳ {label}")?;
        self.out.flush()
    }

    fn loader_end(&mut self) -> io::Result<()> {
        if self.ansi() {
            self.out.write_all(CLEAR_LINE.as_bytes())?;
        } else {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    fn reveal(&mut self, unit: Unit<'_>) -> io::Result<()> {
        let text = if self.ansi() { unit.ansi() } else { unit.plain() };
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    fn text_end(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n")
    }

    fn table(&mut self, table: &Table) -> io::Result<()> {
        writeln!(self.out, "{}", self.renderer.table(table))
    }
}
