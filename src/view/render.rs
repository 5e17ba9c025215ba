//! Terminal rendering of transcript entries.
//!
//! Every function returns a `String`; nothing here writes to a terminal or
//! reads session state. Widths are display columns, so CJK text takes two
//! columns per character.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::attachment::FileDescriptor;
use crate::sequencer::script::Table;
use crate::transcript::{AnalysisResult, AnalysisStep, Author, Message, StepCategory};

// ── ANSI escape helpers ─────────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";

pub const BUSY_TEXT: &str = "AI 引擎正在分析文件内容并模拟市场波动...";
pub const REASONING_HEADING: &str = "Reasoning Process (AI 推理思维链路)";
const RISK_MARKER: &str = "风险";

const WELCOME_TITLE: &str = "欢迎使用 PCB 智能报价助手";
const WELCOME_BODY: &str =
    "上传您的 Gerber 设计文件或 BOM 清单，输入需求，我将为您提供深度的设计解析、DFM 预检、成本预测及供应链风险分析。";
const WELCOME_TILES: [(&str, &str); 4] = [
    ("Gerber 解析", "自动提取层数、线宽、孔径参数"),
    ("DFM 风险", "识别制造瓶颈与良率隐患"),
    ("实时报价", "基于大宗商品指数的精准预测"),
    ("替代推荐", "关键器件停产预警与替换选型"),
];

/// Whether output carries ANSI styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Ansi,
    Plain,
}

fn glyph(category: StepCategory) -> &'static str {
    match category {
        StepCategory::Design => "▤",
        StepCategory::Dfm => "⚙",
        StepCategory::Cost => "↘",
        StepCategory::Risk => "▲",
    }
}

fn color(category: StepCategory) -> &'static str {
    match category {
        StepCategory::Design => BLUE,
        StepCategory::Dfm => YELLOW,
        StepCategory::Cost => GREEN,
        StepCategory::Risk => RED,
    }
}

// ── Renderer ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    width: usize,
    palette: Palette,
}

impl Renderer {
    /// `width` is clamped to at least 40 columns.
    #[must_use]
    pub fn new(width: usize, palette: Palette) -> Self {
        Self { width: width.max(40), palette }
    }

    #[must_use]
    pub fn palette(&self) -> Palette {
        self.palette
    }

    fn paint(&self, style: &str, text: &str) -> String {
        match self.palette {
            Palette::Ansi => format!("{style}{text}{RESET}"),
            Palette::Plain => text.to_string(),
        }
    }

    /// Empty-state call to action.
    #[must_use]
    pub fn welcome(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.paint(BOLD, WELCOME_TITLE));
        out.push('\n');
        for line in wrap(WELCOME_BODY, self.width) {
            out.push_str(&self.paint(GRAY, &line));
            out.push('\n');
        }
        out.push('\n');
        for (title, desc) in WELCOME_TILES {
            out.push_str(&format!("  {} {}\n", self.paint(BOLD, title), self.paint(GRAY, desc)));
        }
        out
    }

    #[must_use]
    pub fn busy(&self) -> String {
        format!("{}\n", self.paint(CYAN, &format!("… {BUSY_TEXT}")))
    }

    #[must_use]
    pub fn message(&self, message: &Message) -> String {
        match message.author {
            Author::User => self.user_bubble(message),
            Author::Assistant => self.assistant_bubble(message),
        }
    }

    /// Whole transcript, or the welcome screen when it is empty.
    #[must_use]
    pub fn transcript(&self, messages: &[Message], busy: bool) -> String {
        let mut out = String::new();
        if messages.is_empty() && !busy {
            out.push_str(&self.welcome());
        }
        for message in messages {
            out.push_str(&self.message(message));
            out.push('\n');
        }
        if busy {
            out.push_str(&self.busy());
        }
        out
    }

    /// Pending attachment chips, one line.
    #[must_use]
    pub fn chips(&self, files: &[FileDescriptor]) -> String {
        files
            .iter()
            .map(|f| self.paint(BLUE, &format!("[{} ({})]", f.name, f.size_label)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ── bubbles ──

    fn user_bubble(&self, message: &Message) -> String {
        let mut out = String::new();
        let inner = self.width * 3 / 4;
        if !message.attachments.is_empty() {
            let plain: Vec<String> = message
                .attachments
                .iter()
                .map(|f| format!("[{} ({})]", f.name, f.size_label))
                .collect();
            let indent = self.width.saturating_sub(plain.join(" ").width());
            out.push_str(&" ".repeat(indent));
            out.push_str(&self.chips(&message.attachments));
            out.push('\n');
        }
        if message.text.is_empty() {
            return out;
        }
        for line in wrap(&message.text, inner) {
            let indent = self.width.saturating_sub(line.width());
            out.push_str(&" ".repeat(indent));
            out.push_str(&self.paint(BOLD, &line));
            out.push('\n');
        }
        out
    }

    fn assistant_bubble(&self, message: &Message) -> String {
        let mut out = String::new();
        out.push_str(&self.paint(&format!("{BOLD}{BLUE}"), "◆ SiliconBOM"));
        out.push('\n');
        match &message.analysis {
            Some(analysis) => out.push_str(&self.analysis(analysis)),
            None => {
                for line in wrap(&message.text, self.width - 2) {
                    out.push_str(&format!("  {line}\n"));
                }
            }
        }
        out
    }

    fn analysis(&self, analysis: &AnalysisResult) -> String {
        let mut out = String::new();
        out.push_str(&format!("  {}\n", self.paint(&format!("{BOLD}{GRAY}"), REASONING_HEADING)));
        for line in wrap(&analysis.reasoning, self.width - 4) {
            out.push_str(&format!("  │ {}\n", self.paint(&format!("{DIM}{ITALIC}"), &line)));
        }
        for (idx, step) in analysis.steps.iter().enumerate() {
            out.push('\n');
            out.push_str(&self.card(idx + 1, step));
        }
        out
    }

    fn card(&self, index: usize, step: &AnalysisStep) -> String {
        let mut out = String::new();
        let style = color(step.category);
        let heading = format!("{} Step {index}: {}", glyph(step.category), step.title);
        out.push_str(&format!("  {}\n", self.paint(&format!("{BOLD}{style}"), &heading)));
        for line in wrap(&step.content, self.width - 4) {
            out.push_str(&format!("    {line}\n"));
        }
        if step.details.is_empty() {
            return out;
        }

        let label_width = step.details.iter().map(|(l, _)| l.width()).max().unwrap_or(0);
        out.push_str(&format!("    {}\n", self.paint(GRAY, &"─".repeat(self.width.saturating_sub(8).min(40)))));
        for (label, value) in step.details.iter() {
            let pad = " ".repeat(label_width - label.width());
            let value = if value.contains(RISK_MARKER) {
                self.paint(&format!("{BOLD}{RED}"), value)
            } else {
                self.paint(BOLD, value)
            };
            out.push_str(&format!("    {}{pad}  {value}\n", self.paint(GRAY, label)));
        }
        out
    }

    /// A demo data table with columns aligned by display width.
    #[must_use]
    pub fn table(&self, table: &Table) -> String {
        let mut widths: Vec<usize> = table.headers.iter().map(|h| h.width()).collect();
        for row in table.rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.width());
            }
        }
        let line = |cells: &[&str]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{cell}{}", " ".repeat(w - cell.width())))
                .collect::<Vec<_>>()
                .join(" │ ")
        };

        let mut out = String::new();
        out.push_str(&format!("{}\n", self.paint(BOLD, table.title)));
        out.push_str(&format!("{}\n", self.paint(BOLD, line(table.headers).trim_end())));
        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        out.push_str(&format!("{}\n", self.paint(GRAY, &rule.join("─┼─"))));
        for row in table.rows {
            out.push_str(line(*row).trim_end());
            out.push('\n');
        }
        out
    }
}

/// Greedy wrap by display width. Breaks anywhere, since CJK text has no
/// spaces; existing newlines are kept.
#[must_use]
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for source in text.lines() {
        let mut line = String::new();
        let mut used = 0;
        for c in source.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            line.push(c);
            used += w;
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
