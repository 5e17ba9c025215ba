use super::*;
use crate::attachment::RawFile;
use crate::services::analysis::fallback_result;
use crate::transcript::Transcript;

fn plain() -> Renderer {
    Renderer::new(80, Palette::Plain)
}

fn answered() -> Vec<Message> {
    let mut transcript = Transcript::new();
    transcript.push_user("分析此4层板报价", vec![FileDescriptor::from_raw(&RawFile::new("bom.xlsx", 10_240))]);
    transcript.push_assistant(fallback_result());
    transcript.messages().to_vec()
}

#[test]
fn empty_transcript_shows_welcome_tiles() {
    let out = plain().transcript(&[], false);
    assert!(out.contains("欢迎使用 PCB 智能报价助手"));
    for tile in ["Gerber 解析", "DFM 风险", "实时报价", "替代推荐"] {
        assert!(out.contains(tile), "missing {tile}");
    }
}

#[test]
fn busy_replaces_welcome() {
    let out = plain().transcript(&[], true);
    assert!(!out.contains("欢迎使用"));
    assert!(out.contains(BUSY_TEXT));
}

#[test]
fn user_bubble_is_right_aligned_with_chips() {
    let messages = answered();
    let out = plain().message(&messages[0]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("[bom.xlsx (10.0KB)]"));
    assert_eq!(lines[0].width(), 80);
    assert_eq!(lines[1].trim_start(), "分析此4层板报价");
    assert_eq!(lines[1].width(), 80);
}

#[test]
fn assistant_bubble_has_reasoning_and_numbered_cards() {
    let messages = answered();
    let out = plain().message(&messages[1]);
    assert!(out.contains(REASONING_HEADING));
    assert!(out.contains("▤ Step 1: 设计文件智能解析"));
    assert!(out.contains("⚙ Step 2: 制造难度与 DFM 预检"));
    assert!(out.contains("↘ Step 3: 动态成本预测"));
    assert!(out.contains("▲ Step 4: 供应链风险预警"));
    let reasoning = out.find(REASONING_HEADING).unwrap();
    assert!(reasoning < out.find("Step 1").unwrap());
}

#[test]
fn detail_rows_align_labels() {
    let messages = answered();
    let out = plain().message(&messages[1]);
    let yield_row = out.lines().find(|l| l.ends_with("94.2%")).unwrap();
    let score_row = out.lines().find(|l| l.ends_with("7.8 / 10")).unwrap();
    assert!(yield_row.contains("良率预测"));
    assert_eq!(yield_row.width() - "94.2%".width(), score_row.width() - "7.8 / 10".width());
}

#[test]
fn risk_values_are_highlighted_in_red() {
    let mut step_result = fallback_result();
    step_result.steps[0].details.insert("评估", "高风险");
    let mut transcript = Transcript::new();
    let message = transcript.push_assistant(step_result);

    let out = Renderer::new(80, Palette::Ansi).message(&message);
    assert!(out.contains("\x1b[1m\x1b[31m高风险\x1b[0m"));
    assert!(!out.contains("\x1b[1m\x1b[31m0.2mm"));
}

#[test]
fn plain_palette_has_no_escapes() {
    let messages = answered();
    assert!(!plain().transcript(&messages, false).contains('\x1b'));
}

#[test]
fn wrap_counts_cjk_as_double_width() {
    let lines = wrap("四层板沉金工艺", 6);
    assert_eq!(lines, ["四层板", "沉金工", "艺"]);
    assert_eq!(wrap("", 10), [""]);
    assert_eq!(wrap("a\nb", 10), ["a", "b"]);
}

#[test]
fn table_columns_align_by_display_width() {
    let table = Table {
        title: "报价",
        headers: &["项目", "金额"],
        rows: &[&["PCB", "¥850"], &["元器件", "¥1,236"]],
    };
    let out = plain().table(&table);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "报价");
    let bar = |l: &str| l.split('│').next().map(UnicodeWidthStr::width);
    assert_eq!(bar(lines[1]), bar(lines[3]));
    assert_eq!(bar(lines[3]), bar(lines[4]));
}
