//! Analysis service: prompt + attachments → structured quotation report.
//!
//! DESIGN
//! ======
//! One LLM call per turn, constrained to the quotation report schema. The
//! model's `details` arrive as `{label, value}` pairs and are folded into an
//! ordered label → value map (last write wins, incomplete pairs dropped).
//!
//! Failures never reach the caller. A missing client, transport error,
//! non-2xx status, malformed JSON or schema violation all degrade to the
//! canned fallback report. The outcome records which path produced the
//! result so logs and API consumers can still tell them apart.

use std::sync::OnceLock;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::attachment::FileDescriptor;
use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::llm::config::env_parse;
use crate::llm::schema::quotation_report_output;
use crate::llm::types::{LlmError, Message};
use crate::transcript::{AnalysisResult, AnalysisStep, Details, StepCategory};

const DEFAULT_ANALYSIS_MAX_TOKENS: u32 = 4096;

fn analysis_max_tokens() -> u32 {
    static VALUE: OnceLock<u32> = OnceLock::new();
    *VALUE.get_or_init(|| env_parse("ANALYSIS_MAX_TOKENS", DEFAULT_ANALYSIS_MAX_TOKENS))
}

pub(crate) const SYSTEM_INSTRUCTION: &str = "\
You are a world-class PCB/PCBA engineering and supply chain expert for a B2B SaaS platform called SiliconBOM.
Your task is to analyze user requests and provided files (simulated for this demo) to generate a professional quotation report.

The report MUST include a \"reasoning\" section showing your expert logic, followed by 4 structured steps:
Step 1 (type \"design\"): Design File Analysis (Layer counts, track width, mapping NLP terms like 'Immersion Gold' to specs).
Step 2 (type \"dfm\"): DFM (Design for Manufacture) & Complexity (Scoring complexity, layout issues, SMT difficulty).
Step 3 (type \"cost\"): Dynamic Cost Prediction (Simulate live copper/gold price influence, strategy for prototype vs mass production).
Step 4 (type \"risk\"): Supply Chain Risk (Identify obsolete parts, long lead times, recommend alternatives).
Each step has a title, a content paragraph and a list of label/value detail pairs.

CRITICAL:
- Use conservative, professional B2B terminology.
- NO emojis.
- Language: Simplified Chinese.";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("LLM not configured")]
    LlmNotConfigured,
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("model returned no output (stop_reason={0})")]
    EmptyOutput(String),
    #[error("report is not valid JSON: {0}")]
    ReportParse(String),
    #[error("report violates schema: {0}")]
    SchemaViolation(String),
}

impl ErrorCode for AnalysisError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::Llm(e) => e.error_code(),
            Self::EmptyOutput(_) => "E_EMPTY_OUTPUT",
            Self::ReportParse(_) => "E_REPORT_PARSE",
            Self::SchemaViolation(_) => "E_SCHEMA_VIOLATION",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Llm(e) if e.retryable())
    }
}

/// Which path produced an analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisSource {
    /// The remote model answered with a valid report.
    Model { model: String },
    /// The canned report was substituted; `code` names the failure.
    Fallback { code: &'static str },
}

impl AnalysisSource {
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// An analysis result together with its provenance.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub source: AnalysisSource,
}

// =============================================================================
// MAIN ENTRY POINTS
// =============================================================================

/// Produce a quotation report. Never fails; see [`analyze_with_source`].
pub async fn analyze(llm: Option<&dyn LlmChat>, prompt: &str, attachments: &[FileDescriptor]) -> AnalysisResult {
    analyze_with_source(llm, prompt, attachments).await.result
}

/// Produce a quotation report and record whether the model or the fallback
/// supplied it.
pub async fn analyze_with_source(
    llm: Option<&dyn LlmChat>,
    prompt: &str,
    attachments: &[FileDescriptor],
) -> Analysis {
    info!(prompt_len = prompt.len(), attachments = attachments.len(), "analysis: request");

    match request_report(llm, prompt, attachments).await {
        Ok((result, model)) => {
            info!(steps = result.steps.len(), %model, "analysis: model report");
            Analysis { result, source: AnalysisSource::Model { model } }
        }
        Err(e) => {
            let code = e.error_code();
            warn!(code, retryable = e.retryable(), error = %e, "analysis: falling back to canned report");
            Analysis { result: fallback_result(), source: AnalysisSource::Fallback { code } }
        }
    }
}

async fn request_report(
    llm: Option<&dyn LlmChat>,
    prompt: &str,
    attachments: &[FileDescriptor],
) -> Result<(AnalysisResult, String), AnalysisError> {
    let llm = llm.ok_or(AnalysisError::LlmNotConfigured)?;
    let output = quotation_report_output();
    let messages = [Message::user(build_user_content(prompt, attachments))];

    let response = llm
        .chat(analysis_max_tokens(), SYSTEM_INSTRUCTION, &messages, Some(&output))
        .await?;

    info!(
        stop_reason = %response.stop_reason,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "analysis: LLM response"
    );

    let text = response
        .output_text()
        .ok_or_else(|| AnalysisError::EmptyOutput(response.stop_reason.clone()))?;
    let result = parse_report(&text)?;
    Ok((result, response.model))
}

// =============================================================================
// PROMPT
// =============================================================================

pub(crate) fn build_user_content(prompt: &str, attachments: &[FileDescriptor]) -> String {
    let names = if attachments.is_empty() {
        "无".to_string()
    } else {
        attachments
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("用户上传了以下文件: {names}\n用户需求: {}\n请按 B2B SaaS 标准输出结构化解析报告。", prompt.trim())
}

// =============================================================================
// REPORT PARSING
// =============================================================================

#[derive(serde::Deserialize)]
struct ReportWire {
    reasoning: String,
    steps: Vec<StepWire>,
}

#[derive(serde::Deserialize)]
struct StepWire {
    title: String,
    content: String,
    #[serde(rename = "type")]
    category: String,
    #[serde(default)]
    details: Value,
}

/// One `{label, value}` entry as returned by the model. Either side may be
/// missing or not a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPair {
    pub label: Option<String>,
    pub value: Option<String>,
}

impl DetailPair {
    fn from_value(item: &Value) -> Self {
        let field = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_owned);
        Self { label: field("label"), value: field("value") }
    }
}

/// Fold detail pairs into an ordered map.
///
/// Pairs with a missing or empty label or value are dropped. A repeated
/// label keeps its first position and takes the last value.
#[must_use]
pub fn details_from_pairs(pairs: &[DetailPair]) -> Details {
    let mut details = Details::new();
    for pair in pairs {
        if let (Some(label), Some(value)) = (pair.label.as_deref(), pair.value.as_deref()) {
            if !label.is_empty() && !value.is_empty() {
                details.insert(label, value);
            }
        }
    }
    details
}

/// Accept the schema's pair array, and tolerate a plain object of strings.
fn details_from_value(raw: &Value) -> Details {
    match raw {
        Value::Array(items) => {
            let pairs: Vec<DetailPair> = items.iter().map(DetailPair::from_value).collect();
            details_from_pairs(&pairs)
        }
        Value::Object(map) => {
            let pairs: Vec<DetailPair> = map
                .iter()
                .map(|(k, v)| DetailPair { label: Some(k.clone()), value: v.as_str().map(str::to_owned) })
                .collect();
            details_from_pairs(&pairs)
        }
        _ => Details::new(),
    }
}

/// Strip a Markdown code fence some models wrap JSON in.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse and validate a report document.
///
/// # Errors
///
/// Returns `ReportParse` for malformed JSON or missing required fields and
/// `SchemaViolation` for blank reasoning, no steps, or an unknown step type.
pub fn parse_report(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let wire: ReportWire =
        serde_json::from_str(strip_code_fence(text)).map_err(|e| AnalysisError::ReportParse(e.to_string()))?;

    if wire.reasoning.trim().is_empty() {
        return Err(AnalysisError::SchemaViolation("reasoning is blank".into()));
    }
    if wire.steps.is_empty() {
        return Err(AnalysisError::SchemaViolation("no steps".into()));
    }

    let steps = wire
        .steps
        .into_iter()
        .map(|step| {
            let category = StepCategory::parse(&step.category)
                .ok_or_else(|| AnalysisError::SchemaViolation(format!("unknown step type '{}'", step.category)))?;
            Ok(AnalysisStep {
                title: step.title,
                content: step.content,
                category,
                details: details_from_value(&step.details),
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    Ok(AnalysisResult { reasoning: wire.reasoning, steps })
}

// =============================================================================
// FALLBACK REPORT
// =============================================================================

/// The canned report substituted whenever the model path fails.
#[must_use]
pub fn fallback_result() -> AnalysisResult {
    fn step(title: &str, content: &str, category: StepCategory, details: [(&str, &str); 4]) -> AnalysisStep {
        AnalysisStep { title: title.into(), content: content.into(), category, details: details.into_iter().collect() }
    }

    AnalysisResult {
        reasoning: "正在初始化深度神经解析引擎。基于上传的 Gerber 文件压缩包，我将首先提取物理层叠结构，随后通过对 BOM 清单的元数据索引，匹配实时供应链库存与大宗商品波动指数。逻辑权重优先考虑生产良率（DFM）与长期供应稳定性。".into(),
        steps: vec![
            step(
                "设计文件智能解析",
                "解析识别为标准 4层 FR4 刚性板。用户提及的 '沉金 1U' 已映射为 ENIG 1U\" 表面处理工艺。检测到 BGA 区域最小线宽线距为 3.5mil，符合精密制造标准。",
                StepCategory::Design,
                [
                    ("板层结构", "4层 / 1.6mm"),
                    ("最小孔径", "0.2mm"),
                    ("表面工艺", "沉金 (1U\")"),
                    ("最小线宽/距", "3.5/3.5 mil"),
                ],
            ),
            step(
                "制造难度与 DFM 预检",
                "整体复杂度评分为 7.8/10。由于采用了 0.4mm pitch 的 BGA 封装，内层盘中孔工艺为制造瓶颈。建议将部分通孔改为盲孔设计以提升信号完整性，但需权衡 15% 的额外制程成本。",
                StepCategory::Dfm,
                [
                    ("复杂度评分", "7.8 / 10"),
                    ("良率预测", "94.2%"),
                    ("核心风险", "BGA 密集布线冲突"),
                    ("优化建议", "阻焊开窗调整 (+5%)"),
                ],
            ),
            step(
                "动态成本预测",
                "当前 LME 铜价指数上涨 2.3%，导致基材成本波动。建议打样阶段采用单片结算策略。若后续转量产，采用拼板化（Panelization）方案可降低 22% 的单片边料损耗成本。",
                StepCategory::Cost,
                [
                    ("打样预估", "¥850.00 / 5pcs"),
                    ("量产预估", "¥14.25 / 1k+"),
                    ("原材料影响", "铜价上涨 (+2.3%)"),
                    ("最优策略", "多层拼板打样"),
                ],
            ),
            step(
                "供应链风险预警",
                "BOM 中的 U2 (MCU) 识别到处于 EOL（停产）边缘，当前市场平均交期已延长至 24周。已锁定两款 Pin-to-Pin 兼容的国产替代型号，性能指标偏差 < 2%。",
                StepCategory::Risk,
                [
                    ("高风险器件", "STM32F405RGT6"),
                    ("当前状态", "紧缺 (24w+)"),
                    ("替代方案 A", "GD32F405RGT6 (现货)"),
                    ("成本变化", "替代后成本下降 12%"),
                ],
            ),
        ],
    }
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
