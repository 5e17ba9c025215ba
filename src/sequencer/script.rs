//! The offline demo timeline.
//!
//! Plain data: every stage, delay and table cell is a constant. The player
//! interprets it; nothing here branches on content.

use std::time::Duration;

use serde::Serialize;

/// Delay between two typewriter units.
pub const TYPE_INTERVAL: Duration = Duration::from_millis(18);

/// A literal data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Table {
    pub title: &'static str,
    pub headers: &'static [&'static str],
    pub rows: &'static [&'static [&'static str]],
}

/// One timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    /// Remove the welcome view.
    Clear,
    /// Show a labelled spinner for `delay_ms`, then remove it.
    Loader { label: &'static str, delay_ms: u64 },
    /// Reveal text one unit at a time.
    Typewriter { text: &'static str },
    Table { table: Table },
    Pause { delay_ms: u64 },
}

impl Stage {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Loader { .. } => "loader",
            Self::Typewriter { .. } => "typewriter",
            Self::Table { .. } => "table",
            Self::Pause { .. } => "pause",
        }
    }
}

// =============================================================================
// TABLES
// =============================================================================

const STACKUP: Table = Table {
    title: "设计文件解析结果",
    headers: &["参数", "识别值", "制程能力"],
    rows: &[
        &["板层结构", "4层 FR4 / 1.6mm", "标准"],
        &["最小线宽/距", "3.5/3.5 mil", "精密"],
        &["最小孔径", "0.2mm", "标准"],
        &["表面工艺", "沉金 ENIG 1U\"", "标准"],
    ],
};

const DFM_CHECK: Table = Table {
    title: "DFM 预检项",
    headers: &["检查项", "结果", "建议"],
    rows: &[
        &["BGA 0.4mm pitch", "需盘中孔", "树脂塞孔电镀填平"],
        &["阻焊桥", "局部不足", "阻焊开窗调整"],
        &["拼板边料", "利用率 78%", "改 2x3 拼板"],
    ],
};

const SUPPLY: Table = Table {
    title: "关键器件供应状态",
    headers: &["位号", "型号", "库存", "交期"],
    rows: &[
        &["U2", "STM32F405RGT6", "紧缺", "24w+"],
        &["U2 替代", "GD32F405RGT6", "现货", "2w"],
        &["Y1", "ABM8-16.000MHZ", "充足", "4w"],
    ],
};

const QUOTATION: Table = Table {
    title: "最终报价单",
    headers: &["项目", "打样 (5pcs)", "量产 (1k+)"],
    rows: &[
        &["PCB 裸板", "¥850.00", "¥14.25 / pcs"],
        &["SMT 贴装", "¥420.00", "¥6.80 / pcs"],
        &["元器件 (含替代)", "¥1,236.00", "¥38.60 / pcs"],
        &["合计", "¥2,506.00", "¥59.65 / pcs"],
    ],
};

// =============================================================================
// TIMELINE
// =============================================================================

pub const DEMO_SCRIPT: &[Stage] = &[
    Stage::Clear,
    Stage::Loader { label: "正在解析 Gerber 文件结构...", delay_ms: 1200 },
    Stage::Typewriter {
        text: "已识别为 **4层 FR4 刚性板**。用户提及的 '沉金 1U' 已映射为 **ENIG 1U\"** 表面处理工艺，BGA 区域最小线宽线距为 3.5mil。",
    },
    Stage::Table { table: STACKUP },
    Stage::Pause { delay_ms: 600 },
    Stage::Loader { label: "DFM 可制造性分析中...", delay_ms: 1500 },
    Stage::Typewriter {
        text: "整体复杂度评分 **7.8 / 10**，良率预测 94.2%。0.4mm pitch BGA 的盘中孔工艺为主要制造瓶颈。",
    },
    Stage::Table { table: DFM_CHECK },
    Stage::Pause { delay_ms: 600 },
    Stage::Loader { label: "正在匹配全球供应链库存...", delay_ms: 1800 },
    Stage::Typewriter {
        text: "U2 (MCU) 处于 EOL 边缘，当前交期 **24周以上**。已锁定 Pin-to-Pin 兼容替代型号 **GD32F405RGT6**，现货可供。",
    },
    Stage::Table { table: SUPPLY },
    Stage::Pause { delay_ms: 600 },
    Stage::Loader { label: "结合 LME 铜价指数生成报价...", delay_ms: 1500 },
    Stage::Typewriter { text: "铜价指数上涨 2.3%，已计入基材成本。报价如下：" },
    Stage::Table { table: QUOTATION },
    Stage::Typewriter {
        text: "建议打样阶段采用 **单片结算**，转量产后改用拼板方案可再降低约 **22%** 边料成本。如需调整工艺参数，请直接回复。",
    },
];

/// Total playback time at realtime pacing.
#[must_use]
pub fn realtime_duration(script: &[Stage], type_interval: Duration) -> Duration {
    script
        .iter()
        .map(|stage| match stage {
            Stage::Loader { delay_ms, .. } | Stage::Pause { delay_ms } => Duration::from_millis(*delay_ms),
            Stage::Typewriter { text } => {
                super::typewriter::units(text).iter().map(|unit| type_interval * unit.ticks()).sum()
            }
            Stage::Clear | Stage::Table { .. } => Duration::ZERO,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_starts_with_clear_and_ends_with_remarks() {
        assert_eq!(DEMO_SCRIPT[0], Stage::Clear);
        assert!(matches!(DEMO_SCRIPT.last(), Some(Stage::Typewriter { .. })));
    }

    #[test]
    fn final_table_is_the_quotation() {
        let tables: Vec<&Table> = DEMO_SCRIPT
            .iter()
            .filter_map(|s| match s {
                Stage::Table { table } => Some(table),
                _ => None,
            })
            .collect();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[3].title, "最终报价单");
    }

    #[test]
    fn table_rows_match_header_width() {
        for stage in DEMO_SCRIPT {
            if let Stage::Table { table } = stage {
                assert!(table.rows.iter().all(|r| r.len() == table.headers.len()), "{}", table.title);
            }
        }
    }

    #[test]
    fn every_loader_is_followed_by_text() {
        for pair in DEMO_SCRIPT.windows(2) {
            if let Stage::Loader { .. } = pair[0] {
                assert_eq!(pair[1].kind(), "typewriter");
            }
        }
    }

    #[test]
    fn stage_serializes_with_kind_tag() {
        let json = serde_json::to_value(DEMO_SCRIPT[1]).unwrap();
        assert_eq!(json["kind"], "loader");
        assert_eq!(json["delay_ms"], 1200);
    }

    #[test]
    fn duration_counts_delays_and_raw_characters() {
        let script = [
            Stage::Loader { label: "x", delay_ms: 100 },
            Stage::Typewriter { text: "ab**cd**" },
            Stage::Pause { delay_ms: 50 },
        ];
        assert_eq!(realtime_duration(&script, Duration::from_millis(10)), Duration::from_millis(220));
    }
}
