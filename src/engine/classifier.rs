// ==========================================
// 合同履约与SLA绩效引擎 - 分级与评分器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 5. Classifier & Scorer
// 红线: 档位边界用显式阈值表表达,禁止内联 if 链
// 红线: 方向语义 (越高越好/越低越好) 必须贯穿比较与评分
// ==========================================

use crate::domain::types::{MetricDirection, MetricType, PerformanceStatus, Severity};
use crate::engine::calculators::RawSample;
use serde::{Deserialize, Serialize};

// ==========================================
// Classification - 分级结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub variance: f64,               // 偏差 = actual - target
    pub variance_percent: f64,       // 偏差率(%)
    pub status: PerformanceStatus,   // 状态档位
    pub performance_score: f64,      // 归一化得分 (0-100)
    pub severity: Severity,          // 严重度
    pub is_within_sla: bool,         // 是否在SLA范围内
}

// ==========================================
// 阈值表
// ==========================================
// 有利偏差 (方向归一后 delta = 有利方向上的超出量):
// delta >= excellent_margin -> EXCELLENT
// delta >= 0   -> GOOD
// delta >= -5  -> WARNING
// delta >= -15 -> BREACH
// 否则          -> CRITICAL

/// 状态档位阈值带 (降序扫描,首个命中生效)
#[derive(Debug, Clone, Copy)]
struct StatusBand {
    min_delta: f64,
    status: PerformanceStatus,
}

/// 档位表 (EXCELLENT 档的下界随指标类型浮动)
fn status_bands(excellent_margin: f64) -> [StatusBand; 4] {
    [
        StatusBand {
            min_delta: excellent_margin,
            status: PerformanceStatus::Excellent,
        },
        StatusBand {
            min_delta: 0.0,
            status: PerformanceStatus::Good,
        },
        StatusBand {
            min_delta: -5.0,
            status: PerformanceStatus::Warning,
        },
        StatusBand {
            min_delta: -15.0,
            status: PerformanceStatus::Breach,
        },
    ]
}

/// 严重度阈值带 (按 |偏差率| 升序扫描,首个命中生效)
#[derive(Debug, Clone, Copy)]
struct SeverityBand {
    max_abs_variance_percent: f64,
    severity: Severity,
}

const SEVERITY_BANDS: [SeverityBand; 2] = [
    SeverityBand {
        max_abs_variance_percent: 10.0,
        severity: Severity::Medium,
    },
    SeverityBand {
        max_abs_variance_percent: 25.0,
        severity: Severity::High,
    },
];

// ==========================================
// Classifier - 分级与评分器
// ==========================================
pub struct Classifier {
    // 无状态引擎
}

impl Classifier {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 对原始样本分级评分
    ///
    /// # 规则
    /// - variance = actual - target (不随方向反转,落库口径固定)
    /// - 档位判定使用方向归一后的有利偏差
    /// - 得分: 目标>0 时 clamp(actual/target*100, 0, 100);
    ///   越低越好的指标取倒数比值,实际值为0记满分
    /// - 严重度: SLA内恒为 LOW; CRITICAL 档位直接记 CRITICAL;
    ///   其余按 |偏差率| 查表
    pub fn classify(&self, metric_type: MetricType, raw: &RawSample) -> Classification {
        let variance = raw.actual_value - raw.target_value;
        let variance_percent = if raw.target_value == 0.0 {
            0.0
        } else {
            variance / raw.target_value * 100.0
        };

        let direction = metric_type.direction();
        // 方向归一: delta > 0 表示优于目标
        let favorable_delta = match direction {
            MetricDirection::HigherIsBetter => variance,
            MetricDirection::LowerIsBetter => -variance,
        };

        let status = status_bands(metric_type.excellent_margin())
            .iter()
            .find(|band| favorable_delta >= band.min_delta)
            .map(|band| band.status)
            .unwrap_or(PerformanceStatus::Critical);

        let performance_score = match direction {
            MetricDirection::HigherIsBetter => {
                if raw.target_value > 0.0 {
                    (raw.actual_value / raw.target_value * 100.0).clamp(0.0, 100.0)
                } else {
                    100.0
                }
            }
            MetricDirection::LowerIsBetter => {
                if raw.actual_value > 0.0 {
                    (raw.target_value / raw.actual_value * 100.0).clamp(0.0, 100.0)
                } else {
                    100.0
                }
            }
        };

        let is_within_sla = status.is_within_sla();
        let severity = if is_within_sla {
            Severity::Low
        } else if status == PerformanceStatus::Critical {
            Severity::Critical
        } else {
            SEVERITY_BANDS
                .iter()
                .find(|band| variance_percent.abs() <= band.max_abs_variance_percent)
                .map(|band| band.severity)
                .unwrap_or(Severity::Critical)
        };

        Classification {
            variance,
            variance_percent,
            status,
            performance_score,
            severity,
            is_within_sla,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
