// ==========================================
// 合同履约与SLA绩效引擎 - 指标计算器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 3. Metric Calculators
// ==========================================
// 契约: compute(...) -> Option<RawSample>
// 红线: 窗口内无可考核事件返回 None (不是错误,也不是 0)
// 红线: 所有比值计算先判分母,禁止产生 NaN
// ==========================================

pub mod delivery;
pub mod fulfillment;
pub mod quality;
pub mod quantity;

pub use delivery::DeliveryCalculator;
pub use fulfillment::FulfillmentCalculator;
pub use quality::QualityCalculator;
pub use quantity::QuantityAccuracyCalculator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// MeasurementWindow - 测量窗口 [start, end)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementWindow {
    pub start: NaiveDate, // 起点(含)
    pub end: NaiveDate,   // 终点(不含)
}

impl MeasurementWindow {
    /// 构造窗口 (start 必须早于 end,否则返回 None)
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }
}

// ==========================================
// RawSample - 原始绩效样本
// ==========================================
// 说明: early_events 仅交付计算器填充 (提前超过1天的交付数),
//       其余计算器恒为 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub actual_value: f64,      // 实际值
    pub target_value: f64,      // 目标值
    pub sample_size: i64,       // 样本量
    pub total_events: i64,      // 事件总数
    pub successful_events: i64, // 达标事件数
    pub failed_events: i64,     // 未达标事件数
    pub early_events: i64,      // 提前交付事件数
}

impl RawSample {
    /// 由成功/总数构造比率型样本
    ///
    /// # 前置条件
    /// total > 0 (调用方负责零样本短路)
    pub(crate) fn ratio(successes: i64, total: i64, target_value: f64) -> Self {
        Self {
            actual_value: successes as f64 / total as f64 * 100.0,
            target_value,
            sample_size: total,
            total_events: total,
            successful_events: successes,
            failed_events: total - successes,
            early_events: 0,
        }
    }
}
