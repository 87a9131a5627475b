// ==========================================
// 合同履约与SLA绩效引擎 - 财务影响计算器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 6. Financial Impact
// ==========================================
// 职责: 纯计算,同输入必得同输出,不触碰任何余额
// 红线: 净影响照实落库,不得向零收口 (周期可以净为负)
// ==========================================

use crate::domain::types::MetricType;
use crate::engine::calculators::RawSample;
use crate::engine::sla_resolver::EffectiveTargets;
use serde::{Deserialize, Serialize};

// ==========================================
// FinancialImpact - 财务影响
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialImpact {
    pub penalties: f64,  // 罚金
    pub bonuses: f64,    // 奖励
    pub net_impact: f64, // 净影响 = 奖励 - 罚金
}

// ==========================================
// FinancialImpactCalculator - 财务影响计算器
// ==========================================
pub struct FinancialImpactCalculator {
    // 无状态引擎
}

impl FinancialImpactCalculator {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算单指标的财务影响
    ///
    /// # 规则
    /// - 罚金 = 未达标事件数 × 平均订单金额 × 罚金费率/100
    /// - 奖励触发条件 (二选一):
    ///   a) 零失败 (successful == total): 合格事件全额计奖
    ///   b) 交付指标且提前交付占比 >= early_bonus_fraction: 按提前事件计奖
    /// - 净影响 = 奖励 - 罚金,允许为负
    ///
    /// # 参数
    /// - `average_order_value`: 窗口内订单均值 (计算方提供)
    /// - `early_bonus_fraction`: 提前交付奖励的最低占比门槛
    pub fn compute_impact(
        &self,
        metric_type: MetricType,
        raw: &RawSample,
        targets: &EffectiveTargets,
        average_order_value: f64,
        early_bonus_fraction: f64,
    ) -> FinancialImpact {
        let penalties =
            raw.failed_events as f64 * average_order_value * targets.penalty_rate_percent / 100.0;

        let qualifying_events = if raw.total_events > 0 && raw.failed_events == 0 {
            // 零失败: 全样本计奖
            raw.successful_events
        } else if metric_type == MetricType::DeliveryPerformance
            && raw.total_events > 0
            && raw.early_events as f64 / raw.total_events as f64 >= early_bonus_fraction
        {
            // 提前交付占比达到门槛: 按提前事件计奖
            raw.early_events
        } else {
            0
        };

        let bonuses =
            qualifying_events as f64 * average_order_value * targets.bonus_rate_percent / 100.0;

        FinancialImpact {
            penalties,
            bonuses,
            net_impact: bonuses - penalties,
        }
    }
}

impl Default for FinancialImpactCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> EffectiveTargets {
        EffectiveTargets {
            delivery_days: 7,
            quality_tolerance_percent: 2.0,
            delivery_tolerance_percent: 5.0,
            quantity_accuracy_threshold: 98.0,
            penalty_rate_percent: 2.0,
            bonus_rate_percent: 1.0,
        }
    }

    fn raw(total: i64, failed: i64, early: i64) -> RawSample {
        RawSample {
            actual_value: 0.0,
            target_value: 95.0,
            sample_size: total,
            total_events: total,
            successful_events: total - failed,
            failed_events: failed,
            early_events: early,
        }
    }

    #[test]
    fn test_penalties_scale_with_failures() {
        let calc = FinancialImpactCalculator::new();
        let impact = calc.compute_impact(
            MetricType::QualityPerformance,
            &raw(20, 3, 0),
            &targets(),
            1000.0,
            0.25,
        );
        // 3 × 1000 × 2% = 60
        assert_eq!(impact.penalties, 60.0);
        assert_eq!(impact.bonuses, 0.0);
        assert_eq!(impact.net_impact, -60.0);
    }

    #[test]
    fn test_bonus_on_zero_failures() {
        let calc = FinancialImpactCalculator::new();
        let impact = calc.compute_impact(
            MetricType::QualityPerformance,
            &raw(20, 0, 0),
            &targets(),
            1000.0,
            0.25,
        );
        // 20 × 1000 × 1% = 200
        assert_eq!(impact.penalties, 0.0);
        assert_eq!(impact.bonuses, 200.0);
        assert_eq!(impact.net_impact, 200.0);
    }

    #[test]
    fn test_delivery_early_bonus_with_failures_present() {
        let calc = FinancialImpactCalculator::new();
        // 1 失败但 10/20 提前 >= 25%: 按提前事件计奖
        let impact = calc.compute_impact(
            MetricType::DeliveryPerformance,
            &raw(20, 1, 10),
            &targets(),
            1000.0,
            0.25,
        );
        assert_eq!(impact.penalties, 20.0); // 1 × 1000 × 2%
        assert_eq!(impact.bonuses, 100.0); // 10 × 1000 × 1%
        assert_eq!(impact.net_impact, 80.0);
    }

    #[test]
    fn test_early_bonus_only_for_delivery_metric() {
        let calc = FinancialImpactCalculator::new();
        // 非交付指标即使 early_events 占比够也不触发
        let impact = calc.compute_impact(
            MetricType::QualityPerformance,
            &raw(20, 1, 10),
            &targets(),
            1000.0,
            0.25,
        );
        assert_eq!(impact.bonuses, 0.0);
    }

    #[test]
    fn test_early_fraction_below_threshold_no_bonus() {
        let calc = FinancialImpactCalculator::new();
        // 4/20 = 20% < 25%
        let impact = calc.compute_impact(
            MetricType::DeliveryPerformance,
            &raw(20, 1, 4),
            &targets(),
            1000.0,
            0.25,
        );
        assert_eq!(impact.bonuses, 0.0);
    }

    #[test]
    fn test_net_impact_not_clamped() {
        let calc = FinancialImpactCalculator::new();
        let impact = calc.compute_impact(
            MetricType::DeliveryPerformance,
            &raw(20, 15, 0),
            &targets(),
            1000.0,
            0.25,
        );
        assert!(impact.net_impact < 0.0);
    }
}
