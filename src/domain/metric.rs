// ==========================================
// 合同履约与SLA绩效引擎 - 绩效指标领域模型
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART E 指标落库
// 依据: SLA_Engine_Specs_v0.2.md - 7. 指标主键与幂等
// ==========================================
// 用途: 引擎唯一写出物,报表/驾驶舱只读数据源
// 不变式: 每次计算对 (合同,产品,指标类型,周期窗口) 恰好 upsert 一行
// ==========================================

use crate::domain::types::{
    MeasurementPeriod, MetricType, PerformanceStatus, TrendDirection,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// MetricKey - 指标幂等主键
// ==========================================
// 红线: 重算同一窗口必须覆盖同键旧值,不得追加
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    pub contract_id: String,           // 合同ID
    pub product_id: Option<String>,    // 产品ID (合同级指标为 None)
    pub metric_type: MetricType,       // 指标类型
    pub period_start: NaiveDate,       // 周期起(含)
    pub period_end: NaiveDate,         // 周期止(不含)
}

// ==========================================
// PerformanceMetric - 绩效指标
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub metric_id: String,             // 指标ID
    pub contract_id: String,           // 合同ID
    pub product_id: Option<String>,    // 产品ID (合同级为 None)
    pub source_order_id: Option<String>, // 溯源订单ID (聚合指标为 None)
    pub metric_type: MetricType,       // 指标类型
    pub period: MeasurementPeriod,     // 测量周期粒度
    pub period_start: NaiveDate,       // 周期起(含)
    pub period_end: NaiveDate,         // 周期止(不含)

    // ===== 目标与实绩 =====
    pub target_value: f64,             // 目标值
    pub actual_value: f64,             // 实际值
    pub variance: f64,                 // 偏差 = actual - target
    pub variance_percent: f64,         // 偏差率(%)
    pub status: PerformanceStatus,     // 状态档位
    pub performance_score: f64,        // 归一化得分 (0-100)

    // ===== 样本统计 =====
    pub sample_size: i64,              // 样本量
    pub total_events: i64,             // 事件总数
    pub successful_events: i64,        // 达标事件数
    pub failed_events: i64,            // 未达标事件数

    // ===== 财务影响 =====
    pub penalties_applied: f64,        // 罚金
    pub bonuses_earned: f64,           // 奖励
    pub net_financial_impact: f64,     // 净影响 = 奖励 - 罚金 (允许为负)

    // ===== 趋势 =====
    pub trend_direction: TrendDirection,     // 趋势方向
    pub previous_period_value: Option<f64>,  // 上期实际值
    pub rolling_avg_3: f64,                  // 3周期滚动均值
    pub rolling_avg_12: f64,                 // 12周期滚动均值

    // ===== 升级 =====
    pub escalation_level: i32,              // 升级等级 (0-4)
    pub escalation_triggered: bool,         // 升级已触发 (单向,重算不得清除)
    pub escalation_date: Option<NaiveDateTime>, // 触发时间
    pub requires_action: bool,              // 待处理标记
    pub action_deadline: Option<NaiveDate>, // 处理截止日

    // ===== 溯源 =====
    pub calculation_method: String,    // 计算方法标签
    pub data_sources: Vec<String>,     // 数据来源清单
    pub calculated_at: NaiveDateTime,  // 计算时间
    pub calculated_by: String,         // 计算发起方 (批处理调用方显式传入)
    pub low_confidence: bool,          // 低置信标记 (样本量不足)

    // ===== 人工复核 (外部复核流程写入,重算必须保留) =====
    pub reviewed: bool,                // 已复核
    pub reviewed_by: Option<String>,   // 复核人
    pub review_notes: Option<String>,  // 复核备注
}

impl PerformanceMetric {
    /// 幂等主键
    pub fn key(&self) -> MetricKey {
        MetricKey {
            contract_id: self.contract_id.clone(),
            product_id: self.product_id.clone(),
            metric_type: self.metric_type,
            period_start: self.period_start,
            period_end: self.period_end,
        }
    }

    /// 是否在SLA允许范围内
    pub fn is_within_sla(&self) -> bool {
        self.status.is_within_sla()
    }

    /// 是否存在待处理的升级
    pub fn is_escalation_pending(&self) -> bool {
        self.escalation_triggered && self.requires_action
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_metric() -> PerformanceMetric {
        PerformanceMetric {
            metric_id: "m1".to_string(),
            contract_id: "C001".to_string(),
            product_id: None,
            source_order_id: None,
            metric_type: MetricType::DeliveryPerformance,
            period: MeasurementPeriod::Monthly,
            period_start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            target_value: 95.0,
            actual_value: 95.0,
            variance: 0.0,
            variance_percent: 0.0,
            status: PerformanceStatus::Good,
            performance_score: 100.0,
            sample_size: 20,
            total_events: 20,
            successful_events: 19,
            failed_events: 1,
            penalties_applied: 0.0,
            bonuses_earned: 0.0,
            net_financial_impact: 0.0,
            trend_direction: TrendDirection::Stable,
            previous_period_value: None,
            rolling_avg_3: 95.0,
            rolling_avg_12: 95.0,
            escalation_level: 0,
            escalation_triggered: false,
            escalation_date: None,
            requires_action: false,
            action_deadline: None,
            calculation_method: "WINDOW_RATIO".to_string(),
            data_sources: vec!["order_ledger".to_string()],
            calculated_at: Utc::now().naive_utc(),
            calculated_by: "tester".to_string(),
            low_confidence: false,
            reviewed: false,
            reviewed_by: None,
            review_notes: None,
        }
    }

    #[test]
    fn test_metric_key_contract_level() {
        let m = sample_metric();
        let key = m.key();
        assert_eq!(key.contract_id, "C001");
        assert_eq!(key.product_id, None);
        assert_eq!(key.metric_type, MetricType::DeliveryPerformance);
    }

    #[test]
    fn test_escalation_pending_requires_both_flags() {
        let mut m = sample_metric();
        assert!(!m.is_escalation_pending());
        m.escalation_triggered = true;
        m.requires_action = false;
        assert!(!m.is_escalation_pending());
        m.requires_action = true;
        assert!(m.is_escalation_pending());
    }
}
