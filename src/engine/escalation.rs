// ==========================================
// 合同履约与SLA绩效引擎 - 升级引擎
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 8.3 升级规则
// ==========================================
// 职责: 违约升级判定与触发
// 红线: 升级是单向迁移,重算不得静默清除已触发标记
// 状态机: UNCALCULATED -> CALCULATED -> (ESCALATED) -> REVIEWED(外部)
// ==========================================

use crate::domain::metric::PerformanceMetric;
use crate::domain::types::Severity;
use chrono::{Duration, NaiveDateTime};

// ==========================================
// 升级等级规则表
// ==========================================

/// 严重度到升级等级的映射
///
/// # 规则
/// - HIGH -> 3, CRITICAL -> 4
/// - 其余传入值走防御性默认 2 (正常流程不会走到)
fn escalation_level_for(severity: Severity) -> i32 {
    match severity {
        Severity::High => 3,
        Severity::Critical => 4,
        _ => 2,
    }
}

/// 升级等级对应的处理时限 (天)
fn action_deadline_days(level: i32) -> i64 {
    match level {
        4 => 3,
        3 => 7,
        _ => 14,
    }
}

// ==========================================
// EscalationEngine - 升级引擎
// ==========================================
pub struct EscalationEngine {
    // 无状态引擎
}

impl EscalationEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 判定是否需要触发升级
    ///
    /// # 规则
    /// - 严重度达到 HIGH/CRITICAL
    /// - 且该指标实例尚未触发过升级
    pub fn should_escalate(&self, severity: Severity, already_triggered: bool) -> bool {
        severity >= Severity::High && !already_triggered
    }

    /// 触发升级 (就地修改指标)
    ///
    /// # 效果
    /// - escalation_triggered = true, requires_action = true
    /// - escalation_level 按严重度查表
    /// - action_deadline = 触发日 + 等级时限
    ///
    /// # 参数
    /// - `notes`: 触发备注,仅记日志,不写入复核字段
    pub fn trigger_escalation(
        &self,
        metric: &mut PerformanceMetric,
        severity: Severity,
        now: NaiveDateTime,
        notes: Option<&str>,
    ) {
        let level = escalation_level_for(severity);
        metric.escalation_triggered = true;
        metric.escalation_level = level;
        metric.escalation_date = Some(now);
        metric.requires_action = true;
        metric.action_deadline = Some(now.date() + Duration::days(action_deadline_days(level)));

        tracing::info!(
            contract_id = %metric.contract_id,
            product_id = ?metric.product_id,
            metric_type = %metric.metric_type,
            level,
            notes = notes.unwrap_or(""),
            "触发违约升级"
        );
    }
}

impl Default for EscalationEngine {
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
    use crate::domain::types::{
        MeasurementPeriod, MetricType, PerformanceStatus, TrendDirection,
    };
    use chrono::NaiveDate;

    fn metric() -> PerformanceMetric {
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
            actual_value: 75.0,
            variance: -20.0,
            variance_percent: -21.05,
            status: PerformanceStatus::Critical,
            performance_score: 78.9,
            sample_size: 20,
            total_events: 20,
            successful_events: 15,
            failed_events: 5,
            penalties_applied: 0.0,
            bonuses_earned: 0.0,
            net_financial_impact: 0.0,
            trend_direction: TrendDirection::Stable,
            previous_period_value: None,
            rolling_avg_3: 75.0,
            rolling_avg_12: 75.0,
            escalation_level: 0,
            escalation_triggered: false,
            escalation_date: None,
            requires_action: false,
            action_deadline: None,
            calculation_method: "WINDOW_RATIO".to_string(),
            data_sources: vec![],
            calculated_at: NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(2, 0, 0)
                .unwrap(),
            calculated_by: "tester".to_string(),
            low_confidence: false,
            reviewed: false,
            reviewed_by: None,
            review_notes: None,
        }
    }

    #[test]
    fn test_should_escalate_gating() {
        let engine = EscalationEngine::new();
        assert!(engine.should_escalate(Severity::High, false));
        assert!(engine.should_escalate(Severity::Critical, false));
        assert!(!engine.should_escalate(Severity::Medium, false));
        assert!(!engine.should_escalate(Severity::Low, false));
        // 已触发的不重复升级
        assert!(!engine.should_escalate(Severity::Critical, true));
    }

    #[test]
    fn test_trigger_sets_level_four_for_critical() {
        let engine = EscalationEngine::new();
        let mut m = metric();
        let now = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap();

        engine.trigger_escalation(&mut m, Severity::Critical, now, None);
        assert!(m.escalation_triggered);
        assert_eq!(m.escalation_level, 4);
        assert!(m.requires_action);
        assert_eq!(m.escalation_date, Some(now));
        // 4级时限3天
        assert_eq!(
            m.action_deadline,
            Some(NaiveDate::from_ymd_opt(2025, 4, 4).unwrap())
        );
    }

    #[test]
    fn test_trigger_sets_level_three_for_high() {
        let engine = EscalationEngine::new();
        let mut m = metric();
        let now = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap();

        engine.trigger_escalation(&mut m, Severity::High, now, Some("交付连续恶化"));
        assert_eq!(m.escalation_level, 3);
        // 3级时限7天
        assert_eq!(
            m.action_deadline,
            Some(NaiveDate::from_ymd_opt(2025, 4, 8).unwrap())
        );
    }

    #[test]
    fn test_defensive_default_level() {
        assert_eq!(escalation_level_for(Severity::Medium), 2);
        assert_eq!(action_deadline_days(2), 14);
    }
}
