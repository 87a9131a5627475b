// ==========================================
// MetricRepository 仓储集成测试
// ==========================================
// 测试目标: 指标 upsert 的合并语义与查询口径
// 覆盖范围: 同键覆盖 / 复核字段保留 / 升级单向合并 / 历史查询排序
// ==========================================


use contract_sla_engine::domain::metric::{MetricKey, PerformanceMetric};
use contract_sla_engine::domain::types::{
    MeasurementPeriod, MetricType, PerformanceStatus, TrendDirection,
};
use contract_sla_engine::repository::MetricRepository;
use test_helpers::{create_test_db, date, open_test_connection};

fn repo() -> (tempfile::NamedTempFile, MetricRepository) {
    let (temp_file, db_path) = create_test_db().expect("创建测试库失败");
    let conn = open_test_connection(&db_path).expect("打开测试库失败");
    (temp_file, MetricRepository::from_connection(conn))
}

fn metric(period_start: &str, period_end: &str, actual: f64) -> PerformanceMetric {
    PerformanceMetric {
        metric_id: format!("m-{}", period_start),
        contract_id: "C001".to_string(),
        product_id: None,
        source_order_id: None,
        metric_type: MetricType::DeliveryPerformance,
        period: MeasurementPeriod::Monthly,
        period_start: date(period_start),
        period_end: date(period_end),
        target_value: 95.0,
        actual_value: actual,
        variance: actual - 95.0,
        variance_percent: (actual - 95.0) / 95.0 * 100.0,
        status: PerformanceStatus::Good,
        performance_score: 100.0,
        sample_size: 20,
        total_events: 20,
        successful_events: 19,
        failed_events: 1,
        penalties_applied: 10.0,
        bonuses_earned: 5.0,
        net_financial_impact: -5.0,
        trend_direction: TrendDirection::Stable,
        previous_period_value: None,
        rolling_avg_3: actual,
        rolling_avg_12: actual,
        escalation_level: 0,
        escalation_triggered: false,
        escalation_date: None,
        requires_action: false,
        action_deadline: None,
        calculation_method: "ON_TIME_RATIO".to_string(),
        data_sources: vec!["order_ledger".to_string(), "contract_store".to_string()],
        calculated_at: date(period_end).and_hms_opt(2, 0, 0).unwrap(),
        calculated_by: "tester".to_string(),
        low_confidence: false,
        reviewed: false,
        reviewed_by: None,
        review_notes: None,
    }
}

fn march_key() -> MetricKey {
    MetricKey {
        contract_id: "C001".to_string(),
        product_id: None,
        metric_type: MetricType::DeliveryPerformance,
        period_start: date("2025-03-01"),
        period_end: date("2025-04-01"),
    }
}

// ==========================================
// 测试用例 1: 同键 upsert 覆盖而非追加
// ==========================================

#[test]
fn test_upsert_same_key_replaces_row() {
    let (_t, repo) = repo();
    let first = metric("2025-03-01", "2025-04-01", 95.0);
    repo.upsert(&first).unwrap();

    let mut second = metric("2025-03-01", "2025-04-01", 90.0);
    second.metric_id = "different-id".to_string();
    repo.upsert(&second).unwrap();

    let rows = repo
        .find_by_contract_in_range("C001", date("2025-03-01"), date("2025-04-01"))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].actual_value, 90.0);
    // metric_id 保留首次写入值
    assert_eq!(rows[0].metric_id, "m-2025-03-01");
}

// ==========================================
// 测试用例 2: 复核字段跨 upsert 保留
// ==========================================

#[test]
fn test_upsert_preserves_review_annotations() {
    let (_t, repo) = repo();
    repo.upsert(&metric("2025-03-01", "2025-04-01", 95.0)).unwrap();
    repo.annotate_review(&march_key(), "审核员A", Some("人工已确认"))
        .unwrap();

    // 重算写回: 新行不带复核信息
    repo.upsert(&metric("2025-03-01", "2025-04-01", 92.0)).unwrap();

    let row = repo.find_by_key(&march_key()).unwrap().unwrap();
    assert_eq!(row.actual_value, 92.0);
    assert!(row.reviewed);
    assert_eq!(row.reviewed_by.as_deref(), Some("审核员A"));
    assert_eq!(row.review_notes.as_deref(), Some("人工已确认"));
}

// ==========================================
// 测试用例 3: 升级标记单向合并
// ==========================================

#[test]
fn test_upsert_keeps_triggered_escalation() {
    let (_t, repo) = repo();
    let mut escalated = metric("2025-03-01", "2025-04-01", 75.0);
    escalated.escalation_triggered = true;
    escalated.escalation_level = 4;
    escalated.requires_action = true;
    escalated.escalation_date = Some(date("2025-04-01").and_hms_opt(2, 0, 0).unwrap());
    escalated.action_deadline = Some(date("2025-04-04"));
    repo.upsert(&escalated).unwrap();

    // 后续重算不再触发升级
    let preserved = repo
        .upsert(&metric("2025-03-01", "2025-04-01", 98.0))
        .unwrap();
    assert!(preserved); // 清除尝试被忽略

    let row = repo.find_by_key(&march_key()).unwrap().unwrap();
    assert_eq!(row.actual_value, 98.0);
    assert!(row.escalation_triggered);
    assert_eq!(row.escalation_level, 4);
    assert!(row.requires_action);
    assert_eq!(row.action_deadline, Some(date("2025-04-04")));
}

// ==========================================
// 测试用例 4: 历史周期查询口径
// ==========================================

#[test]
fn test_previous_period_and_recent_actuals() {
    let (_t, repo) = repo();
    repo.upsert(&metric("2025-01-01", "2025-02-01", 80.0)).unwrap();
    repo.upsert(&metric("2025-02-01", "2025-03-01", 85.0)).unwrap();
    repo.upsert(&metric("2025-03-01", "2025-04-01", 95.0)).unwrap();

    // 3月的"上一周期"是2月
    let prev = repo.find_previous_period(&march_key()).unwrap().unwrap();
    assert_eq!(prev.actual_value, 85.0);

    // 历史实际值按周期起点降序,且不含本周期
    let recents = repo.find_recent_actuals(&march_key(), 11).unwrap();
    assert_eq!(recents, vec![85.0, 80.0]);

    // 1月没有更早周期
    let jan_key = MetricKey {
        period_start: date("2025-01-01"),
        period_end: date("2025-02-01"),
        ..march_key()
    };
    assert!(repo.find_previous_period(&jan_key).unwrap().is_none());
}

// ==========================================
// 测试用例 5: 待处理升级与财务聚合
// ==========================================

#[test]
fn test_pending_escalations_and_financial_sums() {
    let (_t, repo) = repo();
    let mut escalated = metric("2025-03-01", "2025-04-01", 75.0);
    escalated.escalation_triggered = true;
    escalated.requires_action = true;
    escalated.escalation_level = 3;
    repo.upsert(&escalated).unwrap();

    let mut quality = metric("2025-03-01", "2025-04-01", 99.0);
    quality.metric_type = MetricType::QualityPerformance;
    quality.penalties_applied = 20.0;
    quality.bonuses_earned = 0.0;
    repo.upsert(&quality).unwrap();

    let pending = repo.find_pending_escalations(None).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].escalation_level, 3);

    let (penalties, bonuses) = repo
        .sum_financials_in(date("2025-03-01"), date("2025-04-01"))
        .unwrap();
    assert_eq!(penalties, 30.0); // 10 + 20
    assert_eq!(bonuses, 5.0);

    // 合同过滤
    let scoped = repo.find_pending_escalations(Some("C001")).unwrap();
    assert_eq!(scoped.len(), 1);
    assert!(repo
        .find_pending_escalations(Some("C999"))
        .unwrap()
        .is_empty());
}
