// ==========================================
// 合同履约与SLA绩效引擎 - 批处理主入口
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md
// 技术栈: Rust + SQLite + Tokio
// 系统定位: 供应商考核批处理引擎
// ==========================================
// 用法:
//   contract-sla-engine <db_path> <start YYYY-MM-DD> <end YYYY-MM-DD> [period] [operator]
//
// 说明: period 取 DAILY/WEEKLY/MONTHLY/QUARTERLY/ANNUAL,默认 MONTHLY;
//       operator 为考核发起方标识,默认当前进程用户,落库到 calculated_by
// ==========================================

use chrono::NaiveDate;
use contract_sla_engine::api::DashboardApi;
use contract_sla_engine::config::{ConfigManager, EngineConfigProvider};
use contract_sla_engine::db::{
    init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION,
};
use contract_sla_engine::domain::types::MeasurementPeriod;
use contract_sla_engine::engine::SlaAggregationEngine;
use contract_sla_engine::repository::{ContractRepository, MetricRepository, OrderRepository};
use std::sync::{Arc, Mutex};

/// 默认数据库路径 (用户数据目录下)
fn get_default_db_path() -> String {
    dirs::data_dir()
        .map(|dir| {
            dir.join("contract_sla_engine")
                .join("sla_metrics.db")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "sla_metrics.db".to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志系统
    contract_sla_engine::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 供应商考核批处理", contract_sla_engine::APP_NAME);
    tracing::info!("系统版本: {}", contract_sla_engine::VERSION);
    tracing::info!("==================================================");

    // 参数解析
    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let start = args
        .next()
        .ok_or("缺少参数: start (YYYY-MM-DD)")
        .and_then(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| "start 日期格式错误")
        })?;
    let end = args
        .next()
        .ok_or("缺少参数: end (YYYY-MM-DD)")
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| "end 日期格式错误"))?;
    let period = args
        .next()
        .map(|s| MeasurementPeriod::from_str(&s))
        .unwrap_or(MeasurementPeriod::Monthly);
    let operator = args
        .next()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| {
            std::env::var("USER").unwrap_or_else(|_| "batch-operator".to_string())
        });

    tracing::info!("使用数据库: {}", db_path);

    // 连接与 schema
    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path)?));
    {
        let guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        init_schema(&guard)?;
        if let Some(version) = read_schema_version(&guard)? {
            if version != CURRENT_SCHEMA_VERSION {
                tracing::warn!(
                    found = version,
                    expected = CURRENT_SCHEMA_VERSION,
                    "schema_version 与当前代码不一致,请确认数据库是否为旧版"
                );
            }
        }
    }

    // 仓储与引擎装配 (共享同一连接)
    let contract_repo = Arc::new(ContractRepository::from_connection(Arc::clone(&conn)));
    let order_repo = Arc::new(OrderRepository::from_connection(Arc::clone(&conn)));
    let metric_repo = Arc::new(MetricRepository::from_connection(Arc::clone(&conn)));
    let config_manager = ConfigManager::from_connection(Arc::clone(&conn))?;
    let engine_config = config_manager
        .load_engine_config()
        .await
        .map_err(|e| format!("配置装载失败: {}", e))?;

    let engine = SlaAggregationEngine::new(
        Arc::clone(&contract_repo),
        Arc::clone(&order_repo),
        Arc::clone(&metric_repo),
    );

    // 批处理考核
    let summary = engine
        .calculate_all(start, end, period, &operator, &engine_config)
        .await?;

    println!("run_id={}", summary.run_id);
    println!(
        "contracts: processed={} failed={}",
        summary.contracts_processed, summary.contracts_failed
    );
    println!(
        "metrics_written={} escalations_triggered={} elapsed_ms={}",
        summary.metrics_written, summary.escalations_triggered, summary.elapsed_ms
    );

    // 驾驶舱快照
    let dashboard = DashboardApi::new(contract_repo, metric_repo);
    let metrics = dashboard.dashboard_metrics()?;
    println!(
        "dashboard: active={} at_risk={} excellent={} pending_escalations={}",
        metrics.active_contracts,
        metrics.at_risk_contracts,
        metrics.excellent_contracts,
        metrics.pending_escalations
    );
    println!(
        "dashboard: penalties_this_month={:.2} bonuses_this_month={:.2} expiring_30d={}",
        metrics.penalties_this_month, metrics.bonuses_this_month, metrics.expiring_within_30_days
    );

    Ok(())
}
