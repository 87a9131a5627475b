// ==========================================
// 合同履约与SLA绩效引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少批处理并发写入时的偶发 busy 错误
// - 提供考核库 schema 的一次性初始化入口
// ==========================================

use rusqlite::{Connection, OptionalExtension};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化考核库 schema（幂等）
///
/// # 表清单
/// - contract / product_sla: 合同配置存储（本引擎只读）
/// - purchase_order / order_line_item: 订单台账（本引擎只读）
/// - performance_metric: 绩效指标（本引擎唯一写出物）
/// - config_kv: 引擎调参配置
/// - schema_version: 版本标记
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS contract (
            contract_id TEXT PRIMARY KEY,
            supplier_id TEXT NOT NULL,
            status TEXT NOT NULL,
            valid_from TEXT NOT NULL,
            valid_until TEXT NOT NULL,
            delivery_sla_days INTEGER NOT NULL,
            quality_tolerance_percent REAL NOT NULL,
            delivery_tolerance_percent REAL NOT NULL,
            quantity_accuracy_threshold REAL NOT NULL,
            fulfillment_target_percent REAL,
            penalty_rate_percent REAL NOT NULL,
            bonus_rate_percent REAL NOT NULL,
            currency TEXT NOT NULL,
            volume_commitment REAL NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contract_status_validity
            ON contract (status, valid_from, valid_until);

        CREATE TABLE IF NOT EXISTS product_sla (
            product_sla_id TEXT PRIMARY KEY,
            contract_id TEXT NOT NULL REFERENCES contract(contract_id),
            product_id TEXT NOT NULL,
            delivery_sla_days INTEGER,
            delivery_tolerance_percent REAL,
            quality_tolerance_percent REAL,
            quantity_accuracy_threshold REAL,
            penalty_rate_percent REAL,
            bonus_rate_percent REAL,
            peak_season TEXT,
            off_peak_season TEXT,
            special_requirements TEXT NOT NULL DEFAULT '[]',
            escalation_notice_days INTEGER NOT NULL DEFAULT 7,
            measurement_period_days INTEGER NOT NULL DEFAULT 30,
            grace_period_days INTEGER NOT NULL DEFAULT 0,
            effective_from TEXT NOT NULL,
            effective_until TEXT NOT NULL,
            suspended INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_product_sla_contract
            ON product_sla (contract_id, product_id);

        CREATE TABLE IF NOT EXISTS purchase_order (
            order_id TEXT PRIMARY KEY,
            supplier_id TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            promised_delivery_at TEXT,
            actual_delivery_at TEXT,
            total_value REAL NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_purchase_order_supplier_created
            ON purchase_order (supplier_id, created_at);

        CREATE TABLE IF NOT EXISTS order_line_item (
            line_id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES purchase_order(order_id),
            product_id TEXT NOT NULL,
            ordered_qty REAL NOT NULL,
            delivered_qty REAL,
            quality_defect INTEGER NOT NULL DEFAULT 0,
            defect_note TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_order_line_item_order
            ON order_line_item (order_id);

        CREATE TABLE IF NOT EXISTS performance_metric (
            metric_id TEXT NOT NULL,
            contract_id TEXT NOT NULL,
            product_id TEXT NOT NULL DEFAULT '',
            source_order_id TEXT,
            metric_type TEXT NOT NULL,
            period TEXT NOT NULL,
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            target_value REAL NOT NULL,
            actual_value REAL NOT NULL,
            variance REAL NOT NULL,
            variance_percent REAL NOT NULL,
            status TEXT NOT NULL,
            performance_score REAL NOT NULL,
            sample_size INTEGER NOT NULL,
            total_events INTEGER NOT NULL,
            successful_events INTEGER NOT NULL,
            failed_events INTEGER NOT NULL,
            penalties_applied REAL NOT NULL DEFAULT 0,
            bonuses_earned REAL NOT NULL DEFAULT 0,
            net_financial_impact REAL NOT NULL DEFAULT 0,
            trend_direction TEXT NOT NULL DEFAULT 'STABLE',
            previous_period_value REAL,
            rolling_avg_3 REAL NOT NULL DEFAULT 0,
            rolling_avg_12 REAL NOT NULL DEFAULT 0,
            escalation_level INTEGER NOT NULL DEFAULT 0,
            escalation_triggered INTEGER NOT NULL DEFAULT 0,
            escalation_date TEXT,
            requires_action INTEGER NOT NULL DEFAULT 0,
            action_deadline TEXT,
            calculation_method TEXT NOT NULL,
            data_sources TEXT NOT NULL DEFAULT '[]',
            calculated_at TEXT NOT NULL,
            calculated_by TEXT NOT NULL,
            low_confidence INTEGER NOT NULL DEFAULT 0,
            reviewed INTEGER NOT NULL DEFAULT 0,
            reviewed_by TEXT,
            review_notes TEXT,
            PRIMARY KEY (contract_id, product_id, metric_type, period_start, period_end)
        );
        CREATE INDEX IF NOT EXISTS idx_performance_metric_period
            ON performance_metric (period_start, period_end);
        CREATE INDEX IF NOT EXISTS idx_performance_metric_escalation
            ON performance_metric (escalation_triggered, requires_action);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )?;
    Ok(())
}
