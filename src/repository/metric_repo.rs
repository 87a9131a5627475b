// ==========================================
// 合同履约与SLA绩效引擎 - 绩效指标仓储
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 7. 指标主键与幂等
// 红线: Repository 不含业务逻辑
// 红线: upsert 必须保留人工复核字段,升级标记单向不可清除
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::metric::{MetricKey, PerformanceMetric};
use crate::domain::types::{
    MeasurementPeriod, MetricType, PerformanceStatus, TrendDirection,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// MetricRepository - 绩效指标仓储
// ==========================================
/// 绩效指标仓储
/// 职责: performance_metric 表的 upsert 与查询
/// 主键: (contract_id, product_id, metric_type, period_start, period_end)
pub struct MetricRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MetricRepository {
    /// 创建新的 MetricRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 幂等 upsert 单条指标 (事务内完成读-合并-写)
    ///
    /// # 合并规则
    /// - 人工复核字段 (reviewed/reviewed_by/review_notes) 始终保留旧值
    /// - 升级标记单向: 旧值已触发而新值未触发时,保留旧升级字段 (no-op,记 debug 日志)
    /// - metric_id 保留首次写入的ID,保证同键重算不产生新标识
    ///
    /// # 返回
    /// - Ok(true): 本次写入发生了升级标记保留 (清除尝试被忽略)
    pub fn upsert(&self, metric: &PerformanceMetric) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let existing = find_by_key_tx(&tx, &metric.key())?;
        let mut merged = metric.clone();
        let mut escalation_preserved = false;

        if let Some(old) = existing {
            merged.metric_id = old.metric_id;
            // 人工复核字段只属于外部复核流程
            merged.reviewed = old.reviewed;
            merged.reviewed_by = old.reviewed_by;
            merged.review_notes = old.review_notes;

            // 升级单向: 重算不得静默清除已触发的升级
            if old.escalation_triggered && !merged.escalation_triggered {
                merged.escalation_triggered = true;
                merged.escalation_level = old.escalation_level;
                merged.escalation_date = old.escalation_date;
                merged.requires_action = old.requires_action;
                merged.action_deadline = old.action_deadline;
                escalation_preserved = true;
                tracing::debug!(
                    contract_id = %merged.contract_id,
                    metric_type = %merged.metric_type,
                    "忽略对已触发升级的清除尝试"
                );
            }
        }

        tx.execute(
            r#"
            INSERT OR REPLACE INTO performance_metric (
                metric_id, contract_id, product_id, source_order_id,
                metric_type, period, period_start, period_end,
                target_value, actual_value, variance, variance_percent,
                status, performance_score,
                sample_size, total_events, successful_events, failed_events,
                penalties_applied, bonuses_earned, net_financial_impact,
                trend_direction, previous_period_value, rolling_avg_3, rolling_avg_12,
                escalation_level, escalation_triggered, escalation_date,
                requires_action, action_deadline,
                calculation_method, data_sources, calculated_at, calculated_by,
                low_confidence, reviewed, reviewed_by, review_notes
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30,
                ?31, ?32, ?33, ?34, ?35, ?36, ?37, ?38
            )
            "#,
            params![
                merged.metric_id,
                merged.contract_id,
                merged.product_id.clone().unwrap_or_default(),
                merged.source_order_id,
                merged.metric_type.to_db_str(),
                merged.period.to_db_str(),
                merged.period_start.to_string(),
                merged.period_end.to_string(),
                merged.target_value,
                merged.actual_value,
                merged.variance,
                merged.variance_percent,
                merged.status.to_db_str(),
                merged.performance_score,
                merged.sample_size,
                merged.total_events,
                merged.successful_events,
                merged.failed_events,
                merged.penalties_applied,
                merged.bonuses_earned,
                merged.net_financial_impact,
                merged.trend_direction.to_db_str(),
                merged.previous_period_value,
                merged.rolling_avg_3,
                merged.rolling_avg_12,
                merged.escalation_level,
                merged.escalation_triggered,
                merged
                    .escalation_date
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
                merged.requires_action,
                merged.action_deadline.map(|d| d.to_string()),
                merged.calculation_method,
                serde_json::to_string(&merged.data_sources)
                    .unwrap_or_else(|_| "[]".to_string()),
                merged.calculated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                merged.calculated_by,
                merged.low_confidence,
                merged.reviewed,
                merged.reviewed_by,
                merged.review_notes,
            ],
        )?;

        tx.commit()?;
        Ok(escalation_preserved)
    }

    /// 带重试的 upsert (单指标粒度)
    ///
    /// # 说明
    /// 持久化失败按单条重试,不影响同合同其余已算出的指标
    pub fn upsert_with_retry(
        &self,
        metric: &PerformanceMetric,
        attempts: u32,
    ) -> RepositoryResult<bool> {
        let mut last_err = None;
        for attempt in 0..attempts.max(1) {
            match self.upsert(metric) {
                Ok(preserved) => return Ok(preserved),
                Err(e) => {
                    tracing::warn!(
                        contract_id = %metric.contract_id,
                        metric_type = %metric.metric_type,
                        attempt = attempt + 1,
                        error = %e,
                        "指标持久化失败,准备重试"
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            RepositoryError::InternalError("upsert 重试次数为 0".to_string())
        }))
    }

    /// 按幂等主键查询
    pub fn find_by_key(&self, key: &MetricKey) -> RepositoryResult<Option<PerformanceMetric>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let found = find_by_key_tx(&tx, key)?;
        tx.commit()?;
        Ok(found)
    }

    /// 查询合同在日期范围内的指标 (报表用)
    pub fn find_by_contract_in_range(
        &self,
        contract_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<PerformanceMetric>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {COLUMNS}
            FROM performance_metric
            WHERE contract_id = ?1 AND period_start >= ?2 AND period_start < ?3
            ORDER BY period_start ASC, metric_type ASC, product_id ASC
            "#,
        ))?;

        let metrics = stmt
            .query_map(
                params![contract_id, start.to_string(), end.to_string()],
                map_metric_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(metrics)
    }

    /// 查询同键上一周期的指标 (趋势比较用)
    ///
    /// # 说明
    /// 取 period_end <= 当前周期起点的最近一条
    pub fn find_previous_period(
        &self,
        key: &MetricKey,
    ) -> RepositoryResult<Option<PerformanceMetric>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {COLUMNS}
            FROM performance_metric
            WHERE contract_id = ?1 AND product_id = ?2 AND metric_type = ?3
              AND period_end <= ?4
            ORDER BY period_start DESC
            LIMIT 1
            "#,
        ))?;

        let result = stmt.query_row(
            params![
                key.contract_id,
                key.product_id.clone().unwrap_or_default(),
                key.metric_type.to_db_str(),
                key.period_start.to_string(),
            ],
            map_metric_row,
        );
        match result {
            Ok(metric) => Ok(Some(metric)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询同键此前最近 N 期的实际值 (滚动均值用,按周期起点降序)
    pub fn find_recent_actuals(
        &self,
        key: &MetricKey,
        limit: u32,
    ) -> RepositoryResult<Vec<f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT actual_value
            FROM performance_metric
            WHERE contract_id = ?1 AND product_id = ?2 AND metric_type = ?3
              AND period_end <= ?4
            ORDER BY period_start DESC
            LIMIT ?5
            "#,
        )?;

        let values = stmt
            .query_map(
                params![
                    key.contract_id,
                    key.product_id.clone().unwrap_or_default(),
                    key.metric_type.to_db_str(),
                    key.period_start.to_string(),
                    limit,
                ],
                |row| row.get::<_, f64>(0),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(values)
    }

    /// 查询待处理升级 (escalation_triggered 且 requires_action)
    pub fn find_pending_escalations(
        &self,
        contract_id: Option<&str>,
    ) -> RepositoryResult<Vec<PerformanceMetric>> {
        let conn = self.get_conn()?;
        let metrics = match contract_id {
            Some(cid) => {
                let mut stmt = conn.prepare(&format!(
                    r#"
                    SELECT {COLUMNS}
                    FROM performance_metric
                    WHERE escalation_triggered = 1 AND requires_action = 1 AND contract_id = ?1
                    ORDER BY escalation_level DESC, period_start ASC
                    "#,
                ))?;
                let rows = stmt
                    .query_map(params![cid], map_metric_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    r#"
                    SELECT {COLUMNS}
                    FROM performance_metric
                    WHERE escalation_triggered = 1 AND requires_action = 1
                    ORDER BY escalation_level DESC, period_start ASC
                    "#,
                ))?;
                let rows = stmt
                    .query_map([], map_metric_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };
        Ok(metrics)
    }

    // ==========================================
    // 驾驶舱聚合查询
    // ==========================================

    /// 统计窗口内的罚金/奖励合计
    pub fn sum_financials_in(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<(f64, f64)> {
        let conn = self.get_conn()?;
        let (penalties, bonuses) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(penalties_applied), 0),
                COALESCE(SUM(bonuses_earned), 0)
            FROM performance_metric
            WHERE period_start >= ?1 AND period_start < ?2
            "#,
            params![start.to_string(), end.to_string()],
            |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)),
        )?;
        Ok((penalties, bonuses))
    }

    /// 统计窗口内某指标类型的实际值均值 (无样本返回 None)
    ///
    /// # 说明
    /// 仅对落库指标求均值: 无样本的合同不产生行,自然不进入分母
    pub fn avg_actual_for_type_in(
        &self,
        metric_type: MetricType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Option<f64>> {
        let conn = self.get_conn()?;
        let avg: Option<f64> = conn.query_row(
            r#"
            SELECT AVG(actual_value)
            FROM performance_metric
            WHERE metric_type = ?1 AND period_start >= ?2 AND period_start < ?3
            "#,
            params![metric_type.to_db_str(), start.to_string(), end.to_string()],
            |row| row.get(0),
        )?;
        Ok(avg)
    }

    /// 统计窗口内出现指定档位及更差档位指标的合同ID (去重)
    pub fn contract_ids_with_status_at_least(
        &self,
        worst_allowed: PerformanceStatus,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        // 档位按严重程度枚举,SQL 侧用 IN 列表
        let statuses: Vec<&str> = [
            PerformanceStatus::Excellent,
            PerformanceStatus::Good,
            PerformanceStatus::Warning,
            PerformanceStatus::Breach,
            PerformanceStatus::Critical,
        ]
        .iter()
        .filter(|s| **s >= worst_allowed)
        .map(|s| s.to_db_str())
        .collect();
        let placeholders = statuses
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            r#"
            SELECT DISTINCT contract_id
            FROM performance_metric
            WHERE period_start >= ?1 AND period_start < ?2 AND status IN ({placeholders})
            ORDER BY contract_id ASC
            "#,
        );
        let mut stmt = conn.prepare(&sql)?;

        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(start.to_string()),
            Box::new(end.to_string()),
        ];
        for s in &statuses {
            bound.push(Box::new(s.to_string()));
        }
        let refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let ids = stmt
            .query_map(refs.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(ids)
    }

    /// 统计窗口内各合同的得分均值
    pub fn avg_score_by_contract_in(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<(String, f64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT contract_id, AVG(performance_score)
            FROM performance_metric
            WHERE period_start >= ?1 AND period_start < ?2
            GROUP BY contract_id
            ORDER BY contract_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![start.to_string(), end.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 外部复核流程写回复核标注 (重算会保留这些字段)
    ///
    /// # 说明
    /// 复核是指标状态机的终态入口,由复核工作流调用,批处理不触碰
    pub fn annotate_review(
        &self,
        key: &MetricKey,
        reviewer: &str,
        notes: Option<&str>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute(
            r#"
            UPDATE performance_metric
            SET reviewed = 1, reviewed_by = ?1, review_notes = ?2, requires_action = 0
            WHERE contract_id = ?3 AND product_id = ?4 AND metric_type = ?5
              AND period_start = ?6 AND period_end = ?7
            "#,
            params![
                reviewer,
                notes,
                key.contract_id,
                key.product_id.clone().unwrap_or_default(),
                key.metric_type.to_db_str(),
                key.period_start.to_string(),
                key.period_end.to_string(),
            ],
        )?;
        Ok(count)
    }
}

// ==========================================
// 行映射辅助函数
// ==========================================

/// SELECT 列清单 (与 map_metric_row 顺序一致)
const COLUMNS: &str = r#"
    metric_id, contract_id, product_id, source_order_id,
    metric_type, period, period_start, period_end,
    target_value, actual_value, variance, variance_percent,
    status, performance_score,
    sample_size, total_events, successful_events, failed_events,
    penalties_applied, bonuses_earned, net_financial_impact,
    trend_direction, previous_period_value, rolling_avg_3, rolling_avg_12,
    escalation_level, escalation_triggered, escalation_date,
    requires_action, action_deadline,
    calculation_method, data_sources, calculated_at, calculated_by,
    low_confidence, reviewed, reviewed_by, review_notes
"#;

/// 事务内按键查询
fn find_by_key_tx(
    tx: &rusqlite::Transaction<'_>,
    key: &MetricKey,
) -> RepositoryResult<Option<PerformanceMetric>> {
    let mut stmt = tx.prepare(&format!(
        r#"
        SELECT {COLUMNS}
        FROM performance_metric
        WHERE contract_id = ?1 AND product_id = ?2 AND metric_type = ?3
          AND period_start = ?4 AND period_end = ?5
        "#,
    ))?;

    let result = stmt.query_row(
        params![
            key.contract_id,
            key.product_id.clone().unwrap_or_default(),
            key.metric_type.to_db_str(),
            key.period_start.to_string(),
            key.period_end.to_string(),
        ],
        map_metric_row,
    );
    match result {
        Ok(metric) => Ok(Some(metric)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 指标行映射
fn map_metric_row(row: &Row<'_>) -> SqliteResult<PerformanceMetric> {
    let product_id: String = row.get(2)?;
    Ok(PerformanceMetric {
        metric_id: row.get(0)?,
        contract_id: row.get(1)?,
        product_id: if product_id.is_empty() {
            None
        } else {
            Some(product_id)
        },
        source_order_id: row.get(3)?,
        metric_type: MetricType::from_str(&row.get::<_, String>(4)?)
            .unwrap_or(MetricType::DeliveryPerformance),
        period: MeasurementPeriod::from_str(&row.get::<_, String>(5)?),
        period_start: parse_date(&row.get::<_, String>(6)?),
        period_end: parse_date(&row.get::<_, String>(7)?),
        target_value: row.get(8)?,
        actual_value: row.get(9)?,
        variance: row.get(10)?,
        variance_percent: row.get(11)?,
        status: PerformanceStatus::from_str(&row.get::<_, String>(12)?),
        performance_score: row.get(13)?,
        sample_size: row.get(14)?,
        total_events: row.get(15)?,
        successful_events: row.get(16)?,
        failed_events: row.get(17)?,
        penalties_applied: row.get(18)?,
        bonuses_earned: row.get(19)?,
        net_financial_impact: row.get(20)?,
        trend_direction: TrendDirection::from_str(&row.get::<_, String>(21)?),
        previous_period_value: row.get(22)?,
        rolling_avg_3: row.get(23)?,
        rolling_avg_12: row.get(24)?,
        escalation_level: row.get(25)?,
        escalation_triggered: row.get(26)?,
        escalation_date: row
            .get::<_, Option<String>>(27)?
            .map(|s| parse_datetime(&s)),
        requires_action: row.get(28)?,
        action_deadline: row.get::<_, Option<String>>(29)?.map(|s| parse_date(&s)),
        calculation_method: row.get(30)?,
        data_sources: serde_json::from_str(&row.get::<_, String>(31)?).unwrap_or_default(),
        calculated_at: parse_datetime(&row.get::<_, String>(32)?),
        calculated_by: row.get(33)?,
        low_confidence: row.get(34)?,
        reviewed: row.get(35)?,
        reviewed_by: row.get(36)?,
        review_notes: row.get(37)?,
    })
}

/// 解析日期字符串 (YYYY-MM-DD)
fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

/// 解析日期时间字符串
fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| NaiveDateTime::default())
}
