// ==========================================
// 合同履约与SLA绩效引擎 - 合同配置仓储
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART C 合同配置
// 红线: Repository 不含业务逻辑
// 红线: 合同配置只读,本仓储不提供写接口
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::contract::{Contract, ProductSla, SeasonalRule};
use crate::domain::types::ContractStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ContractRepository - 合同配置仓储
// ==========================================
/// 合同配置仓储
/// 职责: contract / product_sla 表的只读访问
/// 用途: 批处理装载有效合同及其产品级覆写
pub struct ContractRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContractRepository {
    /// 创建新的 ContractRepository 实例
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

    /// 按ID查询合同
    ///
    /// # 返回
    /// - Ok(Some(Contract)): 找到合同
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, contract_id: &str) -> RepositoryResult<Option<Contract>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                contract_id, supplier_id, status, valid_from, valid_until,
                delivery_sla_days, quality_tolerance_percent, delivery_tolerance_percent,
                quantity_accuracy_threshold, fulfillment_target_percent,
                penalty_rate_percent, bonus_rate_percent, currency, volume_commitment
            FROM contract
            WHERE contract_id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![contract_id], map_contract_row);
        match result {
            Ok(contract) => Ok(Some(contract)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询有效区间与计算窗口 [start, end) 有交集的 ACTIVE 合同
    ///
    /// # 说明
    /// 半开区间交集: valid_from < end AND valid_until > start
    pub fn find_effective_in_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<Contract>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                contract_id, supplier_id, status, valid_from, valid_until,
                delivery_sla_days, quality_tolerance_percent, delivery_tolerance_percent,
                quantity_accuracy_threshold, fulfillment_target_percent,
                penalty_rate_percent, bonus_rate_percent, currency, volume_commitment
            FROM contract
            WHERE status = 'ACTIVE' AND valid_from < ?2 AND valid_until > ?1
            ORDER BY contract_id ASC
            "#,
        )?;

        let contracts = stmt
            .query_map(params![start.to_string(), end.to_string()], map_contract_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(contracts)
    }

    /// 查询 ACTIVE 且在指定日期有效的合同 (驾驶舱用)
    pub fn find_active_on(&self, date: NaiveDate) -> RepositoryResult<Vec<Contract>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                contract_id, supplier_id, status, valid_from, valid_until,
                delivery_sla_days, quality_tolerance_percent, delivery_tolerance_percent,
                quantity_accuracy_threshold, fulfillment_target_percent,
                penalty_rate_percent, bonus_rate_percent, currency, volume_commitment
            FROM contract
            WHERE status = 'ACTIVE' AND valid_from <= ?1 AND valid_until > ?1
            ORDER BY contract_id ASC
            "#,
        )?;

        let contracts = stmt
            .query_map(params![date.to_string()], map_contract_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(contracts)
    }

    /// 查询合同下全部产品级SLA覆写
    ///
    /// # 说明
    /// 生效性判断 (suspended/区间) 由引擎层完成,仓储原样返回
    pub fn find_product_slas(&self, contract_id: &str) -> RepositoryResult<Vec<ProductSla>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                product_sla_id, contract_id, product_id,
                delivery_sla_days, delivery_tolerance_percent, quality_tolerance_percent,
                quantity_accuracy_threshold, penalty_rate_percent, bonus_rate_percent,
                peak_season, off_peak_season, special_requirements,
                escalation_notice_days, measurement_period_days, grace_period_days,
                effective_from, effective_until, suspended
            FROM product_sla
            WHERE contract_id = ?1
            ORDER BY product_id ASC
            "#,
        )?;

        let slas = stmt
            .query_map(params![contract_id], map_product_sla_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(slas)
    }
}

// ==========================================
// 行映射辅助函数
// ==========================================

/// 合同行映射
fn map_contract_row(row: &Row<'_>) -> SqliteResult<Contract> {
    Ok(Contract {
        contract_id: row.get(0)?,
        supplier_id: row.get(1)?,
        status: ContractStatus::from_str(&row.get::<_, String>(2)?),
        valid_from: parse_date(&row.get::<_, String>(3)?),
        valid_until: parse_date(&row.get::<_, String>(4)?),
        delivery_sla_days: row.get(5)?,
        quality_tolerance_percent: row.get(6)?,
        delivery_tolerance_percent: row.get(7)?,
        quantity_accuracy_threshold: row.get(8)?,
        fulfillment_target_percent: row.get(9)?,
        penalty_rate_percent: row.get(10)?,
        bonus_rate_percent: row.get(11)?,
        currency: row.get(12)?,
        volume_commitment: row.get(13)?,
    })
}

/// 产品级SLA行映射
fn map_product_sla_row(row: &Row<'_>) -> SqliteResult<ProductSla> {
    Ok(ProductSla {
        product_sla_id: row.get(0)?,
        contract_id: row.get(1)?,
        product_id: row.get(2)?,
        delivery_sla_days: row.get(3)?,
        delivery_tolerance_percent: row.get(4)?,
        quality_tolerance_percent: row.get(5)?,
        quantity_accuracy_threshold: row.get(6)?,
        penalty_rate_percent: row.get(7)?,
        bonus_rate_percent: row.get(8)?,
        peak_season: parse_seasonal_rule(row.get::<_, Option<String>>(9)?),
        off_peak_season: parse_seasonal_rule(row.get::<_, Option<String>>(10)?),
        special_requirements: serde_json::from_str(&row.get::<_, String>(11)?)
            .unwrap_or_default(),
        escalation_notice_days: row.get(12)?,
        measurement_period_days: row.get(13)?,
        grace_period_days: row.get(14)?,
        effective_from: parse_date(&row.get::<_, String>(15)?),
        effective_until: parse_date(&row.get::<_, String>(16)?),
        suspended: row.get(17)?,
    })
}

/// 解析日期字符串 (YYYY-MM-DD)
fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

/// 解析季节性规则 JSON
fn parse_seasonal_rule(raw: Option<String>) -> Option<SeasonalRule> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}
