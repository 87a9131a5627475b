// ==========================================
// 合同履约与SLA绩效引擎 - 订单台账仓储
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART D 订单台账
// 红线: Repository 不含业务逻辑
// 红线: 订单台账只读,本仓储不提供写接口
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::{OrderLineItem, OrderRecord};
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单台账仓储
// ==========================================
/// 订单台账仓储
/// 职责: purchase_order / order_line_item 表的只读访问
/// 用途: 指标计算器的数据来源
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
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

    /// 查询供应商在窗口 [start, end) 内创建的订单 (含行项目)
    ///
    /// # 说明
    /// - 创建时间判窗,与批处理的装载口径一致
    /// - 行项目一次性批量装载,避免 N+1 查询
    pub fn find_by_supplier_created_in(
        &self,
        supplier_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<OrderRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                order_id, supplier_id, status, created_at,
                promised_delivery_at, actual_delivery_at, total_value
            FROM purchase_order
            WHERE supplier_id = ?1 AND created_at >= ?2 AND created_at < ?3
            ORDER BY created_at ASC
            "#,
        )?;

        let mut orders = stmt
            .query_map(
                params![
                    supplier_id,
                    format!("{} 00:00:00", start),
                    format!("{} 00:00:00", end),
                ],
                map_order_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        if orders.is_empty() {
            return Ok(orders);
        }

        // 批量装载行项目并按 order_id 归组
        let mut by_order: HashMap<String, Vec<OrderLineItem>> = HashMap::new();
        {
            let mut line_stmt = conn.prepare(
                r#"
                SELECT
                    li.line_id, li.order_id, li.product_id,
                    li.ordered_qty, li.delivered_qty, li.quality_defect, li.defect_note
                FROM order_line_item li
                JOIN purchase_order po ON po.order_id = li.order_id
                WHERE po.supplier_id = ?1 AND po.created_at >= ?2 AND po.created_at < ?3
                "#,
            )?;
            let lines = line_stmt
                .query_map(
                    params![
                        supplier_id,
                        format!("{} 00:00:00", start),
                        format!("{} 00:00:00", end),
                    ],
                    map_line_item_row,
                )?
                .collect::<SqliteResult<Vec<_>>>()?;

            for line in lines {
                by_order.entry(line.order_id.clone()).or_default().push(line);
            }
        }

        for order in &mut orders {
            if let Some(lines) = by_order.remove(&order.order_id) {
                order.line_items = lines;
            }
        }

        Ok(orders)
    }
}

// ==========================================
// 行映射辅助函数
// ==========================================

/// 订单行映射 (行项目延后装载)
fn map_order_row(row: &Row<'_>) -> SqliteResult<OrderRecord> {
    Ok(OrderRecord {
        order_id: row.get(0)?,
        supplier_id: row.get(1)?,
        status: OrderStatus::from_str(&row.get::<_, String>(2)?),
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        promised_delivery_at: row
            .get::<_, Option<String>>(4)?
            .map(|s| parse_datetime(&s)),
        actual_delivery_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(&s)),
        total_value: row.get(6)?,
        line_items: Vec::new(),
    })
}

/// 行项目行映射
fn map_line_item_row(row: &Row<'_>) -> SqliteResult<OrderLineItem> {
    Ok(OrderLineItem {
        line_id: row.get(0)?,
        order_id: row.get(1)?,
        product_id: row.get(2)?,
        ordered_qty: row.get(3)?,
        delivered_qty: row.get(4)?,
        quality_defect: row.get(5)?,
        defect_note: row.get(6)?,
    })
}

/// 解析日期时间字符串
fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| NaiveDateTime::default())
}
