// ==========================================
// 合同履约与SLA绩效引擎 - 订单台账领域模型
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART D 订单台账
// 红线: 订单为已关账周期的不可变事实,引擎只读
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// OrderLineItem - 订单行项目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub line_id: String,               // 行项目ID
    pub order_id: String,              // 所属订单ID
    pub product_id: String,            // 产品ID
    pub ordered_qty: f64,              // 订购数量
    pub delivered_qty: Option<f64>,    // 实收数量 (未交付为 None)
    pub quality_defect: bool,          // 质量缺陷标记 (来自验收记录)
    pub defect_note: Option<String>,   // 缺陷说明
}

impl OrderLineItem {
    /// 是否有可用的实收数量记录
    pub fn has_delivered_qty(&self) -> bool {
        self.delivered_qty.is_some()
    }
}

// ==========================================
// OrderRecord - 采购订单
// ==========================================
// 用途: 指标计算的唯一事实来源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,                       // 订单ID
    pub supplier_id: String,                    // 供应商ID
    pub status: OrderStatus,                    // 订单状态
    pub created_at: NaiveDateTime,              // 下单时间
    pub promised_delivery_at: Option<NaiveDateTime>, // 承诺交付时间
    pub actual_delivery_at: Option<NaiveDateTime>,   // 实际交付时间
    pub total_value: f64,                       // 订单总金额
    pub line_items: Vec<OrderLineItem>,         // 行项目
}

impl OrderRecord {
    /// 实际交付耗时(天),未交付返回 None
    ///
    /// # 说明
    /// 以自然日差值计算,不足一天按实际比例折算后向上归入天数
    pub fn delivery_days(&self) -> Option<i64> {
        let delivered = self.actual_delivery_at?;
        let seconds = (delivered - self.created_at).num_seconds();
        if seconds <= 0 {
            return Some(0);
        }
        // 向上取整到天
        Some((seconds + 86_399) / 86_400)
    }

    /// 是否在窗口 [start, end) 内完成交付
    pub fn delivered_in(&self, start: NaiveDate, end: NaiveDate) -> bool {
        match self.actual_delivery_at {
            Some(at) => at.date() >= start && at.date() < end,
            None => false,
        }
    }

    /// 是否在窗口 [start, end) 内创建
    pub fn created_in(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.created_at.date() >= start && self.created_at.date() < end
    }

    /// 截至指定日期是否到达履约终态
    ///
    /// # 规则
    /// - 状态为 RECEIVED/CLOSED
    /// - 且实际交付时间(若有)不晚于截止日期
    pub fn is_fulfilled_by(&self, cutoff: NaiveDate) -> bool {
        if !self.status.is_terminal_fulfilled() {
            return false;
        }
        match self.actual_delivery_at {
            Some(at) => at.date() < cutoff,
            None => true, // 无交付时间戳但状态已终结,按台账状态为准
        }
    }

    /// 指定产品的行项目
    pub fn line_items_for(&self, product_id: &str) -> Vec<&OrderLineItem> {
        self.line_items
            .iter()
            .filter(|li| li.product_id == product_id)
            .collect()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn order(created: &str, delivered: Option<&str>, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: "O001".to_string(),
            supplier_id: "S001".to_string(),
            status,
            created_at: NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S").unwrap(),
            promised_delivery_at: None,
            actual_delivery_at: delivered
                .map(|d| NaiveDateTime::parse_from_str(d, "%Y-%m-%d %H:%M:%S").unwrap()),
            total_value: 1000.0,
            line_items: vec![],
        }
    }

    #[test]
    fn test_delivery_days_rounds_up() {
        let o = order(
            "2025-03-01 08:00:00",
            Some("2025-03-08 09:00:00"),
            OrderStatus::Delivered,
        );
        // 7天1小时 -> 8天
        assert_eq!(o.delivery_days(), Some(8));

        let o = order(
            "2025-03-01 08:00:00",
            Some("2025-03-08 08:00:00"),
            OrderStatus::Delivered,
        );
        assert_eq!(o.delivery_days(), Some(7));
    }

    #[test]
    fn test_delivery_days_none_when_undelivered() {
        let o = order("2025-03-01 08:00:00", None, OrderStatus::Shipped);
        assert_eq!(o.delivery_days(), None);
    }

    #[test]
    fn test_delivered_in_window_half_open() {
        let o = order(
            "2025-03-01 08:00:00",
            Some("2025-03-31 10:00:00"),
            OrderStatus::Received,
        );
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert!(o.delivered_in(start, end));
        // 窗口右端不含
        assert!(!o.delivered_in(start, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()));
    }

    #[test]
    fn test_is_fulfilled_by() {
        let o = order(
            "2025-03-01 08:00:00",
            Some("2025-03-10 10:00:00"),
            OrderStatus::Received,
        );
        assert!(o.is_fulfilled_by(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
        assert!(!o.is_fulfilled_by(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()));

        let cancelled = order("2025-03-01 08:00:00", None, OrderStatus::Cancelled);
        assert!(!cancelled.is_fulfilled_by(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
    }
}
