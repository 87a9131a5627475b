// ==========================================
// 合同履约与SLA绩效引擎 - 订单履约率计算器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 3.4 订单履约率
// ==========================================
// 可考核事件: 窗口内创建的全部订单
// 达标: 窗口结束前到达履约终态 (RECEIVED/CLOSED)
// 目标: 默认 95,合同可覆写 (仅合同级指标,不做产品拆分)
// ==========================================

use crate::domain::contract::Contract;
use crate::domain::order::OrderRecord;
use crate::engine::calculators::{MeasurementWindow, RawSample};

// ==========================================
// FulfillmentCalculator - 订单履约率计算器
// ==========================================
pub struct FulfillmentCalculator {
    // 无状态引擎
}

impl FulfillmentCalculator {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算订单履约率样本
    ///
    /// # 参数
    /// - `default_target`: 配置的默认履约率目标 (合同覆写优先)
    ///
    /// # 返回
    /// - Some(RawSample): actual = 终态订单占比(%)
    /// - None: 窗口内无新建订单
    pub fn compute(
        &self,
        contract: &Contract,
        default_target: f64,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
    ) -> Option<RawSample> {
        let target = contract.fulfillment_target_percent.unwrap_or(default_target);

        let mut total = 0i64;
        let mut fulfilled = 0i64;
        for order in orders {
            if !order.created_in(window.start, window.end) {
                continue;
            }
            total += 1;
            if order.is_fulfilled_by(window.end) {
                fulfilled += 1;
            }
        }

        if total == 0 {
            return None;
        }

        Some(RawSample::ratio(fulfilled, total, target))
    }
}

impl Default for FulfillmentCalculator {
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
    use crate::domain::types::{ContractStatus, OrderStatus};
    use chrono::{NaiveDate, NaiveDateTime};

    fn contract(fulfillment_override: Option<f64>) -> Contract {
        Contract {
            contract_id: "C001".to_string(),
            supplier_id: "S001".to_string(),
            status: ContractStatus::Active,
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            delivery_sla_days: 7,
            quality_tolerance_percent: 2.0,
            delivery_tolerance_percent: 5.0,
            quantity_accuracy_threshold: 98.0,
            fulfillment_target_percent: fulfillment_override,
            penalty_rate_percent: 1.5,
            bonus_rate_percent: 0.5,
            currency: "CNY".to_string(),
            volume_commitment: 1_000_000.0,
        }
    }

    fn window() -> MeasurementWindow {
        MeasurementWindow::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        )
        .unwrap()
    }

    fn order(order_id: &str, created: &str, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: order_id.to_string(),
            supplier_id: "S001".to_string(),
            status,
            created_at: NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S").unwrap(),
            promised_delivery_at: None,
            actual_delivery_at: None,
            total_value: 1000.0,
            line_items: vec![],
        }
    }

    #[test]
    fn test_compute_fulfillment_ratio() {
        let calc = FulfillmentCalculator::new();
        let orders = vec![
            order("O001", "2025-03-02 08:00:00", OrderStatus::Received),
            order("O002", "2025-03-05 08:00:00", OrderStatus::Closed),
            order("O003", "2025-03-10 08:00:00", OrderStatus::Shipped),
            order("O004", "2025-03-15 08:00:00", OrderStatus::Cancelled),
        ];

        let sample = calc
            .compute(&contract(None), 95.0, &orders, &window())
            .unwrap();
        assert_eq!(sample.total_events, 4);
        assert_eq!(sample.successful_events, 2);
        assert_eq!(sample.actual_value, 50.0);
        assert_eq!(sample.target_value, 95.0);
    }

    #[test]
    fn test_compute_contract_target_override() {
        let calc = FulfillmentCalculator::new();
        let orders = vec![order("O001", "2025-03-02 08:00:00", OrderStatus::Received)];

        let sample = calc
            .compute(&contract(Some(90.0)), 95.0, &orders, &window())
            .unwrap();
        assert_eq!(sample.target_value, 90.0);
    }

    #[test]
    fn test_compute_none_when_no_orders_created_in_window() {
        let calc = FulfillmentCalculator::new();
        // 窗口之前创建
        let orders = vec![order("O001", "2025-02-20 08:00:00", OrderStatus::Received)];
        assert!(calc
            .compute(&contract(None), 95.0, &orders, &window())
            .is_none());
    }
}
