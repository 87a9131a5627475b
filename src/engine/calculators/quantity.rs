// ==========================================
// 合同履约与SLA绩效引擎 - 数量准确率计算器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 3.3 数量准确率
// ==========================================
// 可考核事件: 已交付且有实收数量记录的行项目
// 达标: 准确率落在 [阈值, 阈值+2] (允许至多2个点的超交容忍)
// ==========================================

use crate::domain::order::OrderRecord;
use crate::engine::calculators::{MeasurementWindow, RawSample};
use crate::engine::sla_resolver::EffectiveTargets;
use chrono::NaiveDate;

/// 准确率原始值的收口上限 (防御脏数据)
const ACCURACY_CLAMP_MAX: f64 = 200.0;

/// 超交容忍幅度 (百分点)
const OVER_DELIVERY_ALLOWANCE: f64 = 2.0;

// ==========================================
// QuantityAccuracyCalculator - 数量准确率计算器
// ==========================================
pub struct QuantityAccuracyCalculator {
    // 无状态引擎
}

impl QuantityAccuracyCalculator {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算合同级数量准确率样本
    ///
    /// # 返回
    /// - Some(RawSample): actual = 达标行占比(%), target = 准确率阈值
    /// - None: 窗口内无带实收数量的已交付行项目
    pub fn compute(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
    ) -> Option<RawSample> {
        self.compute_filtered(targets, orders, window, None, None)
    }

    /// 计算产品级数量准确率样本
    pub fn compute_for_product(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
        product_id: &str,
        grace_end: Option<NaiveDate>,
    ) -> Option<RawSample> {
        self.compute_filtered(targets, orders, window, Some(product_id), grace_end)
    }

    /// 统计达标行项目占比
    fn compute_filtered(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
        product_id: Option<&str>,
        grace_end: Option<NaiveDate>,
    ) -> Option<RawSample> {
        let threshold = targets.quantity_accuracy_threshold;
        let mut total = 0i64;
        let mut accurate = 0i64;

        for order in orders {
            if !order.delivered_in(window.start, window.end) {
                continue;
            }
            if let Some(grace) = grace_end {
                if order.created_at.date() < grace {
                    continue;
                }
            }
            for line in &order.line_items {
                if let Some(pid) = product_id {
                    if line.product_id != pid {
                        continue;
                    }
                }
                let delivered = match line.delivered_qty {
                    Some(qty) => qty,
                    None => continue, // 无实收记录不纳入
                };
                if line.ordered_qty <= 0.0 {
                    continue; // 脏数据防御
                }
                total += 1;
                let accuracy =
                    (delivered / line.ordered_qty * 100.0).clamp(0.0, ACCURACY_CLAMP_MAX);
                if accuracy >= threshold && accuracy <= threshold + OVER_DELIVERY_ALLOWANCE {
                    accurate += 1;
                }
            }
        }

        if total == 0 {
            return None;
        }

        Some(RawSample::ratio(accurate, total, threshold))
    }
}

impl Default for QuantityAccuracyCalculator {
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
    use crate::domain::order::OrderLineItem;
    use crate::domain::types::OrderStatus;
    use chrono::NaiveDateTime;

    fn targets() -> EffectiveTargets {
        EffectiveTargets {
            delivery_days: 7,
            quality_tolerance_percent: 2.0,
            delivery_tolerance_percent: 5.0,
            quantity_accuracy_threshold: 98.0,
            penalty_rate_percent: 1.5,
            bonus_rate_percent: 0.5,
        }
    }

    fn window() -> MeasurementWindow {
        MeasurementWindow::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        )
        .unwrap()
    }

    fn order_with_qty(order_id: &str, qty_pairs: &[(f64, Option<f64>)]) -> OrderRecord {
        OrderRecord {
            order_id: order_id.to_string(),
            supplier_id: "S001".to_string(),
            status: OrderStatus::Received,
            created_at: NaiveDateTime::parse_from_str("2025-03-02 08:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            promised_delivery_at: None,
            actual_delivery_at: Some(
                NaiveDateTime::parse_from_str("2025-03-08 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            ),
            total_value: 1000.0,
            line_items: qty_pairs
                .iter()
                .enumerate()
                .map(|(i, (ordered, delivered))| OrderLineItem {
                    line_id: format!("{}-L{}", order_id, i),
                    order_id: order_id.to_string(),
                    product_id: "P001".to_string(),
                    ordered_qty: *ordered,
                    delivered_qty: *delivered,
                    quality_defect: false,
                    defect_note: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_compute_accuracy_band() {
        let calc = QuantityAccuracyCalculator::new();
        let orders = vec![order_with_qty(
            "O001",
            &[
                (100.0, Some(100.0)), // 100% 达标 (98..=100)
                (100.0, Some(99.0)),  // 99% 达标
                (100.0, Some(95.0)),  // 95% 不达标 (低于阈值)
                (100.0, Some(103.0)), // 103% 不达标 (超交超出容忍)
            ],
        )];

        let sample = calc.compute(&targets(), &orders, &window()).unwrap();
        assert_eq!(sample.total_events, 4);
        assert_eq!(sample.successful_events, 2);
        assert_eq!(sample.actual_value, 50.0);
        assert_eq!(sample.target_value, 98.0);
    }

    #[test]
    fn test_compute_skips_lines_without_delivered_qty() {
        let calc = QuantityAccuracyCalculator::new();
        let orders = vec![order_with_qty(
            "O001",
            &[(100.0, None), (100.0, Some(100.0))],
        )];

        let sample = calc.compute(&targets(), &orders, &window()).unwrap();
        assert_eq!(sample.total_events, 1);
        assert_eq!(sample.successful_events, 1);
    }

    #[test]
    fn test_compute_none_when_no_recorded_quantities() {
        let calc = QuantityAccuracyCalculator::new();
        let orders = vec![order_with_qty("O001", &[(100.0, None)])];
        assert!(calc.compute(&targets(), &orders, &window()).is_none());
    }
}
