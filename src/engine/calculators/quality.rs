// ==========================================
// 合同履约与SLA绩效引擎 - 质量绩效计算器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 3.2 质量绩效
// ==========================================
// 可考核事件: 窗口内已交付订单的行项目
// 达标: 验收记录无质量缺陷标记
// ==========================================

use crate::domain::order::OrderRecord;
use crate::engine::calculators::{MeasurementWindow, RawSample};
use crate::engine::sla_resolver::EffectiveTargets;
use chrono::NaiveDate;

// ==========================================
// QualityCalculator - 质量绩效计算器
// ==========================================
pub struct QualityCalculator {
    // 无状态引擎
}

impl QualityCalculator {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算合同级质量绩效样本
    ///
    /// # 返回
    /// - Some(RawSample): actual = 无缺陷率(%), target = 100 - 质量容差
    /// - None: 窗口内无已交付行项目
    pub fn compute(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
    ) -> Option<RawSample> {
        self.compute_filtered(targets, orders, window, None, None)
    }

    /// 计算产品级质量绩效样本
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

    /// 统计窗口内已交付行项目的缺陷情况
    fn compute_filtered(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
        product_id: Option<&str>,
        grace_end: Option<NaiveDate>,
    ) -> Option<RawSample> {
        let mut total = 0i64;
        let mut defect_free = 0i64;

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
                total += 1;
                if !line.quality_defect {
                    defect_free += 1;
                }
            }
        }

        if total == 0 {
            return None;
        }

        Some(RawSample::ratio(
            defect_free,
            total,
            100.0 - targets.quality_tolerance_percent,
        ))
    }
}

impl Default for QualityCalculator {
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

    fn order_with_lines(order_id: &str, defects: &[bool]) -> OrderRecord {
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
            line_items: defects
                .iter()
                .enumerate()
                .map(|(i, defect)| OrderLineItem {
                    line_id: format!("{}-L{}", order_id, i),
                    order_id: order_id.to_string(),
                    product_id: "P001".to_string(),
                    ordered_qty: 100.0,
                    delivered_qty: Some(100.0),
                    quality_defect: *defect,
                    defect_note: defect.then(|| "表面划伤".to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_compute_defect_free_ratio() {
        let calc = QualityCalculator::new();
        let orders = vec![
            order_with_lines("O001", &[false, false, true]),
            order_with_lines("O002", &[false]),
        ];

        let sample = calc.compute(&targets(), &orders, &window()).unwrap();
        assert_eq!(sample.total_events, 4);
        assert_eq!(sample.successful_events, 3);
        assert_eq!(sample.actual_value, 75.0);
        assert_eq!(sample.target_value, 98.0);
    }

    #[test]
    fn test_compute_none_without_delivered_lines() {
        let calc = QualityCalculator::new();
        let mut order = order_with_lines("O001", &[false]);
        order.actual_delivery_at = None;
        assert!(calc.compute(&targets(), &[order], &window()).is_none());
    }

    #[test]
    fn test_compute_for_product_only_counts_matching_lines() {
        let calc = QualityCalculator::new();
        let mut order = order_with_lines("O001", &[false, true]);
        order.line_items[1].product_id = "P999".to_string();

        let sample = calc
            .compute_for_product(&targets(), &[order], &window(), "P001", None)
            .unwrap();
        assert_eq!(sample.total_events, 1);
        assert_eq!(sample.successful_events, 1);
        assert_eq!(sample.actual_value, 100.0);
    }
}
