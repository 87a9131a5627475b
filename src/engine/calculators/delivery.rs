// ==========================================
// 合同履约与SLA绩效引擎 - 交付绩效计算器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 3.1 交付绩效
// ==========================================
// 可考核事件: 窗口内完成交付的订单
// 达标: 交付耗时 <= 生效交付天数目标
// ==========================================

use crate::domain::order::OrderRecord;
use crate::engine::calculators::{MeasurementWindow, RawSample};
use crate::engine::sla_resolver::EffectiveTargets;
use chrono::NaiveDate;

// ==========================================
// DeliveryCalculator - 交付绩效计算器
// ==========================================
pub struct DeliveryCalculator {
    // 无状态引擎
}

impl DeliveryCalculator {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算合同级交付绩效样本
    ///
    /// # 返回
    /// - Some(RawSample): actual = 准时率(%), target = 100 - 交付容差
    /// - None: 窗口内无已交付订单
    pub fn compute(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
    ) -> Option<RawSample> {
        self.compute_filtered(targets, orders, window, |_| true)
    }

    /// 计算产品级交付绩效样本
    ///
    /// # 参数
    /// - `product_id`: 仅统计含该产品行项目的订单
    /// - `grace_end`: 宽限期结束日,此前创建的订单不纳入考核
    pub fn compute_for_product(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
        product_id: &str,
        grace_end: Option<NaiveDate>,
    ) -> Option<RawSample> {
        self.compute_filtered(targets, orders, window, |order| {
            if let Some(grace) = grace_end {
                if order.created_at.date() < grace {
                    return false;
                }
            }
            !order.line_items_for(product_id).is_empty()
        })
    }

    /// 按订单过滤谓词计算样本
    fn compute_filtered<F>(
        &self,
        targets: &EffectiveTargets,
        orders: &[OrderRecord],
        window: &MeasurementWindow,
        eligible: F,
    ) -> Option<RawSample>
    where
        F: Fn(&OrderRecord) -> bool,
    {
        let mut total = 0i64;
        let mut on_time = 0i64;
        let mut early = 0i64;

        for order in orders {
            if !order.delivered_in(window.start, window.end) || !eligible(order) {
                continue;
            }
            let days = match order.delivery_days() {
                Some(d) => d,
                None => continue,
            };
            total += 1;
            if days <= targets.delivery_days {
                on_time += 1;
            }
            // 提前超过1天,用于奖励判定
            if targets.delivery_days - days > 1 {
                early += 1;
            }
        }

        if total == 0 {
            return None;
        }

        let mut sample = RawSample::ratio(
            on_time,
            total,
            100.0 - targets.delivery_tolerance_percent,
        );
        sample.early_events = early;
        Some(sample)
    }
}

impl Default for DeliveryCalculator {
    fn default() -> Self {
        Self::new()
    }
}
