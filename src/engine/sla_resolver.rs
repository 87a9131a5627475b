// ==========================================
// 合同履约与SLA绩效引擎 - SLA目标解析器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 2. SLA Resolver
// ==========================================
// 职责: 合同默认值 + 产品覆写 + 季节性调整 => 生效目标
// 输入: 合同 + 可选产品级SLA + 基准日期
// 输出: EffectiveTargets (纯函数,无副作用)
// ==========================================

use crate::domain::contract::{Contract, ProductSla};
use serde::{Deserialize, Serialize};

// ==========================================
// EffectiveTargets - 生效目标
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveTargets {
    pub delivery_days: i64,                // 交付天数目标
    pub quality_tolerance_percent: f64,    // 质量容差(%)
    pub delivery_tolerance_percent: f64,   // 交付容差(%)
    pub quantity_accuracy_threshold: f64,  // 数量准确率阈值(%)
    pub penalty_rate_percent: f64,         // 罚金费率(%)
    pub bonus_rate_percent: f64,           // 奖励费率(%)
}

// ==========================================
// SlaResolver - SLA目标解析器
// ==========================================
pub struct SlaResolver {
    // 无状态引擎,不需要注入依赖
}

impl SlaResolver {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 解析指定日期的生效目标
    ///
    /// # 算法
    /// 1. 以合同默认值为基准
    /// 2. 产品级SLA在基准日期生效时,逐字段覆写已定义的值
    /// 3. 按基准日期所在月份应用旺季/淡季调整 (命中月份集才叠加增量)
    ///
    /// # 不变式
    /// - 质量容差不得低于 0
    /// - 交付天数不得低于 1
    pub fn resolve(
        &self,
        contract: &Contract,
        product_sla: Option<&ProductSla>,
        as_of: chrono::NaiveDate,
    ) -> EffectiveTargets {
        // 1. 合同默认值
        let mut targets = EffectiveTargets {
            delivery_days: contract.delivery_sla_days,
            quality_tolerance_percent: contract.quality_tolerance_percent,
            delivery_tolerance_percent: contract.delivery_tolerance_percent,
            quantity_accuracy_threshold: contract.quantity_accuracy_threshold,
            penalty_rate_percent: contract.penalty_rate_percent,
            bonus_rate_percent: contract.bonus_rate_percent,
        };

        // 2. 产品级覆写 (仅当覆写记录在基准日期生效)
        let effective_sla = product_sla.filter(|sla| sla.is_effective_on(as_of));
        if let Some(sla) = effective_sla {
            if let Some(days) = sla.delivery_sla_days {
                targets.delivery_days = days;
            }
            if let Some(tol) = sla.delivery_tolerance_percent {
                targets.delivery_tolerance_percent = tol;
            }
            if let Some(tol) = sla.quality_tolerance_percent {
                targets.quality_tolerance_percent = tol;
            }
            if let Some(threshold) = sla.quantity_accuracy_threshold {
                targets.quantity_accuracy_threshold = threshold;
            }
            if let Some(rate) = sla.penalty_rate_percent {
                targets.penalty_rate_percent = rate;
            }
            if let Some(rate) = sla.bonus_rate_percent {
                targets.bonus_rate_percent = rate;
            }
        }

        // 3. 季节性调整 (旺季/淡季月份集命中才生效)
        if let Some(sla) = effective_sla {
            for rule in [sla.peak_season.as_ref(), sla.off_peak_season.as_ref()]
                .into_iter()
                .flatten()
            {
                if rule.applies_to(as_of) {
                    targets.delivery_days += rule.delivery_days_delta;
                    targets.delivery_tolerance_percent += rule.tolerance_delta_percent;
                    targets.quality_tolerance_percent += rule.tolerance_delta_percent;
                }
            }
        }

        // 不变式收口
        if targets.quality_tolerance_percent < 0.0 {
            targets.quality_tolerance_percent = 0.0;
        }
        if targets.delivery_days < 1 {
            targets.delivery_days = 1;
        }

        targets
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for SlaResolver {
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
    use crate::domain::contract::SeasonalRule;
    use crate::domain::types::ContractStatus;
    use chrono::NaiveDate;

    fn test_contract() -> Contract {
        Contract {
            contract_id: "C001".to_string(),
            supplier_id: "S001".to_string(),
            status: ContractStatus::Active,
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            delivery_sla_days: 7,
            quality_tolerance_percent: 2.0,
            delivery_tolerance_percent: 5.0,
            quantity_accuracy_threshold: 98.0,
            fulfillment_target_percent: None,
            penalty_rate_percent: 1.5,
            bonus_rate_percent: 0.5,
            currency: "CNY".to_string(),
            volume_commitment: 1_000_000.0,
        }
    }

    fn test_product_sla() -> ProductSla {
        ProductSla {
            product_sla_id: "PS001".to_string(),
            contract_id: "C001".to_string(),
            product_id: "P001".to_string(),
            delivery_sla_days: Some(5),
            delivery_tolerance_percent: None,
            quality_tolerance_percent: Some(1.0),
            quantity_accuracy_threshold: None,
            penalty_rate_percent: None,
            bonus_rate_percent: None,
            peak_season: Some(SeasonalRule {
                months: vec![1, 2, 3],
                delivery_days_delta: 3,
                tolerance_delta_percent: 0.0,
            }),
            off_peak_season: None,
            special_requirements: vec![],
            escalation_notice_days: 7,
            measurement_period_days: 30,
            grace_period_days: 0,
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            effective_until: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            suspended: false,
        }
    }

    #[test]
    fn test_resolve_contract_defaults() {
        let resolver = SlaResolver::new();
        let contract = test_contract();
        let targets = resolver.resolve(
            &contract,
            None,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        );

        assert_eq!(targets.delivery_days, 7);
        assert_eq!(targets.quality_tolerance_percent, 2.0);
        assert_eq!(targets.delivery_tolerance_percent, 5.0);
        assert_eq!(targets.quantity_accuracy_threshold, 98.0);
    }

    #[test]
    fn test_resolve_product_override() {
        let resolver = SlaResolver::new();
        let contract = test_contract();
        let sla = test_product_sla();
        // 6月不在旺季月份集,无季节调整
        let targets = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        );

        assert_eq!(targets.delivery_days, 5); // 覆写
        assert_eq!(targets.quality_tolerance_percent, 1.0); // 覆写
        assert_eq!(targets.delivery_tolerance_percent, 5.0); // 沿用默认
        assert_eq!(targets.penalty_rate_percent, 1.5); // 沿用默认
    }

    #[test]
    fn test_resolve_peak_season_boundary() {
        let resolver = SlaResolver::new();
        let contract = test_contract();
        let sla = test_product_sla();

        // 1月31日命中旺季 [1,2,3]: 5 + 3 = 8
        let jan = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        assert_eq!(jan.delivery_days, 8);

        // 4月1日在月份集之外: 覆写值原样
        let apr = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        );
        assert_eq!(apr.delivery_days, 5);

        // 两者恰好相差季节增量
        assert_eq!(jan.delivery_days - apr.delivery_days, 3);
    }

    #[test]
    fn test_resolve_december_january_wraparound() {
        let resolver = SlaResolver::new();
        let contract = test_contract();
        let mut sla = test_product_sla();
        sla.peak_season = Some(SeasonalRule {
            months: vec![12, 1],
            delivery_days_delta: 2,
            tolerance_delta_percent: 1.0,
        });

        let dec = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );
        assert_eq!(dec.delivery_days, 7); // 5 + 2
        assert_eq!(dec.delivery_tolerance_percent, 6.0);

        let jan = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        assert_eq!(jan.delivery_days, 7);

        let feb = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        );
        assert_eq!(feb.delivery_days, 5);
    }

    #[test]
    fn test_resolve_suspended_sla_ignored() {
        let resolver = SlaResolver::new();
        let contract = test_contract();
        let mut sla = test_product_sla();
        sla.suspended = true;

        let targets = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        );
        // 暂停的覆写连同其季节规则一并失效
        assert_eq!(targets.delivery_days, 7);
        assert_eq!(targets.quality_tolerance_percent, 2.0);
    }

    #[test]
    fn test_resolve_expired_sla_ignored() {
        let resolver = SlaResolver::new();
        let contract = test_contract();
        let sla = test_product_sla();

        // 覆写自身有效期之外
        let targets = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        );
        assert_eq!(targets.delivery_days, 7);
    }

    #[test]
    fn test_resolve_quality_tolerance_floor() {
        let resolver = SlaResolver::new();
        let contract = test_contract();
        let mut sla = test_product_sla();
        sla.quality_tolerance_percent = Some(0.5);
        sla.peak_season = Some(SeasonalRule {
            months: vec![1],
            delivery_days_delta: 0,
            tolerance_delta_percent: -2.0,
        });

        let targets = resolver.resolve(
            &contract,
            Some(&sla),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        );
        // 0.5 - 2.0 收口到 0
        assert_eq!(targets.quality_tolerance_percent, 0.0);
    }
}
