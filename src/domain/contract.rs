// ==========================================
// 合同履约与SLA绩效引擎 - 合同领域模型
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART C 合同配置
// 红线: 合同配置只读,引擎不回写合同存储
// ==========================================

use crate::domain::types::ContractStatus;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ==========================================
// Contract - 供应商合同
// ==========================================
// 用途: SLA 目标与罚则费率的默认来源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: String,           // 合同ID
    pub supplier_id: String,           // 供应商ID
    pub status: ContractStatus,        // 合同状态

    // ===== 有效区间 [valid_from, valid_until) =====
    pub valid_from: NaiveDate,         // 生效日(含)
    pub valid_until: NaiveDate,        // 失效日(不含)

    // ===== SLA 默认目标 =====
    pub delivery_sla_days: i64,            // 交付天数目标
    pub quality_tolerance_percent: f64,    // 质量容差(%)
    pub delivery_tolerance_percent: f64,   // 交付容差(%)
    pub quantity_accuracy_threshold: f64,  // 数量准确率阈值(%)
    pub fulfillment_target_percent: Option<f64>, // 履约率目标覆写

    // ===== 财务条款 =====
    pub penalty_rate_percent: f64,     // 罚金费率(%)
    pub bonus_rate_percent: f64,       // 奖励费率(%)
    pub currency: String,              // 币种
    pub volume_commitment: f64,        // 采购量承诺(金额)
}

impl Contract {
    /// 判断合同在指定日期是否有效
    ///
    /// # 规则
    /// - 状态必须为 ACTIVE
    /// - 日期落在 [valid_from, valid_until) 区间内
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.status == ContractStatus::Active
            && date >= self.valid_from
            && date < self.valid_until
    }

    /// 判断合同有效区间与计算窗口 [start, end) 是否有交集
    pub fn overlaps_window(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.status == ContractStatus::Active
            && self.valid_from < end
            && self.valid_until > start
    }

    /// 距离到期的天数 (已到期为负)
    pub fn days_until_expiry(&self, as_of: NaiveDate) -> i64 {
        (self.valid_until - as_of).num_days()
    }
}

// ==========================================
// SeasonalRule - 季节性调整规则
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 2.3 季节性调整
// 月份集命中时对基准目标叠加增量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalRule {
    pub months: Vec<u32>,              // 适用月份集 (1-12)
    pub delivery_days_delta: i64,      // 交付天数增量
    pub tolerance_delta_percent: f64,  // 容差增量(%)
}

impl SeasonalRule {
    /// 判断规则是否命中指定日期所在月份
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.months.contains(&date.month())
    }
}

// ==========================================
// ProductSla - 产品级SLA覆写
// ==========================================
// 不变式: 每个 (contract, product) 至多一条生效记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSla {
    pub product_sla_id: String,        // 覆写记录ID
    pub contract_id: String,           // 所属合同
    pub product_id: String,            // 产品ID

    // ===== 目标覆写 (None 表示沿用合同默认) =====
    pub delivery_sla_days: Option<i64>,           // 交付天数覆写
    pub delivery_tolerance_percent: Option<f64>,  // 交付容差覆写
    pub quality_tolerance_percent: Option<f64>,   // 质量容差覆写
    pub quantity_accuracy_threshold: Option<f64>, // 数量准确率阈值覆写
    pub penalty_rate_percent: Option<f64>,        // 罚金费率覆写
    pub bonus_rate_percent: Option<f64>,          // 奖励费率覆写

    // ===== 季节性调整 =====
    pub peak_season: Option<SeasonalRule>,     // 旺季规则
    pub off_peak_season: Option<SeasonalRule>, // 淡季规则

    // ===== 附加条款 =====
    pub special_requirements: Vec<String>, // 特殊要求标记
    pub escalation_notice_days: i64,       // 升级提前量(天)
    pub measurement_period_days: i64,      // 测量周期长度(天)
    pub grace_period_days: i64,            // 宽限期(天)

    // ===== 自身有效性 =====
    pub effective_from: NaiveDate,     // 生效日(含)
    pub effective_until: NaiveDate,    // 失效日(不含)
    pub suspended: bool,               // 暂停标记
}

impl ProductSla {
    /// 判断覆写在指定日期是否生效
    ///
    /// # 规则
    /// - 未被暂停
    /// - 日期落在自身有效区间内
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        !self.suspended && date >= self.effective_from && date < self.effective_until
    }

    /// 宽限期结束日 (此前创建的订单不纳入产品级考核)
    pub fn grace_period_end(&self) -> NaiveDate {
        self.effective_from + chrono::Duration::days(self.grace_period_days)
    }
}
