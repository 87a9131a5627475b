// ==========================================
// 合同履约与SLA绩效引擎 - 驾驶舱 API
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART G 驾驶舱
// 职责: 对当月已落库指标与合同有效期做纯只读聚合
// 红线: 驾驶舱查询不触发任何重算
// 架构: API 层 -> Repository 层
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::types::{MetricType, PerformanceStatus};
use crate::repository::{ContractRepository, MetricRepository};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 到期提醒窗口 (天)
const EXPIRY_NOTICE_DAYS: i64 = 30;

/// "优秀合同"的当月均分门槛
const EXCELLENT_SCORE_CUTOFF: f64 = 95.0;

// ==========================================
// DashboardMetrics - 驾驶舱指标集
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub as_of: NaiveDate,                      // 基准日期
    pub month_start: NaiveDate,                // 当月窗口起点
    pub month_end: NaiveDate,                  // 当月窗口终点(不含)
    pub active_contracts: i64,                 // 生效合同数
    pub at_risk_contracts: i64,                // 风险合同数 (当月出现违约档位)
    pub excellent_contracts: i64,              // 优秀合同数 (当月均分>=95)
    pub penalties_this_month: f64,             // 当月罚金合计
    pub bonuses_this_month: f64,               // 当月奖励合计
    pub avg_delivery_performance: Option<f64>, // 当月交付绩效均值 (无样本为 None)
    pub avg_quality_performance: Option<f64>,  // 当月质量绩效均值 (无样本为 None)
    pub pending_escalations: i64,              // 待处理升级数
    pub expiring_within_30_days: i64,          // 30天内到期合同数
}

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================
pub struct DashboardApi {
    contract_repo: Arc<ContractRepository>,
    metric_repo: Arc<MetricRepository>,
}

impl DashboardApi {
    /// 创建新的 DashboardApi 实例
    pub fn new(
        contract_repo: Arc<ContractRepository>,
        metric_repo: Arc<MetricRepository>,
    ) -> Self {
        Self {
            contract_repo,
            metric_repo,
        }
    }

    /// 生成驾驶舱指标集 (以今天为基准)
    pub fn dashboard_metrics(&self) -> ApiResult<DashboardMetrics> {
        self.dashboard_metrics_as_of(chrono::Local::now().date_naive())
    }

    /// 生成驾驶舱指标集 (指定基准日期,测试注入用)
    ///
    /// # 说明
    /// 纯读聚合: 无样本的合同不产生指标行,自然不进入均值分母
    pub fn dashboard_metrics_as_of(&self, as_of: NaiveDate) -> ApiResult<DashboardMetrics> {
        let (month_start, month_end) = month_window(as_of);

        let active = self.contract_repo.find_active_on(as_of)?;
        let active_contracts = active.len() as i64;
        let expiring_within_30_days = active
            .iter()
            .filter(|c| {
                let days = c.days_until_expiry(as_of);
                days > 0 && days <= EXPIRY_NOTICE_DAYS
            })
            .count() as i64;

        let at_risk_contracts = self
            .metric_repo
            .contract_ids_with_status_at_least(PerformanceStatus::Breach, month_start, month_end)?
            .len() as i64;

        let excellent_contracts = self
            .metric_repo
            .avg_score_by_contract_in(month_start, month_end)?
            .iter()
            .filter(|(_, score)| *score >= EXCELLENT_SCORE_CUTOFF)
            .count() as i64;

        let (penalties_this_month, bonuses_this_month) =
            self.metric_repo.sum_financials_in(month_start, month_end)?;

        let avg_delivery_performance = self.metric_repo.avg_actual_for_type_in(
            MetricType::DeliveryPerformance,
            month_start,
            month_end,
        )?;
        let avg_quality_performance = self.metric_repo.avg_actual_for_type_in(
            MetricType::QualityPerformance,
            month_start,
            month_end,
        )?;

        let pending_escalations = self.metric_repo.find_pending_escalations(None)?.len() as i64;

        Ok(DashboardMetrics {
            as_of,
            month_start,
            month_end,
            active_contracts,
            at_risk_contracts,
            excellent_contracts,
            penalties_this_month,
            bonuses_this_month,
            avg_delivery_performance,
            avg_quality_performance,
            pending_escalations,
            expiring_within_30_days,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 基准日期所在自然月的 [月初, 次月初) 窗口
fn month_window(as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
    let month_start = as_of
        .with_day(1)
        .unwrap_or(as_of);
    let month_end = if as_of.month() == 12 {
        NaiveDate::from_ymd_opt(as_of.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(as_of.year(), as_of.month() + 1, 1)
    }
    .unwrap_or(month_start);
    (month_start, month_end)
}
