// ==========================================
// 合同履约与SLA绩效引擎 - 合同绩效报表 API
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 9.2 合同报表
// 职责: 对已落库指标做只读聚合,不触发任何重算
// 架构: API 层 -> Repository 层
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::metric::PerformanceMetric;
use crate::domain::types::{MetricType, PerformanceStatus, ReportStatus};
use crate::repository::{ContractRepository, MetricRepository};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 报表默认回看窗口 (天)
const DEFAULT_REPORT_WINDOW_DAYS: i64 = 90;

/// 续约提醒提前量 (天)
const RENEWAL_NOTICE_DAYS: i64 = 60;

// ==========================================
// 总评档位阈值表 (降序扫描,首个命中生效)
// ==========================================
const REPORT_STATUS_BANDS: [(f64, ReportStatus); 3] = [
    (95.0, ReportStatus::Excellent),
    (85.0, ReportStatus::Good),
    (70.0, ReportStatus::NeedsAttention),
];

/// 按总评分查档
fn report_status_for(overall_score: f64) -> ReportStatus {
    REPORT_STATUS_BANDS
        .iter()
        .find(|(cutoff, _)| overall_score >= *cutoff)
        .map(|(_, status)| *status)
        .unwrap_or(ReportStatus::Critical)
}

// ==========================================
// EscalationItem - 报表升级条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationItem {
    pub metric_type: MetricType,            // 指标类型
    pub product_id: Option<String>,         // 产品ID
    pub period_start: NaiveDate,            // 所属周期
    pub level: i32,                         // 升级等级
    pub reason: String,                     // 升级原因 (可解释)
    pub action_deadline: Option<NaiveDate>, // 处理截止日
}

// ==========================================
// ContractPerformanceReport - 合同绩效报表
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractPerformanceReport {
    pub contract_id: String,               // 合同ID
    pub supplier_id: String,               // 供应商ID
    pub period_start: NaiveDate,           // 查询窗口起点
    pub period_end: NaiveDate,             // 查询窗口终点
    pub overall_score: f64,                // 总评分 (指标得分均值)
    pub status: ReportStatus,              // 总评档位
    pub total_penalties: f64,              // 罚金合计
    pub total_bonuses: f64,                // 奖励合计
    pub net_impact: f64,                   // 净财务影响
    pub metrics: Vec<PerformanceMetric>,   // 明细指标
    pub recommendations: Vec<String>,      // 管理建议
    pub escalations: Vec<EscalationItem>,  // 待处理升级
    pub generated_at: NaiveDateTime,       // 报表生成时间
}

// ==========================================
// SlaReportApi - 合同绩效报表 API
// ==========================================
pub struct SlaReportApi {
    contract_repo: Arc<ContractRepository>,
    metric_repo: Arc<MetricRepository>,
}

impl SlaReportApi {
    /// 创建新的 SlaReportApi 实例
    pub fn new(
        contract_repo: Arc<ContractRepository>,
        metric_repo: Arc<MetricRepository>,
    ) -> Self {
        Self {
            contract_repo,
            metric_repo,
        }
    }

    /// 生成合同绩效报表
    ///
    /// # 参数
    /// - `contract_id`: 合同ID
    /// - `period_start`/`period_end`: 查询窗口,缺省取近90天
    ///
    /// # 返回
    /// - Ok(ContractPerformanceReport)
    /// - Err(ApiError::NotFound): 合同不存在
    pub fn contract_performance_report(
        &self,
        contract_id: &str,
        period_start: Option<NaiveDate>,
        period_end: Option<NaiveDate>,
    ) -> ApiResult<ContractPerformanceReport> {
        if contract_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("合同ID不能为空".to_string()));
        }

        let contract = self
            .contract_repo
            .find_by_id(contract_id)?
            .ok_or_else(|| ApiError::NotFound(format!("合同 {}", contract_id)))?;

        let today = chrono::Local::now().date_naive();
        // 窗口终点取"明日零点"使当日指标可见
        let end = period_end.unwrap_or(today + Duration::days(1));
        let start = period_start.unwrap_or(end - Duration::days(DEFAULT_REPORT_WINDOW_DAYS));
        if start >= end {
            return Err(ApiError::InvalidInput(format!(
                "无效的查询窗口: {} >= {}",
                start, end
            )));
        }

        let metrics = self
            .metric_repo
            .find_by_contract_in_range(contract_id, start, end)?;

        let overall_score = if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(|m| m.performance_score).sum::<f64>() / metrics.len() as f64
        };
        let status = report_status_for(overall_score);

        let total_penalties: f64 = metrics.iter().map(|m| m.penalties_applied).sum();
        let total_bonuses: f64 = metrics.iter().map(|m| m.bonuses_earned).sum();

        let recommendations = build_recommendations(
            contract.volume_commitment,
            total_penalties,
            &metrics,
            contract.days_until_expiry(today),
        );

        let escalations = metrics
            .iter()
            .filter(|m| m.is_escalation_pending())
            .map(|m| EscalationItem {
                metric_type: m.metric_type,
                product_id: m.product_id.clone(),
                period_start: m.period_start,
                level: m.escalation_level,
                reason: format!(
                    "{} 档位 {},偏差率 {:.1}%",
                    m.metric_type, m.status, m.variance_percent
                ),
                action_deadline: m.action_deadline,
            })
            .collect();

        Ok(ContractPerformanceReport {
            contract_id: contract.contract_id,
            supplier_id: contract.supplier_id,
            period_start: start,
            period_end: end,
            overall_score,
            status,
            total_penalties,
            total_bonuses,
            net_impact: total_bonuses - total_penalties,
            metrics,
            recommendations,
            escalations,
            generated_at: chrono::Utc::now().naive_utc(),
        })
    }
}

// ==========================================
// 管理建议规则 (固定规则表)
// ==========================================

/// 依据明细指标与财务合计生成管理建议
///
/// # 规则
/// 1. 交付指标出现 BREACH/CRITICAL: 建议重谈交付SLA并加强交付监控
/// 2. 质量指标出现 BREACH/CRITICAL: 建议质量审计并收紧验收标准
/// 3. 罚金超过采购量承诺的1%: 建议重谈合同或评估更换供应商
/// 4. 合同临近到期 (60天内): 建议启动续约流程
fn build_recommendations(
    volume_commitment: f64,
    total_penalties: f64,
    metrics: &[PerformanceMetric],
    days_until_expiry: i64,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let has_breach = |metric_type: MetricType| {
        metrics
            .iter()
            .any(|m| m.metric_type == metric_type && m.status >= PerformanceStatus::Breach)
    };

    if has_breach(MetricType::DeliveryPerformance) {
        recommendations.push("交付绩效持续违约,建议重新谈判交付SLA条款并加强到货监控".to_string());
    }
    if has_breach(MetricType::QualityPerformance) {
        recommendations.push("质量绩效违约,建议启动供应商质量审计并收紧验收标准".to_string());
    }
    if volume_commitment > 0.0 && total_penalties > volume_commitment * 0.01 {
        recommendations.push("累计罚金已超过采购量承诺的1%,建议重新谈判合同或评估更换供应商".to_string());
    }
    if days_until_expiry > 0 && days_until_expiry <= RENEWAL_NOTICE_DAYS {
        recommendations.push(format!(
            "合同将于 {} 天后到期,建议启动续约评审流程",
            days_until_expiry
        ));
    }

    recommendations
}
