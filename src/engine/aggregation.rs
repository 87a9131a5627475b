// ==========================================
// 合同履约与SLA绩效引擎 - 聚合批处理引擎
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 9. Aggregation Engine
// ==========================================
// 职责: 全量合同考核编排 (装载 -> 计算 -> 分级 -> 财务 -> 趋势/升级 -> 落库)
// 并发: 合同间并行 (有界工作池),合同内先算完产品级再落库
// 红线: 单合同失败只跳过该合同; 单指标落库失败只丢该指标
// 红线: 同键 upsert 幂等,重算结果覆盖旧值但保留复核与升级标记
// ==========================================

use crate::config::EngineConfig;
use crate::domain::contract::Contract;
use crate::domain::metric::{MetricKey, PerformanceMetric};
use crate::domain::types::{MeasurementPeriod, MetricType};
use crate::engine::calculators::{
    DeliveryCalculator, FulfillmentCalculator, MeasurementWindow, QualityCalculator,
    QuantityAccuracyCalculator, RawSample,
};
use crate::engine::classifier::Classifier;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::escalation::EscalationEngine;
use crate::engine::financial::FinancialImpactCalculator;
use crate::engine::sla_resolver::{EffectiveTargets, SlaResolver};
use crate::engine::trend::TrendEngine;
use crate::repository::{ContractRepository, MetricRepository, OrderRepository};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::instrument;
use uuid::Uuid;

/// 指标溯源: 数据来源清单
const DATA_SOURCES: [&str; 2] = ["order_ledger", "contract_store"];

// ==========================================
// BatchRunSummary - 批处理运行摘要
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunSummary {
    pub run_id: String,                // 运行ID
    pub period_start: NaiveDate,       // 窗口起点
    pub period_end: NaiveDate,         // 窗口终点
    pub contracts_processed: usize,    // 成功处理的合同数
    pub contracts_failed: usize,       // 失败跳过的合同数
    pub metrics_written: usize,        // 落库指标数
    pub escalations_triggered: usize,  // 新触发升级数
    pub elapsed_ms: i64,               // 耗时(毫秒)
}

// ==========================================
// ContractCalcOutcome - 单合同计算结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ContractCalcOutcome {
    pub contract_id: String,           // 合同ID
    pub metrics_written: usize,        // 落库指标数
    pub escalations_triggered: usize,  // 新触发升级数
}

/// 待落库样本: (指标类型, 原始样本, 产品ID, 该作用域的生效目标)
type ScopedSample = (MetricType, RawSample, Option<String>, EffectiveTargets);

// ==========================================
// SlaAggregationEngine - 聚合批处理引擎
// ==========================================
#[derive(Clone)]
pub struct SlaAggregationEngine {
    contract_repo: Arc<ContractRepository>,
    order_repo: Arc<OrderRepository>,
    metric_repo: Arc<MetricRepository>,
}

impl SlaAggregationEngine {
    /// 构造函数
    pub fn new(
        contract_repo: Arc<ContractRepository>,
        order_repo: Arc<OrderRepository>,
        metric_repo: Arc<MetricRepository>,
    ) -> Self {
        Self {
            contract_repo,
            order_repo,
            metric_repo,
        }
    }

    // ==========================================
    // 批处理入口
    // ==========================================

    /// 全量合同考核
    ///
    /// # 流程
    /// 1. 装载有效区间与窗口相交的 ACTIVE 合同
    /// 2. 合同级并行计算 (Semaphore 限流 + spawn_blocking)
    /// 3. 汇总运行摘要
    ///
    /// # 语义
    /// - at-least-once: 中途放弃时已完成键的指标仍然有效
    /// - 单合同错误仅记录并跳过,不中断整批
    #[instrument(skip(self, config), fields(calculated_by = %calculated_by))]
    pub async fn calculate_all(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        period: MeasurementPeriod,
        calculated_by: &str,
        config: &EngineConfig,
    ) -> EngineResult<BatchRunSummary> {
        let window = MeasurementWindow::new(start, end).ok_or(EngineError::InvalidWindow {
            start: start.to_string(),
            end: end.to_string(),
        })?;

        let run_id = Uuid::new_v4().to_string();
        let started = std::time::Instant::now();

        let contracts = self.contract_repo.find_effective_in_window(start, end)?;
        tracing::info!(
            run_id = %run_id,
            contracts = contracts.len(),
            max_parallel = config.max_parallel_contracts,
            "开始全量合同考核"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_parallel_contracts));
        let mut handles = Vec::with_capacity(contracts.len());

        for contract in contracts {
            let engine = self.clone();
            let config = config.clone();
            let calculated_by = calculated_by.to_string();
            let semaphore = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| EngineError::TaskJoin(e.to_string()))?;
                tokio::task::spawn_blocking(move || {
                    engine.calculate_contract(&contract, &window, period, &calculated_by, &config)
                })
                .await
                .map_err(|e| EngineError::TaskJoin(e.to_string()))?
            }));
        }

        let mut summary = BatchRunSummary {
            run_id: run_id.clone(),
            period_start: start,
            period_end: end,
            contracts_processed: 0,
            contracts_failed: 0,
            metrics_written: 0,
            escalations_triggered: 0,
            elapsed_ms: 0,
        };

        for result in futures::future::join_all(handles).await {
            match result {
                Ok(Ok(outcome)) => {
                    summary.contracts_processed += 1;
                    summary.metrics_written += outcome.metrics_written;
                    summary.escalations_triggered += outcome.escalations_triggered;
                }
                Ok(Err(e)) => {
                    // 单合同致命错误: 记录并跳过
                    summary.contracts_failed += 1;
                    tracing::error!(run_id = %run_id, error = %e, "合同考核失败,已跳过");
                }
                Err(join_err) => {
                    summary.contracts_failed += 1;
                    tracing::error!(run_id = %run_id, error = %join_err, "考核任务异常终止");
                }
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis() as i64;
        tracing::info!(
            run_id = %run_id,
            processed = summary.contracts_processed,
            failed = summary.contracts_failed,
            metrics = summary.metrics_written,
            escalations = summary.escalations_triggered,
            elapsed_ms = summary.elapsed_ms,
            "全量合同考核完成"
        );
        Ok(summary)
    }

    // ==========================================
    // 单合同考核
    // ==========================================

    /// 计算单个合同在窗口内的全部指标并落库
    ///
    /// # 说明
    /// 同步函数,批处理在工作线程调用,测试可直接调用
    pub fn calculate_contract(
        &self,
        contract: &Contract,
        window: &MeasurementWindow,
        period: MeasurementPeriod,
        calculated_by: &str,
        config: &EngineConfig,
    ) -> EngineResult<ContractCalcOutcome> {
        validate_contract_config(contract)?;

        let resolver = SlaResolver::new();
        let delivery = DeliveryCalculator::new();
        let quality = QualityCalculator::new();
        let quantity = QuantityAccuracyCalculator::new();
        let fulfillment = FulfillmentCalculator::new();

        let orders = self.order_repo.find_by_supplier_created_in(
            &contract.supplier_id,
            window.start,
            window.end,
        )?;
        let average_order_value = if orders.is_empty() {
            0.0
        } else {
            orders.iter().map(|o| o.total_value).sum::<f64>() / orders.len() as f64
        };

        let mut samples: Vec<ScopedSample> = Vec::new();

        // 合同级指标
        let contract_targets = resolver.resolve(contract, None, window.start);
        if let Some(raw) = delivery.compute(&contract_targets, &orders, window) {
            samples.push((
                MetricType::DeliveryPerformance,
                raw,
                None,
                contract_targets.clone(),
            ));
        }
        if let Some(raw) = quality.compute(&contract_targets, &orders, window) {
            samples.push((
                MetricType::QualityPerformance,
                raw,
                None,
                contract_targets.clone(),
            ));
        }
        if let Some(raw) = quantity.compute(&contract_targets, &orders, window) {
            samples.push((
                MetricType::QuantityAccuracy,
                raw,
                None,
                contract_targets.clone(),
            ));
        }
        if let Some(raw) =
            fulfillment.compute(contract, config.default_fulfillment_target, &orders, window)
        {
            samples.push((
                MetricType::OrderFulfillmentRate,
                raw,
                None,
                contract_targets.clone(),
            ));
        }

        // 产品级指标 (履约率不做产品拆分)
        let product_slas = self.contract_repo.find_product_slas(&contract.contract_id)?;
        for sla in product_slas.iter().filter(|s| s.is_effective_on(window.start)) {
            let targets = resolver.resolve(contract, Some(sla), window.start);
            let grace_end = (sla.grace_period_days > 0).then(|| sla.grace_period_end());

            if let Some(raw) = delivery.compute_for_product(
                &targets,
                &orders,
                window,
                &sla.product_id,
                grace_end,
            ) {
                samples.push((
                    MetricType::DeliveryPerformance,
                    raw,
                    Some(sla.product_id.clone()),
                    targets.clone(),
                ));
            }
            if let Some(raw) = quality.compute_for_product(
                &targets,
                &orders,
                window,
                &sla.product_id,
                grace_end,
            ) {
                samples.push((
                    MetricType::QualityPerformance,
                    raw,
                    Some(sla.product_id.clone()),
                    targets.clone(),
                ));
            }
            if let Some(raw) = quantity.compute_for_product(
                &targets,
                &orders,
                window,
                &sla.product_id,
                grace_end,
            ) {
                samples.push((
                    MetricType::QuantityAccuracy,
                    raw,
                    Some(sla.product_id.clone()),
                    targets.clone(),
                ));
            }
        }

        // 分级 -> 财务 -> 趋势 -> 升级 -> 落库
        let mut outcome = ContractCalcOutcome {
            contract_id: contract.contract_id.clone(),
            metrics_written: 0,
            escalations_triggered: 0,
        };

        for (metric_type, raw, product_id, targets) in samples {
            let (metric, escalated) = self.assemble_metric(
                contract,
                product_id,
                metric_type,
                &raw,
                &targets,
                window,
                period,
                calculated_by,
                average_order_value,
                config,
            )?;

            // 单指标粒度重试; 最终失败只丢该指标
            match self
                .metric_repo
                .upsert_with_retry(&metric, config.persist_retry_attempts)
            {
                Ok(_) => {
                    outcome.metrics_written += 1;
                    if escalated {
                        outcome.escalations_triggered += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        contract_id = %contract.contract_id,
                        metric_type = %metric_type,
                        error = %e,
                        "指标落库最终失败,其余指标不受影响"
                    );
                }
            }
        }

        tracing::debug!(
            contract_id = %contract.contract_id,
            metrics = outcome.metrics_written,
            "单合同考核完成"
        );
        Ok(outcome)
    }

    // ==========================================
    // 指标装配
    // ==========================================

    /// 由原始样本装配完整指标行
    #[allow(clippy::too_many_arguments)]
    fn assemble_metric(
        &self,
        contract: &Contract,
        product_id: Option<String>,
        metric_type: MetricType,
        raw: &RawSample,
        targets: &EffectiveTargets,
        window: &MeasurementWindow,
        period: MeasurementPeriod,
        calculated_by: &str,
        average_order_value: f64,
        config: &EngineConfig,
    ) -> EngineResult<(PerformanceMetric, bool)> {
        let classifier = Classifier::new();
        let financial = FinancialImpactCalculator::new();
        let trend_engine = TrendEngine::new();
        let escalation_engine = EscalationEngine::new();

        let key = MetricKey {
            contract_id: contract.contract_id.clone(),
            product_id: product_id.clone(),
            metric_type,
            period_start: window.start,
            period_end: window.end,
        };

        let classification = classifier.classify(metric_type, raw);
        let impact = financial.compute_impact(
            metric_type,
            raw,
            targets,
            average_order_value,
            config.early_bonus_fraction,
        );

        // 趋势: 同键上一周期 + 滚动均值 (均不含本周期旧行,保证重算幂等)
        let previous = self.metric_repo.find_previous_period(&key)?;
        let previous_actual = previous.as_ref().map(|m| m.actual_value);
        let trend_direction =
            trend_engine.classify_trend(metric_type, raw.actual_value, previous_actual);
        let recent_actuals = self.metric_repo.find_recent_actuals(&key, 11)?;
        let rolling_avg_3 = trend_engine.rolling_average(raw.actual_value, &recent_actuals, 3);
        let rolling_avg_12 = trend_engine.rolling_average(raw.actual_value, &recent_actuals, 12);

        // 升级判定需要知道该键是否已触发过
        let already_triggered = self
            .metric_repo
            .find_by_key(&key)?
            .map(|m| m.escalation_triggered)
            .unwrap_or(false);

        let now = Utc::now().naive_utc();
        let mut metric = PerformanceMetric {
            metric_id: Uuid::new_v4().to_string(),
            contract_id: contract.contract_id.clone(),
            product_id,
            source_order_id: None,
            metric_type,
            period,
            period_start: window.start,
            period_end: window.end,
            target_value: raw.target_value,
            actual_value: raw.actual_value,
            variance: classification.variance,
            variance_percent: classification.variance_percent,
            status: classification.status,
            performance_score: classification.performance_score,
            sample_size: raw.sample_size,
            total_events: raw.total_events,
            successful_events: raw.successful_events,
            failed_events: raw.failed_events,
            penalties_applied: impact.penalties,
            bonuses_earned: impact.bonuses,
            net_financial_impact: impact.net_impact,
            trend_direction,
            previous_period_value: previous_actual,
            rolling_avg_3,
            rolling_avg_12,
            escalation_level: 0,
            escalation_triggered: false,
            escalation_date: None,
            requires_action: false,
            action_deadline: None,
            calculation_method: calculation_method_for(metric_type).to_string(),
            data_sources: DATA_SOURCES.iter().map(|s| s.to_string()).collect(),
            calculated_at: now,
            calculated_by: calculated_by.to_string(),
            low_confidence: raw.sample_size < config.low_confidence_min_sample,
            reviewed: false,
            reviewed_by: None,
            review_notes: None,
        };

        let mut escalated = false;
        if escalation_engine.should_escalate(classification.severity, already_triggered) {
            escalation_engine.trigger_escalation(
                &mut metric,
                classification.severity,
                now,
                None,
            );
            escalated = true;
        }

        Ok((metric, escalated))
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 合同配置有效性校验 (单合同致命错误)
fn validate_contract_config(contract: &Contract) -> EngineResult<()> {
    if contract.delivery_sla_days <= 0 {
        return Err(EngineError::InvalidContractConfig {
            contract_id: contract.contract_id.clone(),
            message: format!("交付天数目标必须为正: {}", contract.delivery_sla_days),
        });
    }
    if contract.penalty_rate_percent < 0.0 || contract.bonus_rate_percent < 0.0 {
        return Err(EngineError::InvalidContractConfig {
            contract_id: contract.contract_id.clone(),
            message: "罚金/奖励费率不得为负".to_string(),
        });
    }
    if contract.valid_from >= contract.valid_until {
        return Err(EngineError::InvalidContractConfig {
            contract_id: contract.contract_id.clone(),
            message: "合同有效区间为空".to_string(),
        });
    }
    Ok(())
}

/// 指标类型对应的计算方法标签 (溯源用)
fn calculation_method_for(metric_type: MetricType) -> &'static str {
    match metric_type {
        MetricType::DeliveryPerformance => "ON_TIME_RATIO",
        MetricType::QualityPerformance => "DEFECT_FREE_RATIO",
        MetricType::QuantityAccuracy => "QTY_ACCURACY_BAND_RATIO",
        MetricType::OrderFulfillmentRate => "TERMINAL_STATE_RATIO",
        MetricType::ResponseTime => "RESPONSE_HOURS_AVG",
        MetricType::PackagingCompliance => "COMPLIANT_RATIO",
        MetricType::DocumentationCompleteness => "COMPLETE_RATIO",
    }
}
