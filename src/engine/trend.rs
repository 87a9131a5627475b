// ==========================================
// 合同履约与SLA绩效引擎 - 趋势引擎
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 8. Trend Engine
// ==========================================
// 职责: 与上一周期比较分类趋势方向 + 滚动均值平滑
// ==========================================

use crate::domain::types::{MetricDirection, MetricType, TrendDirection};

/// 趋势判定的平稳区间 (|变化率| < 5% 记 STABLE)
const STABLE_CHANGE_PERCENT: f64 = 5.0;

// ==========================================
// TrendEngine - 趋势引擎
// ==========================================
pub struct TrendEngine {
    // 无状态引擎
}

impl TrendEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 分类趋势方向
    ///
    /// # 规则
    /// - 无上期数据: STABLE
    /// - |变化率| < 5%: STABLE
    /// - 其余按指标方向判定改善/恶化
    /// - 上期为 0 时变化率不可计算,按 STABLE 处理
    pub fn classify_trend(
        &self,
        metric_type: MetricType,
        current_actual: f64,
        previous_actual: Option<f64>,
    ) -> TrendDirection {
        let previous = match previous_actual {
            Some(v) => v,
            None => return TrendDirection::Stable,
        };
        if previous == 0.0 {
            return TrendDirection::Stable;
        }

        let change_percent = (current_actual - previous) / previous * 100.0;
        if change_percent.abs() < STABLE_CHANGE_PERCENT {
            return TrendDirection::Stable;
        }

        let rising = change_percent > 0.0;
        match metric_type.direction() {
            MetricDirection::HigherIsBetter => {
                if rising {
                    TrendDirection::Improving
                } else {
                    TrendDirection::Declining
                }
            }
            MetricDirection::LowerIsBetter => {
                if rising {
                    TrendDirection::Declining
                } else {
                    TrendDirection::Improving
                }
            }
        }
    }

    /// 滚动均值: 当期实际值 + 此前至多 n-1 期实际值的平均
    ///
    /// # 参数
    /// - `prior_actuals`: 按周期起点降序排列的历史实际值
    pub fn rolling_average(&self, current_actual: f64, prior_actuals: &[f64], n: usize) -> f64 {
        let take = n.saturating_sub(1).min(prior_actuals.len());
        let sum: f64 = current_actual + prior_actuals[..take].iter().sum::<f64>();
        sum / (take + 1) as f64
    }
}

impl Default for TrendEngine {
    fn default() -> Self {
        Self::new()
    }
}
