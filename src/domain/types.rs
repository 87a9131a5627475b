// ==========================================
// 合同履约与SLA绩效引擎 - 领域类型定义
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART B 指标体系
// 依据: SLA_Engine_Specs_v0.2.md - 0.2 指标类型与等级
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 合同状态 (Contract Status)
// ==========================================
// 生命周期: Draft -> Active -> Suspended/Expired/Terminated
// 红线: Terminated 为终态,不可再变更
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Draft,      // 草稿
    Active,     // 生效
    Suspended,  // 暂停
    Expired,    // 到期
    Terminated, // 终止
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ContractStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ACTIVE" => ContractStatus::Active,
            "SUSPENDED" => ContractStatus::Suspended,
            "EXPIRED" => ContractStatus::Expired,
            "TERMINATED" => ContractStatus::Terminated,
            _ => ContractStatus::Draft, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "DRAFT",
            ContractStatus::Active => "ACTIVE",
            ContractStatus::Suspended => "SUSPENDED",
            ContractStatus::Expired => "EXPIRED",
            ContractStatus::Terminated => "TERMINATED",
        }
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 外部订单台账的只读事实,引擎不做状态迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,   // 待确认
    Confirmed, // 已确认
    Shipped,   // 已发货
    Delivered, // 已送达
    Received,  // 已收货 (终态)
    Closed,    // 已关闭 (终态)
    Cancelled, // 已取消
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CONFIRMED" => OrderStatus::Confirmed,
            "SHIPPED" => OrderStatus::Shipped,
            "DELIVERED" => OrderStatus::Delivered,
            "RECEIVED" => OrderStatus::Received,
            "CLOSED" => OrderStatus::Closed,
            "CANCELLED" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Closed => "CLOSED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否到达履约终态 (已收货/已关闭)
    pub fn is_terminal_fulfilled(&self) -> bool {
        matches!(self, OrderStatus::Received | OrderStatus::Closed)
    }
}

// ==========================================
// 指标方向 (Metric Direction)
// ==========================================
// 分级与趋势比较均依赖方向语义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricDirection {
    HigherIsBetter, // 越高越好 (准时率/合格率类)
    LowerIsBetter,  // 越低越好 (响应时长类)
}

// ==========================================
// 指标类型 (Metric Type)
// ==========================================
// 红线: 封闭枚举,禁止散落的字符串分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    DeliveryPerformance,       // 交付绩效
    QualityPerformance,        // 质量绩效
    QuantityAccuracy,          // 数量准确率
    OrderFulfillmentRate,      // 订单履约率
    ResponseTime,              // 响应时长
    PackagingCompliance,       // 包装合规
    DocumentationCompleteness, // 单证完备
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl MetricType {
    /// 从字符串解析指标类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DELIVERY_PERFORMANCE" => Some(MetricType::DeliveryPerformance),
            "QUALITY_PERFORMANCE" => Some(MetricType::QualityPerformance),
            "QUANTITY_ACCURACY" => Some(MetricType::QuantityAccuracy),
            "ORDER_FULFILLMENT_RATE" => Some(MetricType::OrderFulfillmentRate),
            "RESPONSE_TIME" => Some(MetricType::ResponseTime),
            "PACKAGING_COMPLIANCE" => Some(MetricType::PackagingCompliance),
            "DOCUMENTATION_COMPLETENESS" => Some(MetricType::DocumentationCompleteness),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MetricType::DeliveryPerformance => "DELIVERY_PERFORMANCE",
            MetricType::QualityPerformance => "QUALITY_PERFORMANCE",
            MetricType::QuantityAccuracy => "QUANTITY_ACCURACY",
            MetricType::OrderFulfillmentRate => "ORDER_FULFILLMENT_RATE",
            MetricType::ResponseTime => "RESPONSE_TIME",
            MetricType::PackagingCompliance => "PACKAGING_COMPLIANCE",
            MetricType::DocumentationCompleteness => "DOCUMENTATION_COMPLETENESS",
        }
    }

    /// 指标方向语义
    pub fn direction(&self) -> MetricDirection {
        match self {
            MetricType::ResponseTime => MetricDirection::LowerIsBetter,
            _ => MetricDirection::HigherIsBetter,
        }
    }

    /// EXCELLENT 档的超额幅度
    ///
    /// # 规则
    /// - 质量/数量类指标阈值更紧: +2
    /// - 其余指标: +5
    pub fn excellent_margin(&self) -> f64 {
        match self {
            MetricType::QualityPerformance | MetricType::QuantityAccuracy => 2.0,
            _ => 5.0,
        }
    }
}

// ==========================================
// 绩效状态档位 (Performance Status)
// ==========================================
// 顺序: Excellent < Good < Warning < Breach < Critical (越大越差)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceStatus {
    Excellent, // 优秀
    Good,      // 达标
    Warning,   // 预警
    Breach,    // 违约
    Critical,  // 严重违约
}

impl fmt::Display for PerformanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PerformanceStatus {
    /// 从字符串解析状态档位
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "EXCELLENT" => PerformanceStatus::Excellent,
            "GOOD" => PerformanceStatus::Good,
            "WARNING" => PerformanceStatus::Warning,
            "BREACH" => PerformanceStatus::Breach,
            _ => PerformanceStatus::Critical,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PerformanceStatus::Excellent => "EXCELLENT",
            PerformanceStatus::Good => "GOOD",
            PerformanceStatus::Warning => "WARNING",
            PerformanceStatus::Breach => "BREACH",
            PerformanceStatus::Critical => "CRITICAL",
        }
    }

    /// 是否在SLA允许范围内 (Excellent/Good)
    pub fn is_within_sla(&self) -> bool {
        matches!(self, PerformanceStatus::Excellent | PerformanceStatus::Good)
    }
}

// ==========================================
// 严重度 (Severity)
// ==========================================
// 顺序: Low < Medium < High < Critical,用于升级门控
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,      // 正常波动
    Medium,   // 轻度偏离
    High,     // 重度偏离
    Critical, // 严重偏离
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 趋势方向 (Trend Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Improving, // 改善
    Stable,    // 平稳
    Declining, // 恶化
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl TrendDirection {
    /// 从字符串解析趋势方向
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IMPROVING" => TrendDirection::Improving,
            "DECLINING" => TrendDirection::Declining,
            _ => TrendDirection::Stable,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "IMPROVING",
            TrendDirection::Stable => "STABLE",
            TrendDirection::Declining => "DECLINING",
        }
    }
}

// ==========================================
// 测量周期 (Measurement Period)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementPeriod {
    Daily,     // 日
    Weekly,    // 周
    Monthly,   // 月
    Quarterly, // 季
    Annual,    // 年
}

impl fmt::Display for MeasurementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl MeasurementPeriod {
    /// 从字符串解析测量周期
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "DAILY" => MeasurementPeriod::Daily,
            "WEEKLY" => MeasurementPeriod::Weekly,
            "QUARTERLY" => MeasurementPeriod::Quarterly,
            "ANNUAL" => MeasurementPeriod::Annual,
            _ => MeasurementPeriod::Monthly, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MeasurementPeriod::Daily => "DAILY",
            MeasurementPeriod::Weekly => "WEEKLY",
            MeasurementPeriod::Monthly => "MONTHLY",
            MeasurementPeriod::Quarterly => "QUARTERLY",
            MeasurementPeriod::Annual => "ANNUAL",
        }
    }
}

// ==========================================
// 报表总评档位 (Report Status)
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 9.2 合同报表
// 与指标档位区分: 报表档位含 NEEDS_ATTENTION
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Excellent,      // >= 95
    Good,           // >= 85
    NeedsAttention, // >= 70
    Critical,       // < 70
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Excellent => write!(f, "EXCELLENT"),
            ReportStatus::Good => write!(f, "GOOD"),
            ReportStatus::NeedsAttention => write!(f, "NEEDS_ATTENTION"),
            ReportStatus::Critical => write!(f, "CRITICAL"),
        }
    }
}
