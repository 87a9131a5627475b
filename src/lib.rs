// ==========================================
// 合同履约与SLA绩效引擎 - 核心库
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - 系统宪法
// 技术栈: Rust + SQLite + Tokio
// 系统定位: 供应商考核批处理引擎 (决策支持,人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 考核业务规则
pub mod engine;

// 配置层 - 引擎调参
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 报表与驾驶舱
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ContractStatus, MeasurementPeriod, MetricDirection, MetricType, OrderStatus,
    PerformanceStatus, ReportStatus, Severity, TrendDirection,
};

// 领域实体
pub use domain::{
    Contract, MetricKey, OrderLineItem, OrderRecord, PerformanceMetric, ProductSla, SeasonalRule,
};

// 引擎
pub use engine::{
    BatchRunSummary, Classifier, DeliveryCalculator, EscalationEngine, FinancialImpactCalculator,
    FulfillmentCalculator, MeasurementWindow, QualityCalculator, QuantityAccuracyCalculator,
    SlaAggregationEngine, SlaResolver, TrendEngine,
};

// API
pub use api::{DashboardApi, SlaReportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "合同履约与SLA绩效引擎";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================
