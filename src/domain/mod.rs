// ==========================================
// 合同履约与SLA绩效引擎 - 领域层
// ==========================================
// 依据: Supplier_SLA_Master_Spec.md - PART B/C/D/E
// 红线: 领域层不依赖仓储与引擎
// ==========================================

pub mod contract;
pub mod metric;
pub mod order;
pub mod types;

// 重导出核心实体
pub use contract::{Contract, ProductSla, SeasonalRule};
pub use metric::{MetricKey, PerformanceMetric};
pub use order::{OrderLineItem, OrderRecord};
