// ==========================================
// 合同履约与SLA绩效引擎 - API 层
// ==========================================
// 职责: 对外只读报表接口
// 红线: API 层不触发重算,只消费已落库指标
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod report_api;

pub use dashboard_api::{DashboardApi, DashboardMetrics};
pub use error::{ApiError, ApiResult};
pub use report_api::{ContractPerformanceReport, EscalationItem, SlaReportApi};
