// ==========================================
// 合同履约与SLA绩效引擎 - API层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("无效的输入: {0}")]
    InvalidInput(String),

    #[error("记录未找到: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
