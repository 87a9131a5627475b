// ==========================================
// 合同履约与SLA绩效引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 单合同的致命错误只跳过该合同,不得中断整批
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("无效的计算窗口: start={start} end={end}")]
    InvalidWindow { start: String, end: String },

    #[error("合同配置无效 (contract_id={contract_id}): {message}")]
    InvalidContractConfig {
        contract_id: String,
        message: String,
    },

    #[error("配置装载失败: {0}")]
    ConfigLoad(String),

    #[error("批处理任务失败: {0}")]
    TaskJoin(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
