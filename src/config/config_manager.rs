// ==========================================
// 合同履约与SLA绩效引擎 - 配置管理器
// ==========================================
// 依据: SLA_Engine_Specs_v0.2.md - 11. 配置项全集
// ==========================================
// 职责: 引擎调参配置的加载与查询
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// 批处理并发工作线程上限
    pub const MAX_PARALLEL_CONTRACTS: &str = "sla.max_parallel_contracts";
    /// 单指标持久化重试次数
    pub const PERSIST_RETRY_ATTEMPTS: &str = "sla.persist_retry_attempts";
    /// 履约率默认目标(%)
    pub const DEFAULT_FULFILLMENT_TARGET: &str = "sla.default_fulfillment_target";
    /// 提前交付奖励的最低占比
    pub const EARLY_BONUS_FRACTION: &str = "sla.early_bonus_fraction";
    /// 低置信样本量下限
    pub const LOW_CONFIDENCE_MIN_SAMPLE: &str = "sla.low_confidence_min_sample";
}

// ==========================================
// EngineConfig - 引擎运行配置快照
// ==========================================
/// 批处理启动时装载一次,运行期不再回读
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_parallel_contracts: usize,     // 并发合同数上限
    pub persist_retry_attempts: u32,       // 单指标持久化重试
    pub default_fulfillment_target: f64,   // 履约率默认目标
    pub early_bonus_fraction: f64,         // 提前交付奖励占比门槛
    pub low_confidence_min_sample: i64,    // 低置信样本量下限
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_contracts: 4,
            persist_retry_attempts: 3,
            default_fulfillment_target: 95.0,
            early_bonus_fraction: 0.25,
            low_confidence_min_sample: 5,
        }
    }
}

// ==========================================
// Trait: EngineConfigProvider
// ==========================================
// 用途: 聚合引擎的配置读取接口 (便于测试注入)
#[async_trait]
pub trait EngineConfigProvider: Send + Sync {
    /// 装载引擎运行配置 (缺失键回落默认值)
    async fn load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error + Send + Sync>>;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取浮点配置 (缺失或解析失败返回 None)
    fn get_f64(&self, key: &str) -> Result<Option<f64>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .get_config_value(key)?
            .and_then(|s| s.trim().parse::<f64>().ok()))
    }

    /// 读取整数配置 (缺失或解析失败返回 None)
    fn get_i64(&self, key: &str) -> Result<Option<i64>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .get_config_value(key)?
            .and_then(|s| s.trim().parse::<i64>().ok()))
    }
}

#[async_trait]
impl EngineConfigProvider for ConfigManager {
    async fn load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error + Send + Sync>> {
        let defaults = EngineConfig::default();
        Ok(EngineConfig {
            max_parallel_contracts: self
                .get_i64(config_keys::MAX_PARALLEL_CONTRACTS)?
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.max_parallel_contracts),
            persist_retry_attempts: self
                .get_i64(config_keys::PERSIST_RETRY_ATTEMPTS)?
                .map(|v| v.max(1) as u32)
                .unwrap_or(defaults.persist_retry_attempts),
            default_fulfillment_target: self
                .get_f64(config_keys::DEFAULT_FULFILLMENT_TARGET)?
                .unwrap_or(defaults.default_fulfillment_target),
            early_bonus_fraction: self
                .get_f64(config_keys::EARLY_BONUS_FRACTION)?
                .unwrap_or(defaults.early_bonus_fraction),
            low_confidence_min_sample: self
                .get_i64(config_keys::LOW_CONFIDENCE_MIN_SAMPLE)?
                .unwrap_or(defaults.low_confidence_min_sample),
        })
    }
}
