//! 控制器配置
//!
//! 以 JSON 文件提供，所有字段都有默认值：
//!
//! ```json
//! { "k": 4, "flow_priority": 10, "addressing": { "prefix": 10 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::topo::addressing::{AddressPlan, COORD_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// fat-tree 端口数
    pub k: usize,
    pub addressing: AddressPlan,
    /// 路径/主机规则优先级
    pub flow_priority: u16,
    /// table-miss 规则优先级
    pub table_miss_priority: u16,
    /// 仿真数据面上单个报文最多经过的交换机数
    pub max_hops: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            k: 4,
            addressing: AddressPlan::default(),
            flow_priority: 10,
            table_miss_priority: 0,
            max_hops: 64,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: ControllerConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 || self.k % 2 != 0 || self.k > COORD_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "k must be an even number in 2..={COORD_LIMIT}, got {}",
                self.k
            )));
        }
        // pod 与 edge 占据第 2、3 字节，短于 /24 的规则会覆盖多台 edge 交换机
        if !(24..=32).contains(&self.addressing.subnet_prefix_len) {
            return Err(ConfigError::Invalid(format!(
                "subnet_prefix_len must be in 24..=32, got {}",
                self.addressing.subnet_prefix_len
            )));
        }
        if self.flow_priority <= self.table_miss_priority {
            return Err(ConfigError::Invalid(
                "flow_priority must be above table_miss_priority".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(ConfigError::Invalid("max_hops must be positive".to_string()));
        }
        Ok(())
    }
}
