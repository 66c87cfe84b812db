// crates/bf_config/src/simulation.rs

//! 根配置与 JSON 读写

use crate::error::ConfigError;
use crate::partition::PartitionConfig;
use crate::routing::FormulationConfig;
use crate::topology::TopologyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 模拟根配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 模拟步数
    #[serde(default = "default_n_steps")]
    pub n_steps: u64,

    /// 时间步长 [s]
    #[serde(default = "default_dt")]
    pub dt_s: f64,

    /// 各步输入水量 [m]；长度不足时以 0 补齐
    #[serde(default)]
    pub input_series_m: Vec<f64>,

    /// 产流公式参数（全部流域单元共用）
    #[serde(default)]
    pub formulation: FormulationConfig,

    /// 流域拓扑
    #[serde(default)]
    pub topology: TopologyConfig,

    /// 分区描述（仅跨进程运行需要）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionConfig>,
}

fn default_n_steps() -> u64 {
    24
}
fn default_dt() -> f64 {
    3600.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_steps: default_n_steps(),
            dt_s: default_dt(),
            input_series_m: Vec::new(),
            formulation: FormulationConfig::default(),
            topology: TopologyConfig::default(),
            partition: None,
        }
    }
}

impl SimulationConfig {
    /// 从 JSON 文件读取
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// 写入 JSON 文件
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// 校验全部子配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dt_s <= 0.0 {
            return Err(ConfigError::invalid("dt_s", self.dt_s, "必须为正"));
        }
        if self.n_steps == 0 {
            return Err(ConfigError::invalid("n_steps", self.n_steps, "不得为 0"));
        }
        self.formulation.validate()?;
        self.topology.validate()?;
        if let Some(partition) = &self.partition {
            partition.validate()?;
        }
        Ok(())
    }

    /// 取第 t 步的输入水量 [m]
    pub fn input_at(&self, t: u64) -> f64 {
        self.input_series_m
            .get(t as usize)
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SimulationConfig {
            input_series_m: vec![1e-3, 0.0, 2e-3],
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_input_series_padded_with_zero() {
        let config = SimulationConfig {
            input_series_m: vec![5e-4],
            ..Default::default()
        };
        assert_eq!(config.input_at(0), 5e-4);
        assert_eq!(config.input_at(10), 0.0);
    }

    #[test]
    fn test_nonpositive_dt_rejected() {
        let config = SimulationConfig {
            dt_s: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
