// crates/bf_config/src/routing.rs

//! 路由参数配置
//!
//! 出口 / 水库 / 级联 / 产流公式的参数结构，全部使用 f64 存储以便
//! JSON 序列化。实际运行时核心对象由 bf_model 依据这些参数构建。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// 出口形状配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OutletShapeConfig {
    /// 线性出口
    Linear {
        /// 通量系数
        a: f64,
    },
    /// 幂律出口
    PowerLaw {
        /// 通量系数
        a: f64,
        /// 通量指数
        b: f64,
    },
    /// 指数出口
    Exponential {
        /// 通量系数
        c: f64,
        /// 指数系数
        expon: f64,
    },
}

/// 出口配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutletConfig {
    /// 出口形状与形状参数
    pub shape: OutletShapeConfig,

    /// 激活阈值 [m]
    #[serde(default)]
    pub activation_threshold_m: f64,

    /// 通量上限 [m]
    #[serde(default = "default_max_flux")]
    pub max_flux_m: f64,
}

fn default_max_flux() -> f64 {
    100.0
}

impl OutletConfig {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_flux_m < 0.0 {
            return Err(ConfigError::invalid(
                "max_flux_m",
                self.max_flux_m,
                "不得为负",
            ));
        }
        if !self.activation_threshold_m.is_finite() {
            return Err(ConfigError::invalid(
                "activation_threshold_m",
                self.activation_threshold_m,
                "必须为有限数",
            ));
        }
        Ok(())
    }
}

/// 水库配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirConfig {
    /// 蓄水下限 [m]
    #[serde(default)]
    pub min_storage_m: f64,

    /// 蓄水上限 [m]
    #[serde(default = "default_max_storage")]
    pub max_storage_m: f64,

    /// 初始蓄水高度 [m]
    #[serde(default)]
    pub initial_storage_m: f64,

    /// 出口列表
    #[serde(default)]
    pub outlets: Vec<OutletConfig>,
}

fn default_max_storage() -> f64 {
    8.0
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self {
            min_storage_m: 0.0,
            max_storage_m: default_max_storage(),
            initial_storage_m: 0.0,
            outlets: Vec::new(),
        }
    }
}

impl ReservoirConfig {
    /// 校验
    ///
    /// 最高出口阈值超过蓄水上限是配置错误：后续任何操作都无法使其
    /// 合法，在此处即拒绝。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_storage_m <= self.min_storage_m {
            return Err(ConfigError::invalid(
                "max_storage_m",
                self.max_storage_m,
                "必须大于蓄水下限",
            ));
        }
        if self.initial_storage_m < self.min_storage_m
            || self.initial_storage_m > self.max_storage_m
        {
            return Err(ConfigError::invalid(
                "initial_storage_m",
                self.initial_storage_m,
                "必须位于蓄水区间内",
            ));
        }
        for outlet in &self.outlets {
            outlet.validate()?;
            if outlet.activation_threshold_m > self.max_storage_m {
                return Err(ConfigError::invalid(
                    "activation_threshold_m",
                    outlet.activation_threshold_m,
                    "出口激活阈值超过水库蓄水上限",
                ));
            }
        }
        Ok(())
    }
}

/// Nash 级联配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// 级数
    #[serde(default = "default_cascade_n")]
    pub n: usize,

    /// 各级线性出口系数
    #[serde(default = "default_cascade_k")]
    pub k: f64,

    /// 各级蓄水上限 [m]
    #[serde(default = "default_max_storage")]
    pub max_storage_m: f64,

    /// 各级通量上限 [m]
    #[serde(default = "default_max_flux")]
    pub max_flux_m: f64,

    /// 各级初始蓄水 [m]；缺省为全零
    #[serde(default)]
    pub initial_storages_m: Option<Vec<f64>>,
}

fn default_cascade_n() -> usize {
    3
}
fn default_cascade_k() -> f64 {
    0.5
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            n: default_cascade_n(),
            k: default_cascade_k(),
            max_storage_m: default_max_storage(),
            max_flux_m: default_max_flux(),
            initial_storages_m: None,
        }
    }
}

impl CascadeConfig {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::invalid("n", self.n, "级数不得为 0"));
        }
        if self.k <= 0.0 {
            return Err(ConfigError::invalid("k", self.k, "必须为正"));
        }
        if let Some(storages) = &self.initial_storages_m {
            if storages.len() != self.n {
                return Err(ConfigError::invalid(
                    "initial_storages_m",
                    storages.len(),
                    format!("长度必须等于级数 {}", self.n),
                ));
            }
        }
        Ok(())
    }

    /// 初始蓄水序列（缺省全零）
    pub fn initial_storages(&self) -> Vec<f64> {
        self.initial_storages_m
            .clone()
            .unwrap_or_else(|| vec![0.0; self.n])
    }
}

/// 产流公式配置
///
/// 单个流域单元的线性产流公式参数：土壤蓄水函数分流、快流 Nash
/// 级联与地下水慢流水库。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulationConfig {
    /// 土壤蓄水上限 [m]
    #[serde(default = "default_soil_max")]
    pub max_soil_storage_m: f64,

    /// 蓄水函数指数
    #[serde(default = "default_storage_exponent")]
    pub storage_exponent_b: f64,

    /// 产流中进入快流路径的比例 [0, 1]
    #[serde(default = "default_quickflow_split")]
    pub quickflow_split: f64,

    /// 初始土壤蓄水 [m]
    #[serde(default)]
    pub initial_soil_storage_m: f64,

    /// 快流级联
    #[serde(default)]
    pub cascade: CascadeConfig,

    /// 地下水线性出口系数
    #[serde(default = "default_groundwater_k")]
    pub groundwater_k: f64,

    /// 地下水蓄水上限 [m]
    #[serde(default = "default_max_storage")]
    pub groundwater_max_storage_m: f64,

    /// 初始地下水蓄水 [m]
    #[serde(default)]
    pub initial_groundwater_storage_m: f64,

    /// 自定义地下水水库
    ///
    /// 给出时覆盖上面的线性地下水参数，允许指数等任意出口形状。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundwater_config: Option<ReservoirConfig>,
}

fn default_soil_max() -> f64 {
    1.0
}
fn default_storage_exponent() -> f64 {
    1.5
}
fn default_quickflow_split() -> f64 {
    0.83
}
fn default_groundwater_k() -> f64 {
    0.01
}

impl Default for FormulationConfig {
    fn default() -> Self {
        Self {
            max_soil_storage_m: default_soil_max(),
            storage_exponent_b: default_storage_exponent(),
            quickflow_split: default_quickflow_split(),
            initial_soil_storage_m: 0.0,
            cascade: CascadeConfig::default(),
            groundwater_k: default_groundwater_k(),
            groundwater_max_storage_m: default_max_storage(),
            initial_groundwater_storage_m: 0.0,
            groundwater_config: None,
        }
    }
}

impl FormulationConfig {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_soil_storage_m <= 0.0 {
            return Err(ConfigError::invalid(
                "max_soil_storage_m",
                self.max_soil_storage_m,
                "必须为正",
            ));
        }
        if !(0.0..=1.0).contains(&self.quickflow_split) {
            return Err(ConfigError::invalid(
                "quickflow_split",
                self.quickflow_split,
                "必须位于 [0, 1]",
            ));
        }
        if self.storage_exponent_b <= 0.0 {
            return Err(ConfigError::invalid(
                "storage_exponent_b",
                self.storage_exponent_b,
                "必须为正",
            ));
        }
        if self.groundwater_k <= 0.0 {
            return Err(ConfigError::invalid(
                "groundwater_k",
                self.groundwater_k,
                "必须为正",
            ));
        }
        if !(0.0..=self.max_soil_storage_m).contains(&self.initial_soil_storage_m) {
            return Err(ConfigError::invalid(
                "initial_soil_storage_m",
                self.initial_soil_storage_m,
                "必须位于 [0, 土壤蓄水上限]",
            ));
        }
        if !(0.0..=self.groundwater_max_storage_m).contains(&self.initial_groundwater_storage_m) {
            return Err(ConfigError::invalid(
                "initial_groundwater_storage_m",
                self.initial_groundwater_storage_m,
                "必须位于 [0, 地下水蓄水上限]",
            ));
        }
        if let Some(groundwater) = &self.groundwater_config {
            groundwater.validate()?;
        }
        self.cascade.validate()
    }
}
