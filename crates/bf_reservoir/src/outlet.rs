// crates/bf_reservoir/src/outlet.rs

//! 出口通量计算
//!
//! 单个水库出口：由蓄水高度计算泄流通量，参数在构造后不可变。
//! 出口只有在蓄水高度超过激活阈值时才产生通量。
//!
//! # 形状
//!
//! - 线性: `a * (s - t) / (max - t)`
//! - 幂律: `a * ((s - t) / (max - t))^b`
//! - 指数: `c * (exp(expon * s / max) - 1)`
//!
//! 其中 `s` 为当前蓄水高度，`t` 为激活阈值，`max` 为水库蓄水上限。
//! 计算结果钳制在 `[0, max_flux_m]`；超过上限是可恢复情况，仅记录警告。

use bf_foundation::{BfError, BfResult};
use log::warn;
use serde::{Deserialize, Serialize};

/// 出口形状
///
/// 封闭的标签枚举，在 [`Outlet::flux`] 中统一匹配。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OutletShape {
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

/// 水库出口
///
/// 由一个水库独占持有。参数在构造后不可变，`last_flux_m` 每步更新，
/// 可按索引取回用于诊断。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlet {
    shape: OutletShape,
    activation_threshold_m: f64,
    max_flux_m: f64,
    #[serde(skip)]
    last_flux_m: f64,
}

impl Outlet {
    /// 创建出口
    pub fn new(shape: OutletShape, activation_threshold_m: f64, max_flux_m: f64) -> BfResult<Self> {
        BfError::check_finite("activation_threshold_m", activation_threshold_m)?;
        BfError::check_finite("max_flux_m", max_flux_m)?;
        if max_flux_m < 0.0 {
            return Err(BfError::invalid_input(format!(
                "出口最大通量为负: {max_flux_m}"
            )));
        }
        Ok(Self {
            shape,
            activation_threshold_m,
            max_flux_m,
            last_flux_m: 0.0,
        })
    }

    /// 创建线性出口
    pub fn linear(a: f64, activation_threshold_m: f64, max_flux_m: f64) -> BfResult<Self> {
        Self::new(OutletShape::Linear { a }, activation_threshold_m, max_flux_m)
    }

    /// 创建幂律出口
    pub fn power_law(a: f64, b: f64, activation_threshold_m: f64, max_flux_m: f64) -> BfResult<Self> {
        Self::new(
            OutletShape::PowerLaw { a, b },
            activation_threshold_m,
            max_flux_m,
        )
    }

    /// 创建指数出口
    pub fn exponential(c: f64, expon: f64, activation_threshold_m: f64, max_flux_m: f64) -> BfResult<Self> {
        Self::new(
            OutletShape::Exponential { c, expon },
            activation_threshold_m,
            max_flux_m,
        )
    }

    /// 计算并记录泄流通量 [m]
    ///
    /// 蓄水高度不超过激活阈值时返回 0；否则按形状计算局部通量并钳制到
    /// `[0, max_flux_m]`。返回值同时存入 `last_flux_m`。
    pub fn flux(&mut self, storage_height_m: f64, max_storage_m: f64) -> f64 {
        if storage_height_m <= self.activation_threshold_m {
            self.last_flux_m = 0.0;
            return 0.0;
        }

        let mut flux = self.local_flux(storage_height_m, max_storage_m);

        if flux > self.max_flux_m {
            warn!(
                "出口通量 {:.6e} 超过上限 {:.6e}，已钳制",
                flux, self.max_flux_m
            );
            flux = self.max_flux_m;
        }
        if flux < 0.0 {
            flux = 0.0;
        }

        self.last_flux_m = flux;
        flux
    }

    /// 按形状计算未钳制的局部通量
    fn local_flux(&self, storage_height_m: f64, max_storage_m: f64) -> f64 {
        let t = self.activation_threshold_m;
        match self.shape {
            OutletShape::Linear { a } => a * (storage_height_m - t) / (max_storage_m - t),
            OutletShape::PowerLaw { a, b } => {
                a * ((storage_height_m - t) / (max_storage_m - t)).powf(b)
            }
            OutletShape::Exponential { c, expon } => {
                c * ((expon * storage_height_m / max_storage_m).exp() - 1.0)
            }
        }
    }

    /// 出口形状
    pub fn shape(&self) -> OutletShape {
        self.shape
    }

    /// 激活阈值 [m]
    pub fn activation_threshold_m(&self) -> f64 {
        self.activation_threshold_m
    }

    /// 通量上限 [m]
    pub fn max_flux_m(&self) -> f64 {
        self.max_flux_m
    }

    /// 上一步计算的通量 [m]
    pub fn last_flux_m(&self) -> f64 {
        self.last_flux_m
    }

    /// 覆盖记录的通量
    ///
    /// 水库在欠蓄回滚时用缩减后的通量覆盖出口记录值。
    pub(crate) fn adjust_last_flux(&mut self, flux_m: f64) {
        self.last_flux_m = flux_m;
    }
}
