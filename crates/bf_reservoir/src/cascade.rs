// crates/bf_reservoir/src/cascade.rs

//! Nash 级联
//!
//! 水库的有序串联：上一级的出流速率作为下一级的入流，用于平滑和
//! 延迟流量信号（脉冲响应塑形）。快流路径用多级，慢流 / 地下水路径
//! 用单级即可，机制完全相同。
//!
//! 级数在构造时固定。级联直接持有各级水库，无外部生命周期管理。

use crate::outlet::{Outlet, OutletShape};
use crate::reservoir::Reservoir;
use bf_foundation::{ensure, BfError, BfResult};
use serde::{Deserialize, Serialize};

/// Nash 级联：有序的水库链
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NashCascade {
    reservoirs: Vec<Reservoir>,
}

impl NashCascade {
    /// 创建 n 级线性水库级联
    ///
    /// 每级为单个线性出口（系数 `a`，激活阈值 0），蓄水上限与通量上限
    /// 各级相同。`initial_storages_m` 长度必须等于 `n`。
    pub fn linear(
        n: usize,
        a: f64,
        max_storage_m: f64,
        max_flux_m: f64,
        initial_storages_m: &[f64],
    ) -> BfResult<Self> {
        if n == 0 {
            return Err(BfError::config("Nash 级联级数不得为 0"));
        }
        BfError::check_size("initial_storages_m", n, initial_storages_m.len())?;

        let mut reservoirs = Vec::with_capacity(n);
        for &storage_m in initial_storages_m {
            reservoirs.push(Reservoir::with_linear_outlet(
                0.0,
                max_storage_m,
                storage_m,
                a,
                0.0,
                max_flux_m,
            )?);
        }
        Ok(Self { reservoirs })
    }

    /// 从现成的水库序列创建级联
    ///
    /// 每级必须恰好有一个线性或幂律出口。
    pub fn from_reservoirs(reservoirs: Vec<Reservoir>) -> BfResult<Self> {
        if reservoirs.is_empty() {
            return Err(BfError::config("Nash 级联级数不得为 0"));
        }
        for (i, reservoir) in reservoirs.iter().enumerate() {
            if reservoir.outlet_count() != 1 {
                return Err(BfError::config(format!(
                    "级联第 {} 级必须恰好有一个出口，实际 {}",
                    i,
                    reservoir.outlet_count()
                )));
            }
        }
        Ok(Self { reservoirs })
    }

    /// 路由一步：入流速率 [m/s] 经过全部级后返回出流速率 [m/s]
    ///
    /// 每级把速率乘以 `dt_s` 得到本步水量，调用水库响应后再除以
    /// `dt_s` 还原为速率。级内溢流折回下游速率，保持级联整体守恒。
    pub fn route(&mut self, inflow_rate: f64, dt_s: f64) -> BfResult<f64> {
        ensure!(
            dt_s > 0.0,
            BfError::invalid_input(format!("时间步长必须为正: {dt_s}"))
        );

        let mut rate = inflow_rate;
        for reservoir in &mut self.reservoirs {
            let response = reservoir.respond(rate * dt_s)?;
            rate = (response.total_outflow_m + response.overflow_m) / dt_s;
        }
        Ok(rate)
    }

    /// 级数
    pub fn len(&self) -> usize {
        self.reservoirs.len()
    }

    /// 是否为空（构造保证非空）
    pub fn is_empty(&self) -> bool {
        self.reservoirs.is_empty()
    }

    /// 各级当前蓄水高度 [m]
    pub fn storages_m(&self) -> Vec<f64> {
        self.reservoirs
            .iter()
            .map(|r| r.storage_height_m())
            .collect()
    }

    /// 全部级的蓄水总量 [m]
    pub fn storage_total_m(&self) -> f64 {
        self.reservoirs.iter().map(|r| r.storage_height_m()).sum()
    }

    /// 指定级的蓄水高度 [m]
    pub fn stage_storage_m(&self, index: usize) -> Option<f64> {
        self.reservoirs.get(index).map(|r| r.storage_height_m())
    }
}

/// 构造单级地下水（慢流）水库的便捷函数
///
/// 指数出口，激活阈值 0，等价于原始实现中的地下水路径。
pub fn groundwater_reservoir(
    max_storage_m: f64,
    initial_storage_m: f64,
    c: f64,
    expon: f64,
    max_flux_m: f64,
) -> BfResult<Reservoir> {
    let outlet = Outlet::new(OutletShape::Exponential { c, expon }, 0.0, max_flux_m)?;
    Reservoir::new(0.0, max_storage_m, initial_storage_m, vec![outlet])
}
