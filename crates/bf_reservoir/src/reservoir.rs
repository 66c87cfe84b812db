// crates/bf_reservoir/src/reservoir.rs

//! 水库响应
//!
//! 持有零个或多个出口的水库：把单步入流与现有蓄水转化为总出流与溢流。
//!
//! # 不变量
//!
//! - 出口按激活阈值升序排列；最高阈值不得超过蓄水上限（构造期硬失败）
//! - 每次 [`Reservoir::respond`] 之后 `min <= storage <= max`
//!
//! # 算法
//!
//! 入流先加到蓄水；然后按阈值从低到高遍历出口，逐个计算通量并从蓄水
//! 扣除。扣除后蓄水低于下限时回滚本次扣除，把通量缩减为恰好把蓄水
//! 放到下限的量。全部出口处理完后蓄水若超过上限，超出部分作为溢流
//! 返回并把蓄水钳制到上限（记录警告，不视为错误）。

use crate::outlet::Outlet;
use bf_foundation::{BfError, BfResult};
use log::warn;
use serde::{Deserialize, Serialize};

/// 水库参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReservoirParameters {
    /// 蓄水下限 [m]
    pub min_storage_m: f64,
    /// 蓄水上限 [m]
    pub max_storage_m: f64,
}

/// 水库状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReservoirState {
    /// 当前蓄水高度 [m]
    pub storage_height_m: f64,
}

/// 单步响应结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservoirResponse {
    /// 各出口通量之和 [m]
    pub total_outflow_m: f64,
    /// 超过蓄水上限的溢流量 [m]，无溢流时为 0
    pub overflow_m: f64,
}

/// 多出口非线性水库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservoir {
    parameters: ReservoirParameters,
    state: ReservoirState,
    outlets: Vec<Outlet>,
}

impl Reservoir {
    /// 创建水库
    ///
    /// 出口按激活阈值升序排序。最高阈值超过蓄水上限、或初始蓄水越界
    /// 时返回配置错误：此类配置无法被后续任何操作修复。
    pub fn new(
        min_storage_m: f64,
        max_storage_m: f64,
        storage_height_m: f64,
        outlets: Vec<Outlet>,
    ) -> BfResult<Self> {
        if !(max_storage_m > min_storage_m) {
            return Err(BfError::config(format!(
                "蓄水上限 {max_storage_m} 必须大于下限 {min_storage_m}"
            )));
        }
        BfError::check_range("storage_height_m", storage_height_m, min_storage_m, max_storage_m)?;

        let mut reservoir = Self {
            parameters: ReservoirParameters {
                min_storage_m,
                max_storage_m,
            },
            state: ReservoirState { storage_height_m },
            outlets,
        };
        reservoir.sort_outlets();
        reservoir.check_highest_outlet()?;
        Ok(reservoir)
    }

    /// 创建只有一个线性出口的水库
    pub fn with_linear_outlet(
        min_storage_m: f64,
        max_storage_m: f64,
        storage_height_m: f64,
        a: f64,
        activation_threshold_m: f64,
        max_flux_m: f64,
    ) -> BfResult<Self> {
        let outlet = Outlet::linear(a, activation_threshold_m, max_flux_m)?;
        Self::new(min_storage_m, max_storage_m, storage_height_m, vec![outlet])
    }

    /// 创建只有一个幂律出口的水库
    pub fn with_power_law_outlet(
        min_storage_m: f64,
        max_storage_m: f64,
        storage_height_m: f64,
        a: f64,
        b: f64,
        activation_threshold_m: f64,
        max_flux_m: f64,
    ) -> BfResult<Self> {
        let outlet = Outlet::power_law(a, b, activation_threshold_m, max_flux_m)?;
        Self::new(min_storage_m, max_storage_m, storage_height_m, vec![outlet])
    }

    /// 追加出口
    ///
    /// 追加后重新排序并复查最高阈值。
    pub fn add_outlet(&mut self, outlet: Outlet) -> BfResult<()> {
        self.outlets.push(outlet);
        self.sort_outlets();
        self.check_highest_outlet()
    }

    /// 单步响应：更新蓄水并返回总出流与溢流
    ///
    /// 溢流为负在构造上不可能，一旦出现说明内部不变量被破坏，
    /// 返回 [`BfError::Internal`]。
    pub fn respond(&mut self, inflow_m: f64) -> BfResult<ReservoirResponse> {
        let mut total_outflow_m = 0.0;
        let mut overflow_m = 0.0;

        self.state.storage_height_m += inflow_m;

        for outlet in &mut self.outlets {
            let mut flux_m = outlet.flux(self.state.storage_height_m, self.parameters.max_storage_m);
            self.state.storage_height_m -= flux_m;

            if self.state.storage_height_m < self.parameters.min_storage_m {
                // 回滚本次扣除，把通量缩减为恰好放空到下限的量
                self.state.storage_height_m += flux_m;
                flux_m = self.state.storage_height_m - self.parameters.min_storage_m;
                outlet.adjust_last_flux(flux_m);
                self.state.storage_height_m = self.parameters.min_storage_m;
            }

            total_outflow_m += flux_m;
        }

        if self.state.storage_height_m > self.parameters.max_storage_m {
            warn!(
                "水库蓄水 {:.6} m 超过上限 {:.6} m，超出部分作为溢流",
                self.state.storage_height_m, self.parameters.max_storage_m
            );
            overflow_m = self.state.storage_height_m - self.parameters.max_storage_m;
            self.state.storage_height_m = self.parameters.max_storage_m;
        }

        if overflow_m < 0.0 {
            return Err(BfError::internal(format!(
                "水库溢流量为负: {overflow_m}"
            )));
        }

        Ok(ReservoirResponse {
            total_outflow_m,
            overflow_m,
        })
    }

    /// 当前蓄水高度 [m]
    pub fn storage_height_m(&self) -> f64 {
        self.state.storage_height_m
    }

    /// 水库参数
    pub fn parameters(&self) -> ReservoirParameters {
        self.parameters
    }

    /// 出口数量
    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    /// 按索引返回出口上一步记录的通量 [m]
    ///
    /// 索引越界时退回第一个出口的记录值；无出口时返回 0。两种情况都
    /// 只记录警告，诊断路径不因越界索引中断。
    pub fn flux_for_outlet(&self, index: usize) -> f64 {
        if let Some(outlet) = self.outlets.get(index) {
            return outlet.last_flux_m();
        }

        if let Some(first) = self.outlets.first() {
            warn!("出口索引 {} 越界，返回第一个出口的记录通量", index);
            first.last_flux_m()
        } else {
            warn!("水库没有出口，返回通量 0.0");
            0.0
        }
    }

    /// 按激活阈值升序排序出口
    fn sort_outlets(&mut self) {
        self.outlets.sort_by(|left, right| {
            left.activation_threshold_m()
                .total_cmp(&right.activation_threshold_m())
        });
    }

    /// 确认最高出口阈值不超过蓄水上限
    fn check_highest_outlet(&self) -> BfResult<()> {
        if let Some(highest) = self.outlets.last() {
            if highest.activation_threshold_m() > self.parameters.max_storage_m {
                return Err(BfError::config(format!(
                    "出口激活阈值 {} m 超过水库蓄水上限 {} m",
                    highest.activation_threshold_m(),
                    self.parameters.max_storage_m
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_reservoir() -> Reservoir {
        Reservoir::with_linear_outlet(0.0, 8.0, 3.5, 0.5, 4.0, 100.0).unwrap()
    }

    #[test]
    fn test_threshold_above_max_storage_fails() {
        let result = Reservoir::with_linear_outlet(0.0, 8.0, 3.5, 0.5, 9.0, 100.0);
        assert!(matches!(result, Err(BfError::Config { .. })));
    }

    #[test]
    fn test_initial_storage_out_of_bounds_fails() {
        let result = Reservoir::with_linear_outlet(0.0, 8.0, 9.0, 0.5, 4.0, 100.0);
        assert!(matches!(result, Err(BfError::OutOfRange { .. })));
    }

    #[test]
    fn test_outlets_sorted_by_threshold() {
        let outlets = vec![
            Outlet::linear(0.3, 6.0, 100.0).unwrap(),
            Outlet::linear(0.5, 2.0, 100.0).unwrap(),
            Outlet::linear(0.4, 4.0, 100.0).unwrap(),
        ];
        let mut reservoir = Reservoir::new(0.0, 8.0, 7.0, outlets).unwrap();
        // 全部出口激活，记录的通量按阈值从低到高
        reservoir.respond(0.0).unwrap();
        assert!(reservoir.flux_for_outlet(0) > 0.0);
        assert_eq!(reservoir.outlet_count(), 3);
    }

    #[test]
    fn test_respond_below_threshold() {
        let mut reservoir = test_reservoir();
        let response = reservoir.respond(0.2).unwrap();
        assert!((reservoir.storage_height_m() - 3.7).abs() < 1e-12);
        assert_eq!(response.total_outflow_m, 0.0);
        assert_eq!(response.overflow_m, 0.0);
    }

    #[test]
    fn test_respond_overflow() {
        let mut reservoir = test_reservoir();
        let response = reservoir.respond(10.0).unwrap();
        assert_eq!(reservoir.storage_height_m(), 8.0);
        assert!(response.overflow_m > 0.0);
        // 13.5 时线性出口通量 0.5 * (13.5-4)/(8-4) = 1.1875
        assert!((response.total_outflow_m - 1.1875).abs() < 1e-12);
        assert!((response.overflow_m - 4.3125).abs() < 1e-12);
    }

    #[test]
    fn test_respond_underflow() {
        let mut reservoir = test_reservoir();
        let response = reservoir.respond(-10.0).unwrap();
        assert_eq!(reservoir.storage_height_m(), 0.0);
        assert_eq!(response.overflow_m, 0.0);
        // 出口通量被改写为负值，把蓄水恰好放到下限
        assert!((response.total_outflow_m - (-6.5)).abs() < 1e-12);
    }

    #[test]
    fn test_flux_for_outlet_diagnostics() {
        let mut reservoir = test_reservoir();
        reservoir.respond(3.0).unwrap();
        let recorded = reservoir.flux_for_outlet(0);
        assert!(recorded > 0.0);
        // 越界索引退回第一个出口
        assert_eq!(reservoir.flux_for_outlet(7), recorded);
    }

    #[test]
    fn test_flux_for_outlet_no_outlets() {
        let reservoir = Reservoir::new(0.0, 8.0, 3.5, vec![]).unwrap();
        assert_eq!(reservoir.flux_for_outlet(0), 0.0);
    }

    #[test]
    fn test_storage_stays_within_bounds() {
        let mut reservoir = test_reservoir();
        for inflow in [-3.0, 5.0, -9.0, 12.0, 0.3] {
            reservoir.respond(inflow).unwrap();
            let storage = reservoir.storage_height_m();
            assert!((0.0..=8.0).contains(&storage), "蓄水越界: {}", storage);
        }
    }
}
