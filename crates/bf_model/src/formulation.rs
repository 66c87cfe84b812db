// crates/bf_model/src/formulation.rs

//! 线性产流公式
//!
//! 单个流域单元的产流：土壤蓄水按蓄水函数分出产流量，按比例分入
//! 快流 Nash 级联与地下水慢流水库；两条路径的出流合并为单元出流。
//! 每步之后执行质量平衡检查：
//!
//! ```text
//! 初始蓄水 + 输入 == 最终蓄水 + 蒸散发损失 + 快流·dt + 慢流·dt
//! ```
//!
//! 检查失败以状态码报告，由外层驱动记录，不中断模拟。

use crate::et::Evapotranspiration;
use bf_config::FormulationConfig;
use bf_foundation::tolerance;
use bf_foundation::BfResult;
use bf_reservoir::{NashCascade, Reservoir};

/// 质量平衡检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// 平衡
    Ok,
    /// 质量平衡检查失败（可恢复，交由外层记录）
    MassBalanceError,
}

/// 单步输出
#[derive(Debug, Clone, Copy)]
pub struct StepOutput {
    /// 快流出流速率 [m/s]
    pub quickflow_rate: f64,
    /// 慢流（地下水）出流速率 [m/s]
    pub slowflow_rate: f64,
    /// 蒸散发损失 [m]
    pub et_loss_m: f64,
    /// 质量平衡状态
    pub status: StepStatus,
}

impl StepOutput {
    /// 合并出流速率 [m/s]
    pub fn total_rate(&self) -> f64 {
        self.quickflow_rate + self.slowflow_rate
    }
}

/// 质量平衡检查
///
/// 所有量纲为米；速率乘以 `dt_s` 折算为水量。
pub fn mass_check(
    initial_storage_m: f64,
    input_m: f64,
    final_storage_m: f64,
    et_loss_m: f64,
    quickflow_rate: f64,
    slowflow_rate: f64,
    dt_s: f64,
) -> StepStatus {
    let initial_mass_m = initial_storage_m + input_m;
    let final_mass_m =
        final_storage_m + et_loss_m + quickflow_rate * dt_s + slowflow_rate * dt_s;

    if (initial_mass_m - final_mass_m).abs() > tolerance::MASS_BALANCE_EPSILON {
        StepStatus::MassBalanceError
    } else {
        StepStatus::Ok
    }
}

/// 产流公式接口
///
/// 外部模型包装层（不在本仓库范围内）同样通过该接口接入驱动。
pub trait Formulation: Send {
    /// 运行一个时间步
    fn step(
        &mut self,
        dt_s: f64,
        input_m: f64,
        et: &mut dyn Evapotranspiration,
    ) -> BfResult<StepOutput>;

    /// 当前全部内部蓄水 [m]
    fn storage_total_m(&self) -> f64;
}

/// 线性产流公式
pub struct LinearRunoff {
    max_soil_storage_m: f64,
    storage_exponent_b: f64,
    quickflow_split: f64,
    soil_storage_m: f64,
    cascade: NashCascade,
    groundwater: Reservoir,
}

impl LinearRunoff {
    /// 依据配置构建
    ///
    /// 地下水缺省为单线性出口水库；配置给出
    /// `groundwater_config` 时按其构建（例如指数出口）。
    pub fn from_config(config: &FormulationConfig) -> BfResult<Self> {
        let cascade = NashCascade::linear(
            config.cascade.n,
            config.cascade.k,
            config.cascade.max_storage_m,
            config.cascade.max_flux_m,
            &config.cascade.initial_storages(),
        )?;
        let groundwater = match &config.groundwater_config {
            Some(reservoir_config) => crate::builder::build_reservoir(reservoir_config)?,
            None => Reservoir::with_linear_outlet(
                0.0,
                config.groundwater_max_storage_m,
                config.initial_groundwater_storage_m,
                config.groundwater_k,
                0.0,
                config.cascade.max_flux_m,
            )?,
        };
        Ok(Self {
            max_soil_storage_m: config.max_soil_storage_m,
            storage_exponent_b: config.storage_exponent_b,
            quickflow_split: config.quickflow_split,
            soil_storage_m: config.initial_soil_storage_m,
            cascade,
            groundwater,
        })
    }

    /// 当前土壤蓄水 [m]
    pub fn soil_storage_m(&self) -> f64 {
        self.soil_storage_m
    }

    /// 蓄水函数：本步产流占当前土壤蓄水的比例 [0, 1]
    fn storage_fraction(&self) -> f64 {
        let ratio = (self.soil_storage_m / self.max_soil_storage_m).clamp(0.0, 1.0);
        1.0 - (1.0 - ratio).powf(self.storage_exponent_b)
    }
}

impl Formulation for LinearRunoff {
    fn step(
        &mut self,
        dt_s: f64,
        input_m: f64,
        et: &mut dyn Evapotranspiration,
    ) -> BfResult<StepOutput> {
        let initial_storage_m = self.storage_total_m();

        // 输入进入土壤蓄水
        self.soil_storage_m += input_m;

        // 蓄水函数分出产流量
        let produced_m = self.storage_fraction() * self.soil_storage_m;
        self.soil_storage_m -= produced_m;

        // 蒸散发作用于剩余土壤蓄水，钳制到可用量
        let available_m = self.soil_storage_m.max(0.0);
        let et_loss_m = et.et_loss_m(self.soil_storage_m).clamp(0.0, available_m);
        self.soil_storage_m -= et_loss_m;

        let quick_in_m = produced_m * self.quickflow_split;
        let slow_in_m = produced_m - quick_in_m;

        // 慢流路径：单级地下水水库
        let gw_response = self.groundwater.respond(slow_in_m)?;
        let slowflow_rate = gw_response.total_outflow_m / dt_s;

        // 地下水溢流折入快流输入
        let quick_rate_in = (quick_in_m + gw_response.overflow_m) / dt_s;
        let quickflow_rate = self.cascade.route(quick_rate_in, dt_s)?;

        let status = mass_check(
            initial_storage_m,
            input_m,
            self.storage_total_m(),
            et_loss_m,
            quickflow_rate,
            slowflow_rate,
            dt_s,
        );

        Ok(StepOutput {
            quickflow_rate,
            slowflow_rate,
            et_loss_m,
            status,
        })
    }

    fn storage_total_m(&self) -> f64 {
        self.soil_storage_m + self.groundwater.storage_height_m() + self.cascade.storage_total_m()
    }
}
