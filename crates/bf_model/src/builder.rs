// crates/bf_model/src/builder.rs

//! 配置 → 核心对象 的构建
//!
//! 把 bf_config 中的纯数据参数转换为可运行的水库核心对象。
//! 配置层与核心层互不依赖，转换集中在本模块。

use bf_config::{OutletConfig, OutletShapeConfig, ReservoirConfig};
use bf_foundation::BfResult;
use bf_reservoir::{Outlet, OutletShape, Reservoir};

/// 依据配置构建出口
pub fn build_outlet(config: &OutletConfig) -> BfResult<Outlet> {
    let shape = match config.shape {
        OutletShapeConfig::Linear { a } => OutletShape::Linear { a },
        OutletShapeConfig::PowerLaw { a, b } => OutletShape::PowerLaw { a, b },
        OutletShapeConfig::Exponential { c, expon } => OutletShape::Exponential { c, expon },
    };
    Outlet::new(shape, config.activation_threshold_m, config.max_flux_m)
}

/// 依据配置构建水库
///
/// 出口排序与最高阈值检查在水库构造中执行；非法配置在此硬失败。
pub fn build_reservoir(config: &ReservoirConfig) -> BfResult<Reservoir> {
    let outlets = config
        .outlets
        .iter()
        .map(build_outlet)
        .collect::<BfResult<Vec<_>>>()?;
    Reservoir::new(
        config.min_storage_m,
        config.max_storage_m,
        config.initial_storage_m,
        outlets,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_power_law_outlet() {
        let config = OutletConfig {
            shape: OutletShapeConfig::PowerLaw { a: 0.5, b: 2.0 },
            activation_threshold_m: 1.0,
            max_flux_m: 10.0,
        };
        let outlet = build_outlet(&config).unwrap();
        assert_eq!(outlet.activation_threshold_m(), 1.0);
    }

    #[test]
    fn test_build_reservoir_sorts_and_checks() {
        let config = ReservoirConfig {
            min_storage_m: 0.0,
            max_storage_m: 8.0,
            initial_storage_m: 2.0,
            outlets: vec![
                OutletConfig {
                    shape: OutletShapeConfig::Linear { a: 0.3 },
                    activation_threshold_m: 4.0,
                    max_flux_m: 10.0,
                },
                OutletConfig {
                    shape: OutletShapeConfig::Exponential { c: 1e-3, expon: 2.0 },
                    activation_threshold_m: 0.0,
                    max_flux_m: 10.0,
                },
            ],
        };
        let reservoir = build_reservoir(&config).unwrap();
        assert_eq!(reservoir.outlet_count(), 2);
    }

    #[test]
    fn test_build_reservoir_threshold_above_max_fails() {
        let config = ReservoirConfig {
            outlets: vec![OutletConfig {
                shape: OutletShapeConfig::Linear { a: 0.3 },
                activation_threshold_m: 99.0,
                max_flux_m: 10.0,
            }],
            ..Default::default()
        };
        assert!(build_reservoir(&config).is_err());
    }
}
