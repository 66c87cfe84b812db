// crates/bf_model/src/demo.rs

//! 内置演示流域
//!
//! 五个流域单元、两个汇点的小流域，用于命令行演示与集成测试：
//!
//! ```text
//! cat-1 ─┐                 ┌─ cat-3 (60%) ─┐
//!        ├─► nex-1 ────────┤               ├─► nex-2 ──► cat-5 (100%)
//! cat-2 ─┘                 └─ cat-4 (40%) ─┘
//! ```

use bf_config::{
    NexusTopology, ReceiverEntry, SimulationConfig, TopologyConfig,
};
use bf_foundation::CatchmentId;

fn cat(id: &str) -> CatchmentId {
    CatchmentId::from(id)
}

/// 构建演示流域配置
///
/// 降雨序列为前 6 步的脉冲，其余步退水。
pub fn demo_watershed() -> SimulationConfig {
    let topology = TopologyConfig {
        nexuses: vec![
            NexusTopology {
                id: "nex-1".into(),
                contributing: vec![cat("cat-1"), cat("cat-2")],
                receiving: vec![
                    ReceiverEntry { catchment: cat("cat-3"), percent: 60.0 },
                    ReceiverEntry { catchment: cat("cat-4"), percent: 40.0 },
                ],
            },
            NexusTopology {
                id: "nex-2".into(),
                contributing: vec![cat("cat-3"), cat("cat-4")],
                receiving: vec![ReceiverEntry { catchment: cat("cat-5"), percent: 100.0 }],
            },
        ],
    };

    let mut input_series_m = vec![0.0; 48];
    for (i, value) in input_series_m.iter_mut().enumerate().take(6) {
        *value = 2e-3 * (i as f64 + 1.0);
    }

    SimulationConfig {
        n_steps: 48,
        dt_s: 3600.0,
        input_series_m,
        topology,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_config_validates() {
        let config = demo_watershed();
        assert!(config.validate().is_ok());
        assert_eq!(config.topology.catchments().len(), 5);
    }
}
