// crates/bf_config/src/lib.rs

//! BasinFlow 配置层
//!
//! 定义模拟的全部配置参数，使用纯 f64 类型以便 JSON 序列化。
//!
//! # 模块概览
//!
//! - [`routing`]: 出口 / 水库 / 级联 / 产流公式参数
//! - [`topology`]: 汇点 ↔ 流域单元邻接关系与认领比例
//! - [`partition`]: 跨进程运行时的单元 → rank 分配
//! - [`simulation`]: 根配置与 JSON 读写
//!
//! 拓扑由外部水文地理读取器在模拟开始前装载；核心只读不改。

pub mod error;
pub mod partition;
pub mod routing;
pub mod simulation;
pub mod topology;

pub use error::ConfigError;
pub use partition::{PartitionConfig, PartitionEntry};
pub use routing::{
    CascadeConfig, FormulationConfig, OutletConfig, OutletShapeConfig, ReservoirConfig,
};
pub use simulation::SimulationConfig;
pub use topology::{NexusTopology, ReceiverEntry, TopologyConfig};
