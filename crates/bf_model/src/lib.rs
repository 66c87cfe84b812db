// crates/bf_model/src/lib.rs

//! 产流公式宿主与模拟驱动
//!
//! 把水库核心与流量交换协议组装成可运行的流域模拟：
//! - 蒸散发接口 (et) - 外部蒸散发模块的不透明参数座
//! - 线性产流公式 (formulation) - 土壤分流 + 快流级联 + 地下水慢流，
//!   每步之后执行质量平衡检查并以状态码报告
//! - 模拟驱动 (driver) - 按拓扑把流域单元接到共享汇点，独立 worker
//!   驱动各单元并推进时间步下界
//!
//! # 控制流
//!
//! 每个时间步：流域单元先从各入流汇点认领上一步的份额，驱动产流
//! 公式得到出流速率，再把出流贡献到自己的出流汇点；下一步由下游
//! 单元认领。

pub mod builder;
pub mod demo;
pub mod driver;
pub mod et;
pub mod formulation;

pub use builder::{build_outlet, build_reservoir};
pub use demo::demo_watershed;
pub use driver::{RunReport, Simulation};
pub use et::{Evapotranspiration, NoEt, ProportionalEt};
pub use formulation::{mass_check, Formulation, LinearRunoff, StepOutput, StepStatus};
