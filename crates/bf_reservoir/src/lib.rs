// crates/bf_reservoir/src/lib.rs

//! 水库核心模块
//!
//! 提供把流域单元内部蓄水转化为出流的链式非线性水库机制，包括：
//! - 出口通量计算 (outlet) - 线性 / 幂律 / 指数三种形状
//! - 水库响应 (reservoir) - 多出口按激活阈值排序泄流，处理欠蓄与溢流
//! - Nash 级联 (cascade) - 水库串联，塑造单位过程线
//!
//! # 单位约定
//!
//! 蓄水高度与通量单位为米；速率单位为米每秒；时间步长单位为秒。
//!
//! # 设计
//!
//! 出口形状为封闭的标签枚举（[`OutletShape`]），在一个通量函数中匹配，
//! 避免热循环中的堆分配多态。

pub mod cascade;
pub mod outlet;
pub mod reservoir;

pub use cascade::NashCascade;
pub use outlet::{Outlet, OutletShape};
pub use reservoir::{Reservoir, ReservoirParameters, ReservoirResponse, ReservoirState};
