// crates/bf_foundation/src/tolerance.rs

//! 共享数值容差常量
//!
//! 汇总整个项目使用的数值容差，避免各 crate 各自定义魔法数。
//!
//! # 设计原则
//!
//! 1. **无全局状态**: 常量直接引用，不做运行时配置
//! 2. **单位固定**: 蓄水与通量单位为米 / 米每秒，百分比取值 [0, 100]

/// 时间步分配完成容差 [%]
///
/// 当某时间步已认领比例距 100% 小于该值时，该时间步视为分配完毕，
/// 账本条目随即清除。
pub const PCT_COMPLETION_EPSILON: f64 = 5e-5;

/// 全额分配比例 [%]
pub const FULL_ALLOCATION_PCT: f64 = 100.0;

/// 质量守恒检查容差 [m]
///
/// 单步质量平衡检查允许的绝对误差。
pub const MASS_BALANCE_EPSILON: f64 = 1e-6;

/// 浮点比较容差
///
/// 通用的浮点近似相等判断阈值，用于测试与守恒断言。
pub const FLOAT_EPSILON: f64 = 1e-10;

/// 判断已认领比例是否达到分配完成条件
#[inline]
pub fn is_fully_allocated(total_requested_pct: f64) -> bool {
    FULL_ALLOCATION_PCT - total_requested_pct < PCT_COMPLETION_EPSILON
}

/// 判断两个浮点量是否在通用容差内相等
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < FLOAT_EPSILON
}
