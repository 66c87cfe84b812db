// crates/bf_foundation/src/ids.rs

//! 强类型标识
//!
//! 提供流域单元、时间步与进程号的标识类型，编译期防止混用。
//!
//! 流域单元标识来自水文地理数据（如 `"cat-42"`），保留为字符串；
//! 跨进程消息中的数值标识由分区配置给出（见 bf_config 的分区部分）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 模拟时间步（非负整数）
pub type Timestep = u64;

/// 流域单元标识
///
/// 水文地理拓扑中的单元 ID，例如 `"cat-42"`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatchmentId(String);

impl CatchmentId {
    /// 从字符串创建
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 返回底层字符串
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatchmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatchmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CatchmentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 执行上下文编号（进程 / rank）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank-{}", self.0)
    }
}
