// crates/bf_exchange/src/error.rs

//! 交换协议错误
//!
//! 协议错误全部可恢复：它们指示调用方的顺序缺陷，应当只中止该
//! 流域单元的当前步，而不是终止整个模拟。传输类错误（超时 / 对端
//! 断开）同样以错误形式返回，由外层驱动决定重试或放弃。

use bf_foundation::{Rank, Timestep};
use thiserror::Error;

/// 流量交换错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExchangeError {
    /// 时间步低于账本最小时间步
    #[error("时间步 {t} 低于最小时间步 {min}，相关记录已清除")]
    StaleTimestep {
        /// 请求的时间步
        t: Timestep,
        /// 当前最小时间步
        min: Timestep,
    },

    /// 时间步已分配完毕
    #[error("时间步 {t} 已分配完毕，不能再操作")]
    CompletedTimestep {
        /// 请求的时间步
        t: Timestep,
    },

    /// 已汇总后不能再添加贡献
    #[error("时间步 {t} 已汇总（存在下游认领），不能再添加上游贡献")]
    AlreadySummed {
        /// 请求的时间步
        t: Timestep,
    },

    /// 对没有任何贡献的时间步发起认领
    #[error("时间步 {t} 没有上游贡献，无水可放")]
    EmptyNexus {
        /// 请求的时间步
        t: Timestep,
    },

    /// 无效认领：单次或合计超过 100%
    #[error("无效认领: 本次 {requested_pct}%，已认领 {total_pct}%，合计不得超过 100%")]
    InvalidRequest {
        /// 本次请求的比例 [%]
        requested_pct: f64,
        /// 此前已认领的比例 [%]
        total_pct: f64,
    },

    /// 跨进程接收超时
    #[error("等待 {peer} 的交换消息超时 ({waited_ms} ms)")]
    Timeout {
        /// 对端执行上下文
        peer: Rank,
        /// 已等待时长 [ms]
        waited_ms: u64,
    },

    /// 对端通道已断开
    #[error("与 {peer} 的交换通道已断开")]
    Disconnected {
        /// 对端执行上下文
        peer: Rank,
    },

    /// 消息中的数值标识无法映射回流域单元
    #[error("交换消息携带未知的流域单元标识 gid={gid}")]
    UnknownCatchment {
        /// 消息中的数值标识
        gid: u64,
    },
}

impl ExchangeError {
    /// 是否为协议顺序错误（而非传输故障）
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::StaleTimestep { .. }
                | Self::CompletedTimestep { .. }
                | Self::AlreadySummed { .. }
                | Self::EmptyNexus { .. }
                | Self::InvalidRequest { .. }
        )
    }
}
