// crates/bf_exchange/src/lib.rs

//! 流量交换模块
//!
//! 提供流域单元与汇点之间按时间步移动水量的通用交换协议，包括：
//! - 账本 (ledger) - 单个汇点按时间步记录上游贡献与下游认领
//! - 汇点 (nexus) - 拓扑信息 + 互斥锁保护的账本，contribute / claim 入口
//! - 跨进程传输 (remote) - 上下游位于不同执行上下文时的点对点消息替代
//!
//! # 正确性核心
//!
//! 同一时间步内，任何认领发生之后不允许再添加贡献（"已汇总"错误），
//! 因为这会悄悄改变已发放份额的分母。比例记账只有在被分配总量冻结
//! 之后才有效；状态机不会从 Summed 回到 Open。
//!
//! # 并发模型
//!
//! 单次 contribute / claim 调用在返回前完整执行。账本由每汇点一把
//! 互斥锁保护，允许独立 worker 乱序驱动不同流域单元写入共享汇点；
//! 同一汇点可同时打开多个时间步，下界由 `min_timestep` 控制。

pub mod error;
pub mod ledger;
pub mod nexus;
pub mod remote;

pub use error::ExchangeError;
pub use ledger::{LedgerEntry, NexusLedger};
pub use nexus::Nexus;
pub use remote::{ChannelMesh, ChannelTransport, ExchangeTransport, FlowMessage, RemoteNexus, RemotePeer};
