// crates/bf_exchange/src/remote.rs

//! 跨进程流量交换
//!
//! 当一个汇点的上下游流域单元位于不同执行上下文（进程 / rank）时，
//! contribute / claim 被替换为一次点对点阻塞交换：`(时间步, 水量)`
//! 打包成固定布局消息发给对端；接收方收到消息后仍在本地执行同一套
//! 交换协议状态机。替换的只是传输方式，协议不变量不变。
//!
//! 每次接收是整个分布式运行中唯一真正的跨进程同步点。接收带显式
//! 截止时间：对端停滞时返回 [`ExchangeError::Timeout`]，而不是无限
//! 阻塞拖死整个运行。

use crate::error::ExchangeError;
use crate::nexus::Nexus;
use bf_foundation::{CatchmentId, Rank, Timestep};
use bytemuck::{Pod, Zeroable};
use log::debug;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// 交换消息的线上字节数
pub const FLOW_MESSAGE_BYTES: usize = 24;

/// 固定布局的交换消息
///
/// 与原始三字段布局一致：时间步、流域单元数值标识、水量。
/// 数值标识由分区配置给出（字符串 ID 不上线）。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlowMessage {
    /// 时间步（单调递增的消息标签）
    pub timestep: Timestep,
    /// 流域单元数值标识
    pub catchment_gid: u64,
    /// 水量 [m]
    pub flow_m: f64,
}

impl FlowMessage {
    /// 编码为固定长度字节
    pub fn to_bytes(self) -> [u8; FLOW_MESSAGE_BYTES] {
        let mut bytes = [0u8; FLOW_MESSAGE_BYTES];
        bytes.copy_from_slice(bytemuck::bytes_of(&self));
        bytes
    }

    /// 从固定长度字节解码
    pub fn from_bytes(bytes: &[u8; FLOW_MESSAGE_BYTES]) -> Self {
        *bytemuck::from_bytes(bytes)
    }
}

/// 点对点交换传输
///
/// 发送不阻塞；接收阻塞到消息到达或超过截止时间。
pub trait ExchangeTransport {
    /// 向对端发送一条消息
    fn send(&self, peer: Rank, message: FlowMessage) -> Result<(), ExchangeError>;

    /// 从对端接收一条消息，最多等待 `deadline`
    fn recv(&self, peer: Rank, deadline: Duration) -> Result<FlowMessage, ExchangeError>;
}

/// 基于内存通道的传输实现
///
/// 每对 rank 之间一条有向通道。单个传输实例归属一个 rank，
/// 随该 rank 的 worker 线程移动。
pub struct ChannelTransport {
    rank: Rank,
    senders: HashMap<Rank, Sender<[u8; FLOW_MESSAGE_BYTES]>>,
    receivers: HashMap<Rank, Receiver<[u8; FLOW_MESSAGE_BYTES]>>,
}

impl ChannelTransport {
    /// 本传输实例归属的 rank
    pub fn rank(&self) -> Rank {
        self.rank
    }
}

impl ExchangeTransport for ChannelTransport {
    fn send(&self, peer: Rank, message: FlowMessage) -> Result<(), ExchangeError> {
        let sender = self
            .senders
            .get(&peer)
            .ok_or(ExchangeError::Disconnected { peer })?;
        debug!(
            "{} -> {}: t={} gid={} flow={:.6e}",
            self.rank, peer, message.timestep, message.catchment_gid, message.flow_m
        );
        sender
            .send(message.to_bytes())
            .map_err(|_| ExchangeError::Disconnected { peer })
    }

    fn recv(&self, peer: Rank, deadline: Duration) -> Result<FlowMessage, ExchangeError> {
        let receiver = self
            .receivers
            .get(&peer)
            .ok_or(ExchangeError::Disconnected { peer })?;
        match receiver.recv_timeout(deadline) {
            Ok(bytes) => Ok(FlowMessage::from_bytes(&bytes)),
            Err(RecvTimeoutError::Timeout) => Err(ExchangeError::Timeout {
                peer,
                waited_ms: deadline.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(ExchangeError::Disconnected { peer }),
        }
    }
}

/// 通道网格构建器
pub struct ChannelMesh;

impl ChannelMesh {
    /// 构建 n 个 rank 的全连接传输
    ///
    /// 返回的第 i 个传输归属 `Rank(i)`，与其余每个 rank 之间各有一条
    /// 有向通道。
    pub fn fully_connected(n: u32) -> Vec<ChannelTransport> {
        let mut transports: Vec<ChannelTransport> = (0..n)
            .map(|i| ChannelTransport {
                rank: Rank(i),
                senders: HashMap::new(),
                receivers: HashMap::new(),
            })
            .collect();

        for from in 0..n {
            for to in 0..n {
                if from == to {
                    continue;
                }
                let (tx, rx) = mpsc::channel();
                transports[from as usize].senders.insert(Rank(to), tx);
                transports[to as usize].receivers.insert(Rank(from), rx);
            }
        }
        transports
    }
}

/// 远端流域单元的位置信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemotePeer {
    /// 所在执行上下文
    pub rank: Rank,
    /// 线上消息使用的数值标识
    pub gid: u64,
}

/// 带跨进程传输的汇点
///
/// 包装一个本地 [`Nexus`] 与「流域单元 → 对端」映射。本地单元直通
/// 本地账本；远端上游单元的贡献通过阻塞接收获得，远端下游单元的
/// 认领在本地计算后把份额发给对端。两侧副本运行同一状态机。
pub struct RemoteNexus<T: ExchangeTransport> {
    local: Nexus,
    peers: HashMap<CatchmentId, RemotePeer>,
    gid_index: HashMap<u64, CatchmentId>,
    transport: T,
    deadline: Duration,
}

impl<T: ExchangeTransport> RemoteNexus<T> {
    /// 创建
    ///
    /// `wire_ids` 把可能出现在入站消息里的数值标识映射回流域单元；
    /// 分区配置对所有跨进程可见的单元给出全局一致的数值标识，因此
    /// 发送方携带的下游单元标识在接收方同样可解析。
    pub fn new(
        local: Nexus,
        peers: HashMap<CatchmentId, RemotePeer>,
        wire_ids: HashMap<u64, CatchmentId>,
        transport: T,
        deadline: Duration,
    ) -> Self {
        let mut gid_index = wire_ids;
        for (id, peer) in &peers {
            gid_index.entry(peer.gid).or_insert_with(|| id.clone());
        }
        Self {
            local,
            peers,
            gid_index,
            transport,
            deadline,
        }
    }

    /// 本地汇点
    pub fn local(&self) -> &Nexus {
        &self.local
    }

    /// 记录一笔上游贡献
    ///
    /// `catchment` 为远端单元时执行一次阻塞接收（带截止时间），把
    /// 消息携带的 `(时间步, 水量)` 应用到本地状态机；此时传入的
    /// `value_m` / `t` 仅表示本方已准备好接收，线上数据为准。
    pub fn contribute(
        &self,
        catchment: &CatchmentId,
        value_m: f64,
        t: Timestep,
    ) -> Result<(), ExchangeError> {
        match self.peers.get(catchment) {
            Some(peer) => {
                let message = self.transport.recv(peer.rank, self.deadline)?;
                let from = self
                    .gid_index
                    .get(&message.catchment_gid)
                    .ok_or(ExchangeError::UnknownCatchment {
                        gid: message.catchment_gid,
                    })?;
                self.local.contribute(from, message.flow_m, message.timestep)
            }
            None => self.local.contribute(catchment, value_m, t),
        }
    }

    /// 认领份额
    ///
    /// 份额总是先由本地状态机计算，保证本方簿记准确；`catchment`
    /// 为远端单元时再把结果发往对端。
    pub fn claim(
        &self,
        catchment: &CatchmentId,
        percent: f64,
        t: Timestep,
    ) -> Result<f64, ExchangeError> {
        let flow_m = self.local.claim(catchment, percent, t)?;

        if let Some(peer) = self.peers.get(catchment) {
            self.transport.send(
                peer.rank,
                FlowMessage {
                    timestep: t,
                    catchment_gid: peer.gid,
                    flow_m,
                },
            )?;
        }
        Ok(flow_m)
    }

    /// 推进最小时间步
    pub fn advance_floor(&self, new_min_t: Timestep) {
        self.local.advance_floor(new_min_t);
    }
}
