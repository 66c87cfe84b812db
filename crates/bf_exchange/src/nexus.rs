// crates/bf_exchange/src/nexus.rs

//! 汇点
//!
//! 一个汇合点：若干上游流域单元的出流在此合并，再按比例分给若干
//! 下游流域单元。汇点在模拟开始前由水文地理拓扑一次性创建，存活
//! 整个模拟期；核心从不修改拓扑图本身。
//!
//! 账本由每汇点一把互斥锁保护，contribute / claim 可以由独立
//! worker 并发调用；安全性来自状态机的错误响应，而不是调用顺序
//! 约定。

use crate::error::ExchangeError;
use crate::ledger::NexusLedger;
use bf_foundation::{CatchmentId, Timestep};
use parking_lot::Mutex;
use std::collections::BTreeSet;

/// 汇合点
///
/// 拓扑字段在构造后只读；可变状态只有锁内的账本。
#[derive(Debug)]
pub struct Nexus {
    id: String,
    contributing: BTreeSet<CatchmentId>,
    receiving: BTreeSet<CatchmentId>,
    ledger: Mutex<NexusLedger>,
}

impl Nexus {
    /// 创建汇点（只给出下游）
    pub fn new(id: impl Into<String>, receiving: impl IntoIterator<Item = CatchmentId>) -> Self {
        Self::with_contributing(id, receiving, [])
    }

    /// 创建汇点（给出上下游）
    pub fn with_contributing(
        id: impl Into<String>,
        receiving: impl IntoIterator<Item = CatchmentId>,
        contributing: impl IntoIterator<Item = CatchmentId>,
    ) -> Self {
        Self {
            id: id.into(),
            contributing: contributing.into_iter().collect(),
            receiving: receiving.into_iter().collect(),
            ledger: Mutex::new(NexusLedger::new()),
        }
    }

    /// 汇点标识
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 上游流域单元集合
    pub fn contributing(&self) -> &BTreeSet<CatchmentId> {
        &self.contributing
    }

    /// 下游流域单元集合
    pub fn receiving(&self) -> &BTreeSet<CatchmentId> {
        &self.receiving
    }

    /// 记录一笔上游贡献
    pub fn contribute(
        &self,
        catchment: &CatchmentId,
        value_m: f64,
        t: Timestep,
    ) -> Result<(), ExchangeError> {
        self.ledger.lock().contribute(catchment, value_m, t)
    }

    /// 认领该时间步贡献总量的一个百分比份额
    pub fn claim(
        &self,
        catchment: &CatchmentId,
        percent: f64,
        t: Timestep,
    ) -> Result<f64, ExchangeError> {
        self.ledger.lock().claim(catchment, percent, t)
    }

    /// 推进最小时间步，清除其下的记录
    pub fn advance_floor(&self, new_min_t: Timestep) {
        self.ledger.lock().advance_floor(new_min_t);
    }

    /// 当前最小时间步
    pub fn min_timestep(&self) -> Timestep {
        self.ledger.lock().min_timestep()
    }

    /// 查看某时间步的上游贡献 (总量, 笔数)
    pub fn inspect_upstream_flows(&self, t: Timestep) -> (f64, usize) {
        self.ledger.lock().inspect_upstream_flows(t)
    }

    /// 查看某时间步的下游认领 (比例合计, 笔数)
    pub fn inspect_downstream_requests(&self, t: Timestep) -> (f64, usize) {
        self.ledger.lock().inspect_downstream_requests(t)
    }

    /// 时间步是否已分配完毕
    pub fn is_completed(&self, t: Timestep) -> bool {
        self.ledger.lock().is_completed(t)
    }
}
