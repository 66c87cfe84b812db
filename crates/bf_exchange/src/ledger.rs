// crates/bf_exchange/src/ledger.rs

//! 汇点账本
//!
//! 单个汇点按时间步的流量簿记。每个时间步条目在首次贡献时惰性创建；
//! 当已认领比例进入 100% 的完成容差（见
//! [`tolerance::PCT_COMPLETION_EPSILON`]）时整个条目被删除，时间步
//! 移入完成集合。低于 `min_timestep` 的条目在下界推进时成段清除。
//!
//! # 状态机（按 (汇点, t) 对）
//!
//! ```text
//! Empty ──contribute──► Open ──claim──► Summed ──claim──► … ──► Completed
//! ```
//!
//! Summed 之后不接受新贡献；任何状态都不会回到 Open。
//!
//! 账本使用有序映射，下界推进通过 `split_off` 摘除前缀区间，
//! 不在遍历中删除。

use crate::error::ExchangeError;
use bf_foundation::tolerance;
use bf_foundation::{CatchmentId, Timestep};
use std::collections::{BTreeMap, BTreeSet};

/// 单个时间步的账本条目
#[derive(Debug, Clone, Default)]
pub struct LedgerEntry {
    /// 上游贡献 (流域单元, 水量)
    pub upstream_flows: Vec<(CatchmentId, f64)>,
    /// 下游认领 (流域单元, 比例)
    pub downstream_requests: Vec<(CatchmentId, f64)>,
    /// 冻结后的贡献总量；`None` 表示尚未有认领
    pub summed_flow: Option<f64>,
    /// 已认领比例合计 [%]
    pub total_requested_pct: f64,
}

/// 汇点账本
#[derive(Debug, Default)]
pub struct NexusLedger {
    entries: BTreeMap<Timestep, LedgerEntry>,
    completed: BTreeSet<Timestep>,
    min_timestep: Timestep,
}

impl NexusLedger {
    /// 创建空账本
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前最小时间步
    pub fn min_timestep(&self) -> Timestep {
        self.min_timestep
    }

    /// 记录一笔上游贡献
    ///
    /// 首次贡献为该时间步创建条目（Empty → Open）。该时间步已有任何
    /// 下游认领时返回 [`ExchangeError::AlreadySummed`]。
    pub fn contribute(
        &mut self,
        catchment: &CatchmentId,
        value_m: f64,
        t: Timestep,
    ) -> Result<(), ExchangeError> {
        self.check_timestep(t)?;

        let entry = self.entries.entry(t).or_default();
        if entry.summed_flow.is_some() {
            return Err(ExchangeError::AlreadySummed { t });
        }
        entry.upstream_flows.push((catchment.clone(), value_m));
        Ok(())
    }

    /// 认领该时间步贡献总量的一个百分比份额
    ///
    /// 首次认领冻结贡献总量（Open → Summed）并返回比例份额；
    /// 后续认领在不超过 100% 的前提下继续发放。发放后若剩余比例
    /// 小于完成容差，删除条目并把时间步记入完成集合。
    pub fn claim(
        &mut self,
        catchment: &CatchmentId,
        percent: f64,
        t: Timestep,
    ) -> Result<f64, ExchangeError> {
        self.check_timestep(t)?;

        if percent > tolerance::FULL_ALLOCATION_PCT {
            let total_pct = self
                .entries
                .get(&t)
                .map(|e| e.total_requested_pct)
                .unwrap_or(0.0);
            return Err(ExchangeError::InvalidRequest {
                requested_pct: percent,
                total_pct,
            });
        }

        let entry = match self.entries.get_mut(&t) {
            Some(entry) => entry,
            None => return Err(ExchangeError::EmptyNexus { t }),
        };

        let released_m = match entry.summed_flow {
            None => {
                // 首次认领：冻结分母
                let sum: f64 = entry.upstream_flows.iter().map(|(_, v)| v).sum();
                entry.summed_flow = Some(sum);
                entry.total_requested_pct = percent;
                entry.downstream_requests.push((catchment.clone(), percent));
                sum * percent / tolerance::FULL_ALLOCATION_PCT
            }
            Some(sum) => {
                if entry.total_requested_pct + percent > tolerance::FULL_ALLOCATION_PCT {
                    return Err(ExchangeError::InvalidRequest {
                        requested_pct: percent,
                        total_pct: entry.total_requested_pct,
                    });
                }
                entry.total_requested_pct += percent;
                entry.downstream_requests.push((catchment.clone(), percent));
                sum * percent / tolerance::FULL_ALLOCATION_PCT
            }
        };

        if tolerance::is_fully_allocated(entry.total_requested_pct) {
            // 全部水量已认领，清除簿记
            self.entries.remove(&t);
            self.completed.insert(t);
        }

        Ok(released_m)
    }

    /// 推进最小时间步，清除其下的全部记录
    ///
    /// 下界单调：低于当前值的请求被忽略。清除通过前缀摘除完成，
    /// 对相同或递增的参数重复调用不改变剩余条目。
    pub fn advance_floor(&mut self, new_min_t: Timestep) {
        if new_min_t <= self.min_timestep {
            return;
        }
        self.min_timestep = new_min_t;
        self.entries = self.entries.split_off(&new_min_t);
        self.completed = self.completed.split_off(&new_min_t);
    }

    /// 查看某时间步的上游贡献 (总量, 笔数)，不改变状态
    pub fn inspect_upstream_flows(&self, t: Timestep) -> (f64, usize) {
        match self.entries.get(&t) {
            Some(entry) => {
                let total: f64 = entry.upstream_flows.iter().map(|(_, v)| v).sum();
                (total, entry.upstream_flows.len())
            }
            None => (0.0, 0),
        }
    }

    /// 查看某时间步的下游认领 (比例合计, 笔数)，不改变状态
    pub fn inspect_downstream_requests(&self, t: Timestep) -> (f64, usize) {
        match self.entries.get(&t) {
            Some(entry) => (entry.total_requested_pct, entry.downstream_requests.len()),
            None => (0.0, 0),
        }
    }

    /// 时间步是否已分配完毕
    pub fn is_completed(&self, t: Timestep) -> bool {
        self.completed.contains(&t)
    }

    /// 当前打开（已有贡献、未完成）的时间步数量
    pub fn open_timesteps(&self) -> usize {
        self.entries.len()
    }

    /// 公共前置检查：时间步不低于下界且未完成
    fn check_timestep(&self, t: Timestep) -> Result<(), ExchangeError> {
        if t < self.min_timestep {
            return Err(ExchangeError::StaleTimestep {
                t,
                min: self.min_timestep,
            });
        }
        if self.completed.contains(&t) {
            return Err(ExchangeError::CompletedTimestep { t });
        }
        Ok(())
    }
}
