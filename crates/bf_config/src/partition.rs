// crates/bf_config/src/partition.rs

//! 分区配置
//!
//! 跨进程运行时，外部分区描述把每个汇点的上下游单元分配到进程
//! rank。核心对远端边只需要两件事：对端 rank 与线上消息使用的
//! 全局一致数值标识。

use crate::error::ConfigError;
use bf_foundation::{CatchmentId, Rank};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// 单个流域单元的分区条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionEntry {
    /// 流域单元
    pub catchment: CatchmentId,
    /// 线上消息数值标识（全局唯一）
    pub gid: u64,
    /// 所在 rank
    pub rank: Rank,
}

/// 分区配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// 全部条目
    #[serde(default)]
    pub entries: Vec<PartitionEntry>,
}

impl PartitionConfig {
    /// 校验：单元与数值标识都不得重复
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut catchments = BTreeSet::new();
        let mut gids = BTreeSet::new();
        for entry in &self.entries {
            if !catchments.insert(&entry.catchment) {
                return Err(ConfigError::Topology(format!(
                    "分区中流域单元重复: {}",
                    entry.catchment
                )));
            }
            if !gids.insert(entry.gid) {
                return Err(ConfigError::Topology(format!(
                    "分区中数值标识重复: gid={}",
                    entry.gid
                )));
            }
        }
        Ok(())
    }

    /// 某单元所在的 rank
    pub fn rank_of(&self, catchment: &CatchmentId) -> Option<Rank> {
        self.entries
            .iter()
            .find(|e| &e.catchment == catchment)
            .map(|e| e.rank)
    }

    /// 某单元的线上数值标识
    pub fn gid_of(&self, catchment: &CatchmentId) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| &e.catchment == catchment)
            .map(|e| e.gid)
    }

    /// 数值标识 → 单元 的完整映射
    pub fn wire_ids(&self) -> HashMap<u64, CatchmentId> {
        self.entries
            .iter()
            .map(|e| (e.gid, e.catchment.clone()))
            .collect()
    }

    /// 配置覆盖的 rank 数量
    pub fn rank_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.rank)
            .collect::<BTreeSet<_>>()
            .len()
    }
}
