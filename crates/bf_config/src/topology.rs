// crates/bf_config/src/topology.rs

//! 流域拓扑配置
//!
//! 汇点 ↔ 流域单元的静态邻接关系，由外部水文地理读取器在模拟开始
//! 前装载。每个汇点的下游认领比例来自拓扑本身，单个汇点所有认领
//! 比例之和不得超过 100%。核心在装载后从不修改该图。

use crate::error::ConfigError;
use bf_foundation::CatchmentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 下游认领条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverEntry {
    /// 下游流域单元
    pub catchment: CatchmentId,
    /// 认领比例 [%]
    pub percent: f64,
}

/// 单个汇点的拓扑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NexusTopology {
    /// 汇点标识
    pub id: String,
    /// 上游流域单元
    #[serde(default)]
    pub contributing: Vec<CatchmentId>,
    /// 下游流域单元与认领比例
    #[serde(default)]
    pub receiving: Vec<ReceiverEntry>,
}

impl NexusTopology {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::Topology("汇点标识不得为空".into()));
        }

        let mut total_pct = 0.0;
        for entry in &self.receiving {
            if !(0.0..=100.0).contains(&entry.percent) {
                return Err(ConfigError::Topology(format!(
                    "汇点 {} 下游 {} 认领比例 {} 越界 [0, 100]",
                    self.id, entry.catchment, entry.percent
                )));
            }
            total_pct += entry.percent;
        }
        if total_pct > 100.0 + 1e-9 {
            return Err(ConfigError::Topology(format!(
                "汇点 {} 下游认领比例合计 {:.6}% 超过 100%",
                self.id, total_pct
            )));
        }

        let unique: BTreeSet<_> = self.receiving.iter().map(|e| &e.catchment).collect();
        if unique.len() != self.receiving.len() {
            return Err(ConfigError::Topology(format!(
                "汇点 {} 存在重复的下游单元",
                self.id
            )));
        }
        Ok(())
    }
}

/// 流域拓扑配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// 全部汇点
    #[serde(default)]
    pub nexuses: Vec<NexusTopology>,
}

impl TopologyConfig {
    /// 校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for nexus in &self.nexuses {
            nexus.validate()?;
            if !seen.insert(&nexus.id) {
                return Err(ConfigError::Topology(format!(
                    "汇点标识重复: {}",
                    nexus.id
                )));
            }
        }
        Ok(())
    }

    /// 某单元出流汇入的汇点
    pub fn outflow_nexus_of(&self, catchment: &CatchmentId) -> Option<&NexusTopology> {
        self.nexuses
            .iter()
            .find(|n| n.contributing.contains(catchment))
    }

    /// 某单元从各汇点认领的 (汇点, 比例) 列表
    pub fn inflow_claims_of(&self, catchment: &CatchmentId) -> Vec<(&NexusTopology, f64)> {
        self.nexuses
            .iter()
            .filter_map(|n| {
                n.receiving
                    .iter()
                    .find(|e| &e.catchment == catchment)
                    .map(|e| (n, e.percent))
            })
            .collect()
    }

    /// 拓扑中出现的全部流域单元
    pub fn catchments(&self) -> BTreeSet<CatchmentId> {
        let mut all = BTreeSet::new();
        for nexus in &self.nexuses {
            all.extend(nexus.contributing.iter().cloned());
            all.extend(nexus.receiving.iter().map(|e| e.catchment.clone()));
        }
        all
    }
}
