// crates/bf_model/src/driver.rs

//! 模拟驱动
//!
//! 依据拓扑配置把流域单元接到共享汇点上，逐时间步驱动全部单元。
//! 单元由独立 worker 并行驱动：同一时间步内对共享汇点的贡献顺序
//! 不影响结果（求和可交换），认领针对上一时间步，不与本步贡献
//! 冲突。每步结束后把全部汇点的时间步下界推进到当前步，清除陈旧
//! 簿记。
//!
//! 交换协议错误与质量平衡失败都只记录并计数，不中断模拟。

use crate::et::{Evapotranspiration, NoEt};
use crate::formulation::{Formulation, LinearRunoff, StepStatus};
use bf_config::SimulationConfig;
use bf_exchange::Nexus;
use bf_foundation::{BfError, BfResult, CatchmentId, Timestep};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// 模拟运行报告
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// 启动时刻
    pub started_at: DateTime<Utc>,
    /// 实际运行步数
    pub n_steps: u64,
    /// 时间步长 [s]
    pub dt_s: f64,
    /// 质量平衡检查失败次数
    pub mass_balance_failures: usize,
    /// 交换协议错误次数
    pub exchange_errors: usize,
    /// 各单元逐步出流速率 [m/s]
    pub catchment_outflow: HashMap<CatchmentId, Vec<f64>>,
}

impl RunReport {
    /// 某单元的出流峰值 [m/s]
    pub fn peak_outflow(&self, catchment: &CatchmentId) -> Option<f64> {
        self.catchment_outflow
            .get(catchment)
            .map(|series| series.iter().cloned().fold(0.0, f64::max))
    }
}

/// 单个流域单元的运行器
struct CatchmentRunner {
    id: CatchmentId,
    formulation: LinearRunoff,
    et: Box<dyn Evapotranspiration>,
    outflow_nexus: Option<Arc<Nexus>>,
    inflow_claims: Vec<(Arc<Nexus>, f64)>,
    outflow_series: Vec<f64>,
    mass_failures: usize,
    exchange_errors: usize,
}

impl CatchmentRunner {
    /// 运行一个时间步
    ///
    /// 先从各入流汇点认领上一步份额，再驱动产流公式，最后把出流
    /// 贡献到出流汇点。
    fn step(&mut self, t: Timestep, rain_m: f64, dt_s: f64) -> BfResult<()> {
        let mut routed_in_m = 0.0;
        if t > 0 {
            for (nexus, percent) in &self.inflow_claims {
                match nexus.claim(&self.id, *percent, t - 1) {
                    Ok(rate) => routed_in_m += rate * dt_s,
                    Err(err) => {
                        warn!("{} 在 {} 认领 t={} 失败: {}", self.id, nexus.id(), t - 1, err);
                        self.exchange_errors += 1;
                    }
                }
            }
        }

        let output = self
            .formulation
            .step(dt_s, rain_m + routed_in_m, self.et.as_mut())?;

        if output.status == StepStatus::MassBalanceError {
            warn!("{} 在 t={} 质量平衡检查失败", self.id, t);
            self.mass_failures += 1;
        }

        let rate = output.total_rate();
        if let Some(nexus) = &self.outflow_nexus {
            if let Err(err) = nexus.contribute(&self.id, rate, t) {
                warn!("{} 向 {} 贡献 t={} 失败: {}", self.id, nexus.id(), t, err);
                self.exchange_errors += 1;
            }
        }
        self.outflow_series.push(rate);
        Ok(())
    }
}

/// 流域模拟
pub struct Simulation {
    config: SimulationConfig,
    nexuses: Vec<Arc<Nexus>>,
    runners: Vec<CatchmentRunner>,
}

impl Simulation {
    /// 依据配置构建模拟
    ///
    /// 汇点按拓扑一次性创建并在单元之间共享；拓扑图本身此后只读。
    pub fn from_config(config: SimulationConfig) -> BfResult<Self> {
        config
            .validate()
            .map_err(|err| BfError::config(err.to_string()))?;

        let mut nexuses = Vec::new();
        let mut by_id: HashMap<String, Arc<Nexus>> = HashMap::new();
        for topo in &config.topology.nexuses {
            let nexus = Arc::new(Nexus::with_contributing(
                topo.id.clone(),
                topo.receiving.iter().map(|e| e.catchment.clone()),
                topo.contributing.iter().cloned(),
            ));
            by_id.insert(topo.id.clone(), Arc::clone(&nexus));
            nexuses.push(nexus);
        }

        let mut runners = Vec::new();
        for id in config.topology.catchments() {
            let outflow_nexus = config
                .topology
                .outflow_nexus_of(&id)
                .map(|topo| Arc::clone(&by_id[&topo.id]));
            let inflow_claims = config
                .topology
                .inflow_claims_of(&id)
                .into_iter()
                .map(|(topo, percent)| (Arc::clone(&by_id[&topo.id]), percent))
                .collect();

            runners.push(CatchmentRunner {
                id: id.clone(),
                formulation: LinearRunoff::from_config(&config.formulation)?,
                et: Box::new(NoEt),
                outflow_nexus,
                inflow_claims,
                outflow_series: Vec::with_capacity(config.n_steps as usize),
                mass_failures: 0,
                exchange_errors: 0,
            });
        }

        Ok(Self {
            config,
            nexuses,
            runners,
        })
    }

    /// 为某单元设置蒸散发提供者（缺省无蒸散发）
    pub fn set_et_provider(
        &mut self,
        catchment: &CatchmentId,
        et: Box<dyn Evapotranspiration>,
    ) -> BfResult<()> {
        let runner = self
            .runners
            .iter_mut()
            .find(|r| &r.id == catchment)
            .ok_or_else(|| BfError::not_found(catchment.to_string()))?;
        runner.et = et;
        Ok(())
    }

    /// 单元数量
    pub fn catchment_count(&self) -> usize {
        self.runners.len()
    }

    /// 汇点数量
    pub fn nexus_count(&self) -> usize {
        self.nexuses.len()
    }

    /// 运行全部时间步并生成报告
    pub fn run(&mut self) -> BfResult<RunReport> {
        let started_at = Utc::now();
        let dt_s = self.config.dt_s;
        let n_steps = self.config.n_steps;

        info!(
            "模拟启动: {} 单元, {} 汇点, {} 步, dt={} s",
            self.runners.len(),
            self.nexuses.len(),
            n_steps,
            dt_s
        );

        for t in 0..n_steps {
            let rain_m = self.config.input_at(t);

            self.runners
                .par_iter_mut()
                .try_for_each(|runner| runner.step(t, rain_m, dt_s))?;

            // 本步完成后推进下界，上一步的簿记随之清除
            for nexus in &self.nexuses {
                nexus.advance_floor(t);
            }
        }

        let mass_balance_failures = self.runners.iter().map(|r| r.mass_failures).sum();
        let exchange_errors = self.runners.iter().map(|r| r.exchange_errors).sum();

        info!(
            "模拟完成: 质量平衡失败 {} 次, 交换错误 {} 次",
            mass_balance_failures, exchange_errors
        );

        Ok(RunReport {
            started_at,
            n_steps,
            dt_s,
            mass_balance_failures,
            exchange_errors,
            catchment_outflow: self
                .runners
                .iter()
                .map(|r| (r.id.clone(), r.outflow_series.clone()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_watershed;

    #[test]
    fn test_build_from_demo_config() {
        let sim = Simulation::from_config(demo_watershed()).unwrap();
        assert_eq!(sim.catchment_count(), 5);
        assert_eq!(sim.nexus_count(), 2);
    }

    #[test]
    fn test_run_without_errors() {
        let mut sim = Simulation::from_config(demo_watershed()).unwrap();
        let report = sim.run().unwrap();

        assert_eq!(report.mass_balance_failures, 0);
        assert_eq!(report.exchange_errors, 0);
        assert_eq!(report.catchment_outflow.len(), 5);
        for series in report.catchment_outflow.values() {
            assert_eq!(series.len() as u64, report.n_steps);
        }
    }

    #[test]
    fn test_set_et_provider_unknown_catchment() {
        let mut sim = Simulation::from_config(demo_watershed()).unwrap();
        let result = sim.set_et_provider(&CatchmentId::from("cat-none"), Box::new(NoEt));
        assert!(result.is_err());
    }
}
