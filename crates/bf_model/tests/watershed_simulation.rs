// tests/watershed_simulation.rs

//! 流域端到端模拟验证测试
//!
//! 演示流域：两个源头单元汇入 nex-1，按 60/40 分给中游两单元，
//! 中游出流汇入 nex-2 后全部进入出口单元。
//!
//! # 测试覆盖
//!
//! - 全程无质量平衡失败、无交换协议错误
//! - 路由有效：下游单元获得的水量多于仅靠降雨的源头单元
//! - 下界推进后陈旧时间步被拒绝
//! - 非法拓扑在构建期被拒绝

use bf_config::{ReceiverEntry, SimulationConfig};
use bf_foundation::CatchmentId;
use bf_model::{demo_watershed, ProportionalEt, Simulation};

fn cat(id: &str) -> CatchmentId {
    CatchmentId::from(id)
}

#[test]
fn test_demo_watershed_runs_clean() {
    let mut sim = Simulation::from_config(demo_watershed()).unwrap();
    let report = sim.run().unwrap();

    assert_eq!(report.mass_balance_failures, 0, "存在质量平衡失败");
    assert_eq!(report.exchange_errors, 0, "存在交换协议错误");

    // 全部单元都产生了出流
    for (id, series) in &report.catchment_outflow {
        let peak: f64 = series.iter().cloned().fold(0.0, f64::max);
        println!("{id}: 峰值 {:.3e} m/s", peak);
        assert!(peak > 0.0, "{} 没有出流", id);
    }
}

#[test]
fn test_routing_accumulates_downstream() {
    let mut sim = Simulation::from_config(demo_watershed()).unwrap();
    let report = sim.run().unwrap();

    let volume = |id: &str| -> f64 {
        report.catchment_outflow[&cat(id)]
            .iter()
            .map(|rate| rate * report.dt_s)
            .sum()
    };

    let headwater = volume("cat-1");
    let outlet = volume("cat-5");
    println!(
        "源头出流量 {:.6e} m, 出口出流量 {:.6e} m",
        headwater, outlet
    );
    // 出口单元除同样的降雨外还收到全部上游来水
    assert!(outlet > headwater, "下游未累积上游来水");

    // 中游 60/40 分水：cat-3 收到的份额多于 cat-4
    assert!(volume("cat-3") > volume("cat-4"));
}

#[test]
fn test_et_reduces_outflow() {
    let mut reference = Simulation::from_config(demo_watershed()).unwrap();
    let base = reference.run().unwrap();

    let mut with_et = Simulation::from_config(demo_watershed()).unwrap();
    with_et
        .set_et_provider(&cat("cat-1"), Box::new(ProportionalEt { fraction: 0.2 }))
        .unwrap();
    let report = with_et.run().unwrap();

    assert_eq!(report.mass_balance_failures, 0, "蒸散发破坏质量平衡");

    let total = |r: &bf_model::RunReport| -> f64 {
        r.catchment_outflow[&cat("cat-1")].iter().sum()
    };
    assert!(
        total(&report) < total(&base),
        "蒸散发未减少出流"
    );
}

#[test]
fn test_oversubscribed_topology_rejected_at_build() {
    let mut config = demo_watershed();
    config.topology.nexuses[0].receiving.push(ReceiverEntry {
        catchment: cat("cat-9"),
        percent: 10.0,
    });
    assert!(Simulation::from_config(config).is_err());
}

#[test]
fn test_partial_claims_leave_remainder_unclaimed() {
    // 下游只认领 50%：剩余水量留在账本中直到下界推进清除，
    // 不构成错误
    let mut config = demo_watershed();
    config.topology.nexuses[1].receiving = vec![ReceiverEntry {
        catchment: cat("cat-5"),
        percent: 50.0,
    }];

    let mut sim = Simulation::from_config(config).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.exchange_errors, 0);
    assert_eq!(report.mass_balance_failures, 0);
}

#[test]
fn test_single_catchment_no_nexus() {
    // 拓扑只有一个汇点、一个上游单元、无下游：出流累积在汇点中
    // 由下界推进清除
    let mut config = SimulationConfig {
        n_steps: 12,
        ..demo_watershed()
    };
    config.topology.nexuses.truncate(1);
    config.topology.nexuses[0].receiving.clear();

    let mut sim = Simulation::from_config(config).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.exchange_errors, 0);
}
