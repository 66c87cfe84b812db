// tests/exchange_protocol.rs

//! 交换协议守恒与状态机验证测试
//!
//! # 测试覆盖
//!
//! - 分水守恒：认领比例合计恰为 100% 时，发放总量等于贡献总量
//! - 贡献顺序无关性
//! - 禁止重开：首次认领后不再接受贡献
//! - 下界推进的幂等性
//! - 端到端分配与完成
//! - 并发 worker 写入共享汇点

use bf_exchange::{ExchangeError, Nexus};
use bf_foundation::CatchmentId;

fn cat(id: &str) -> CatchmentId {
    CatchmentId::from(id)
}

// ============================================================================
// 分水守恒
// ============================================================================

#[test]
fn test_conservation_under_splitting() {
    let splits: [&[f64]; 4] = [
        &[100.0],
        &[60.0, 40.0],
        &[50.0, 25.0, 25.0],
        &[12.5, 12.5, 25.0, 10.0, 40.0],
    ];

    for (case, percents) in splits.iter().enumerate() {
        let nexus = Nexus::new(format!("nex-{case}"), []);
        nexus.contribute(&cat("cat-a"), 3.75, 0).unwrap();
        nexus.contribute(&cat("cat-b"), 6.25, 0).unwrap();
        let total_in = 10.0;

        let mut total_out = 0.0;
        for (i, &pct) in percents.iter().enumerate() {
            total_out += nexus.claim(&cat(&format!("cat-down-{i}")), pct, 0).unwrap();
        }

        println!(
            "分水 {:?}: 发放合计 {:.12}，残差 {:.2e}",
            percents,
            total_out,
            total_in - total_out
        );
        assert!(
            (total_in - total_out).abs() < 1e-12,
            "分水不守恒！比例 {:?} 残差 {:.2e}",
            percents,
            total_in - total_out
        );
        assert!(nexus.is_completed(0));
    }
}

#[test]
fn test_contribution_order_invariance() {
    let flows = [(("cat-1"), 1.5), (("cat-2"), 2.5), (("cat-3"), 6.0)];

    // 三种排列下的汇总结果应完全一致
    let permutations: [[usize; 3]; 3] = [[0, 1, 2], [2, 0, 1], [1, 2, 0]];
    let mut sums = Vec::new();

    for perm in permutations {
        let nexus = Nexus::new("nex-1", []);
        for &i in &perm {
            let (id, v) = flows[i];
            nexus.contribute(&cat(id), v, 7).unwrap();
        }
        sums.push(nexus.claim(&cat("cat-down"), 100.0, 7).unwrap());
    }

    assert!((sums[0] - sums[1]).abs() < 1e-15);
    assert!((sums[1] - sums[2]).abs() < 1e-15);
    assert!((sums[0] - 10.0).abs() < 1e-12);
}

// ============================================================================
// 状态机
// ============================================================================

#[test]
fn test_no_reopening_after_any_claim() {
    for first_claim_pct in [1.0, 50.0, 99.0] {
        let nexus = Nexus::new("nex-1", []);
        nexus.contribute(&cat("cat-1"), 10.0, 0).unwrap();
        nexus.claim(&cat("cat-2"), first_claim_pct, 0).unwrap();

        let err = nexus.contribute(&cat("cat-3"), 1.0, 0).unwrap_err();
        assert_eq!(
            err,
            ExchangeError::AlreadySummed { t: 0 },
            "首次认领 {}% 后贡献未被拒绝",
            first_claim_pct
        );
    }
}

#[test]
fn test_end_to_end_allocation() {
    let nexus = Nexus::with_contributing("nex-1", [cat("cat-2"), cat("cat-3")], [cat("cat-1")]);

    nexus.contribute(&cat("cat-1"), 10.0, 0).unwrap();

    let first = nexus.claim(&cat("cat-2"), 60.0, 0).unwrap();
    assert!((first - 6.0).abs() < 1e-12);

    let second = nexus.claim(&cat("cat-3"), 40.0, 0).unwrap();
    assert!((second - 4.0).abs() < 1e-12);
    assert!(nexus.is_completed(0));

    let err = nexus.claim(&cat("cat-4"), 1.0, 0).unwrap_err();
    assert_eq!(err, ExchangeError::CompletedTimestep { t: 0 });
}

#[test]
fn test_failed_claim_leaves_state_untouched() {
    let nexus = Nexus::new("nex-1", []);
    nexus.contribute(&cat("cat-1"), 10.0, 0).unwrap();
    nexus.claim(&cat("cat-2"), 70.0, 0).unwrap();

    // 超额认领失败
    assert!(matches!(
        nexus.claim(&cat("cat-3"), 31.0, 0),
        Err(ExchangeError::InvalidRequest { .. })
    ));

    // 剩余 30% 仍然可以正常认领
    let rest = nexus.claim(&cat("cat-3"), 30.0, 0).unwrap();
    assert!((rest - 3.0).abs() < 1e-12);
    assert!(nexus.is_completed(0));
}

// ============================================================================
// 下界推进
// ============================================================================

#[test]
fn test_advance_floor_idempotent() {
    let nexus = Nexus::new("nex-1", []);
    for t in 0..10 {
        nexus.contribute(&cat("cat-1"), f64::from(t as u32), t).unwrap();
    }

    nexus.advance_floor(4);
    let snapshot: Vec<_> = (0..10).map(|t| nexus.inspect_upstream_flows(t)).collect();

    // 重复推进与回退请求都不改变剩余条目
    nexus.advance_floor(4);
    nexus.advance_floor(4);
    nexus.advance_floor(1);

    for t in 0..10u64 {
        assert_eq!(
            nexus.inspect_upstream_flows(t),
            snapshot[t as usize],
            "时间步 {} 的记录被重复推进改变",
            t
        );
    }
    // 下界以下被清除，以上保留
    assert_eq!(nexus.inspect_upstream_flows(3), (0.0, 0));
    assert_eq!(nexus.inspect_upstream_flows(4), (4.0, 1));
    assert_eq!(nexus.min_timestep(), 4);

    // 清除后旧时间步立即失效
    assert!(matches!(
        nexus.contribute(&cat("cat-1"), 1.0, 2),
        Err(ExchangeError::StaleTimestep { t: 2, min: 4 })
    ));
}

#[test]
fn test_independent_timesteps_progress_at_different_paces() {
    let nexus = Nexus::new("nex-1", []);

    // 上游先行贡献多个时间步
    for t in 0..4 {
        nexus.contribute(&cat("cat-1"), 2.0, t).unwrap();
    }

    // 下游落后一个时间步逐个认领
    for t in 0..3 {
        let released = nexus.claim(&cat("cat-2"), 100.0, t).unwrap();
        assert!((released - 2.0).abs() < 1e-12);
        assert!(nexus.is_completed(t));
    }

    // t=3 仍处于打开状态
    assert_eq!(nexus.inspect_upstream_flows(3), (2.0, 1));
}

// ============================================================================
// 并发访问
// ============================================================================

#[test]
fn test_parallel_contributions_into_shared_nexus() {
    use rayon::prelude::*;
    use std::sync::Arc;

    let nexus = Arc::new(Nexus::new("nex-1", []));
    let n_workers: usize = 32;

    (0..n_workers).into_par_iter().for_each(|i| {
        let id = cat(&format!("cat-{i}"));
        nexus.contribute(&id, 0.5, 0).unwrap();
    });

    let (total, count) = nexus.inspect_upstream_flows(0);
    assert_eq!(count, n_workers);
    assert!((total - 0.5 * n_workers as f64).abs() < 1e-12);

    let released = nexus.claim(&cat("cat-down"), 100.0, 0).unwrap();
    assert!((released - 16.0).abs() < 1e-12);
}
