// apps\bf_cli\src\commands\info.rs

//! 显示配置信息命令

use anyhow::{Context, Result};
use bf_config::SimulationConfig;
use bf_model::demo_watershed;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// 显示信息参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径（缺省显示内置演示流域）
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("读取配置失败: {}", path.display()))?,
        None => demo_watershed(),
    };

    info!("步数: {}, dt: {} s", config.n_steps, config.dt_s);
    info!("流域单元: {}", config.topology.catchments().len());

    for nexus in &config.topology.nexuses {
        let upstream: Vec<_> = nexus.contributing.iter().map(|c| c.to_string()).collect();
        let downstream: Vec<_> = nexus
            .receiving
            .iter()
            .map(|e| format!("{} ({}%)", e.catchment, e.percent))
            .collect();
        info!(
            "汇点 {}: 上游 [{}] -> 下游 [{}]",
            nexus.id,
            upstream.join(", "),
            downstream.join(", ")
        );
    }

    if let Some(partition) = &config.partition {
        info!(
            "分区: {} 条目, {} 个 rank",
            partition.entries.len(),
            partition.rank_count()
        );
    }

    Ok(())
}
