// apps\bf_cli\src\commands\validate.rs

//! 验证配置命令

use anyhow::{Context, Result};
use bf_config::SimulationConfig;
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info};

/// 验证配置参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    let config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("读取配置失败: {}", args.config.display()))?;

    match config.validate() {
        Ok(()) => {
            info!("配置有效: {}", args.config.display());
            info!(
                "{} 汇点, {} 单元, {} 步",
                config.topology.nexuses.len(),
                config.topology.catchments().len(),
                config.n_steps
            );
            Ok(())
        }
        Err(err) => {
            error!("配置无效: {}", err);
            Err(err.into())
        }
    }
}
