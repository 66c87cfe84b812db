// apps\bf_cli\src/main.rs

//! BasinFlow 命令行界面
//!
//! 提供流域产流路由模拟的命令行工具。
//!
//! # 架构层级
//!
//! 本模块属于应用层：只组合 bf_config 与 bf_model 的公开接口，
//! 不直接触碰账本或水库内部状态。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// BasinFlow 流域产流路由模拟命令行工具
#[derive(Parser)]
#[command(name = "bf_cli")]
#[command(author = "BasinFlow Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BasinFlow runoff routing simulator", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行模拟
    Run(commands::run::RunArgs),
    /// 显示配置信息
    Info(commands::info::InfoArgs),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 执行命令
    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
