//! # PAM CLI
//!
//! 气动肌肉机器人压力控制的命令行工具。所有运动命令都运行在进程内的模拟机器人上。
//!
//! ```bash
//! # 生成默认配置
//! pam-cli config init control.toml
//!
//! # 查看规划的轨迹
//! pam-cli plan --to 0.5,0.5,-0.2,0.0 --speed 0.5
//!
//! # 按配置文件中的 strategy 运动到目标
//! pam-cli -c control.toml move --to 0.5,0.5,-0.2,0.0
//!
//! # 覆盖策略：模式切换控制器
//! pam-cli move --strategy mode-switching --to 0.3 --tolerance 0.01 --timeout 10
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod validation;

use commands::{ConfigCommand, MoveCommand, PlanCommand};

/// PAM CLI - 气动肌肉压力控制命令行工具
#[derive(Parser, Debug)]
#[command(name = "pam-cli")]
#[command(about = "Command-line interface for pneumatic muscle pressure control", long_about = None)]
#[command(version)]
struct Cli {
    /// 控制配置文件（TOML），未指定时使用默认配置
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 规划轨迹并打印摘要
    Plan {
        #[command(flatten)]
        args: PlanCommand,
    },

    /// 按选定的控制策略运动到目标
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pam_cli=info".parse()?)
                .add_directive("pam_control=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(config_path),
        Commands::Plan { args } => args.execute(config_path),
        Commands::Move { args } => args.execute(config_path),
    }
}
