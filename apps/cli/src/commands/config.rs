//! 配置管理命令
//!
//! 查看、校验和生成控制配置文件。

use super::load_config;
use anyhow::{Context, Result};
use clap::Subcommand;
use pam_control::ControlConfig;
use std::path::{Path, PathBuf};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印当前生效的配置（TOML）
    Show,

    /// 检查配置文件
    Check {
        /// 配置文件路径（默认使用 --config）
        path: Option<PathBuf>,
    },

    /// 生成默认配置文件
    Init {
        /// 输出路径
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, config_path: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(config_path),
            ConfigCommand::Check { path } => Self::check_(path.as_deref().or(config_path)),
            ConfigCommand::Init { path, force } => Self::init_(&path, force),
        }
    }

    fn show_(config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(path: Option<&Path>) -> Result<()> {
        let path = path.ok_or_else(|| anyhow::anyhow!("未指定配置文件，请传入路径或使用 --config"))?;
        let config = load_config(Some(path))?;

        println!("✅ 配置有效: {}", path.display());
        println!("  策略: {}", config.strategy);
        println!("  自由度: {}", config.nb_dofs());
        println!("  时间步长: {} s", config.time_step);
        for (dof, d) in config.dofs.iter().enumerate() {
            println!(
                "  [{}] ago {}..{}, antago {}..{}, kp {}, ki {}, kd {}, ndp {}",
                dof, d.min_ago, d.max_ago, d.min_antago, d.max_antago, d.kp, d.ki, d.kd, d.ndp
            );
        }
        Ok(())
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        ControlConfig::default_config()
            .save_to_file(path)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        println!("✅ 已生成默认配置: {}", path.display());
        Ok(())
    }
}
