//! 命令定义和实现

pub mod config;
pub mod r#move;
pub mod plan;

pub use config::ConfigCommand;
pub use r#move::MoveCommand;
pub use plan::PlanCommand;

use anyhow::{Context, Result};
use pam_control::ControlConfig;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 加载控制配置：指定路径时从文件读取，否则使用默认配置
pub fn load_config(path: Option<&Path>) -> Result<ControlConfig> {
    match path {
        Some(path) => ControlConfig::load_from_file(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display())),
        None => Ok(ControlConfig::default_config()),
    }
}

/// 设置 Ctrl+C 处理，返回运行标志
pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        println!("\n收到退出信号，正在停止...");
    })
    .context("设置 Ctrl+C 处理失败")?;

    Ok(running)
}

/// 格式化位置数组
pub fn format_positions(values: &[f64]) -> String {
    values.iter().map(|v| format!("{:+.4}", v)).collect::<Vec<_>>().join(", ")
}
