//! 轨迹规划命令
//!
//! 打印规划出的参考轨迹摘要，不驱动任何执行端。

use super::{format_positions, load_config};
use crate::validation::{PositionValidator, ensure_positive, parse_per_dof};
use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

/// 轨迹规划命令参数
#[derive(Args, Debug)]
pub struct PlanCommand {
    /// 起始位置（弧度），逗号分隔；单个值表示所有自由度相同
    #[arg(long, default_value = "0.0")]
    pub from: String,

    /// 目标位置（弧度），逗号分隔；单个值表示所有自由度相同
    #[arg(long)]
    pub to: String,

    /// 期望速度（弧度/秒）
    #[arg(long, default_value = "0.5")]
    pub speed: String,

    /// 打印的采样点数量
    #[arg(long, default_value_t = 5)]
    pub samples: usize,
}

impl PlanCommand {
    pub fn execute(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        let nb_dofs = config.nb_dofs();

        let from = parse_per_dof("from", &self.from, nb_dofs)?;
        let to = parse_per_dof("to", &self.to, nb_dofs)?;
        let speed = parse_per_dof("speed", &self.speed, nb_dofs)?;
        let validator = PositionValidator::default_range();
        validator.validate(&from)?;
        validator.validate(&to)?;
        ensure_positive("speed", &speed)?;

        let trajectory = config.planner(from, to, speed).plan().context("轨迹规划失败")?;

        println!("自由度: {}", trajectory.nb_dofs());
        println!("时间步长: {} s", trajectory.time_step());
        println!("斜坡步数: {:?}", trajectory.nominal_steps().as_slice());
        println!("总步数: {}", trajectory.max_steps());
        println!("总时长: {:.3} s", trajectory.duration_s());

        let max_steps = trajectory.max_steps();
        if self.samples == 0 || max_steps == 0 {
            return Ok(());
        }

        println!();
        println!("{:>8}  位置 / 速度", "步");
        let stride = (max_steps / self.samples).max(1);
        let mut indices: Vec<usize> = (0..max_steps).step_by(stride).take(self.samples).collect();
        if indices.last() != Some(&(max_steps - 1)) {
            indices.push(max_steps - 1);
        }
        for step in indices {
            let sample = trajectory.sample(step);
            let positions: Vec<f64> = sample.iter().map(|p| p.position).collect();
            let velocities: Vec<f64> = sample.iter().map(|p| p.velocity).collect();
            println!(
                "{:>8}  [{}] / [{}]",
                step,
                format_positions(&positions),
                format_positions(&velocities)
            );
        }

        Ok(())
    }
}
