//! 移动命令
//!
//! 按配置选定的控制策略，在模拟机器人上运动到目标位置：
//! 比例 PID 沿规划轨迹运动，模式切换控制器运动到收敛或超时。

use super::{format_positions, install_interrupt_flag, load_config};
use crate::validation::{PositionValidator, ensure_positive, parse_per_dof};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use pam_control::dummy::{DummyConfig, DummySink};
use pam_control::loop_runner::{LoopConfig, LoopReport, run_controller_until};
use pam_control::{ActuationSink, ControlConfig, PressureController, StrategyKind, WriteMode};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// 模式切换策略的默认超时（秒）
const DEFAULT_MODE_SWITCH_TIMEOUT_S: f64 = 10.0;

/// 命令行可选的控制策略
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    RatioPid,
    ModeSwitching,
}

impl From<StrategyArg> for StrategyKind {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::RatioPid => StrategyKind::RatioPid,
            StrategyArg::ModeSwitching => StrategyKind::ModeSwitching,
        }
    }
}

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标位置（弧度），逗号分隔；单个值表示所有自由度相同
    #[arg(long)]
    pub to: String,

    /// 控制策略（覆盖配置文件中的 strategy）
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// 期望速度（弧度/秒，比例 PID）
    #[arg(long, default_value = "0.5")]
    pub speed: String,

    /// 收敛阈值（弧度，模式切换）
    #[arg(long, default_value = "0.01")]
    pub tolerance: String,

    /// 超时时间（秒）；模式切换默认 10 秒，比例 PID 默认不限
    #[arg(long)]
    pub timeout: Option<f64>,

    /// 按真实时间节拍运行（否则尽快完成仿真）
    #[arg(long)]
    pub realtime: bool,
}

impl MoveCommand {
    pub fn execute(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        let running = install_interrupt_flag()?;

        let (report, strategy, to) = self.run(config, || !running.load(Ordering::SeqCst))?;

        let q = report.last_observation.q.as_slice();
        let errors: Vec<f64> = to.iter().zip(q).map(|(t, q)| t - q).collect();
        if report.stopped {
            println!("⚠️ 已中断（{} 个周期，{:?}）", report.iterations, report.elapsed);
        } else if report.timed_out {
            println!("❌ 超时：{:?} 内未到达目标", report.elapsed);
        } else {
            println!("✅ {} 完成（{} 个周期，{:?}）", strategy, report.iterations, report.elapsed);
        }
        println!("  最终位置: [{}]", format_positions(q));
        println!("  位置误差: [{}]", format_positions(&errors));

        Ok(())
    }

    /// 构造并运行选定的控制器，返回报告、实际策略和目标位置
    pub fn run<F>(
        &self,
        mut config: ControlConfig,
        should_stop: F,
    ) -> Result<(LoopReport, StrategyKind, Vec<f64>)>
    where
        F: FnMut() -> bool,
    {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        let nb_dofs = config.nb_dofs();

        let to = parse_per_dof("to", &self.to, nb_dofs)?;
        let speed = parse_per_dof("speed", &self.speed, nb_dofs)?;
        let tolerance = parse_per_dof("tolerance", &self.tolerance, nb_dofs)?;
        PositionValidator::default_range().validate(&to)?;
        ensure_positive("speed", &speed)?;
        ensure_positive("tolerance", &tolerance)?;
        let timeout = self.timeout(config.strategy)?;

        let bounds = Arc::new(config.bounds()?);
        let mut sink = DummySink::new(DummyConfig::default(), bounds.clone())?;
        let initial = sink.read()?;

        let controller = config
            .build_strategy(bounds, &initial, to.clone(), speed, tolerance)
            .context("构造控制器失败")?;

        // 比例 PID 按 time_step 等待；模式切换使用 [mode_switch] 的写入模式
        let default_period = Duration::from_secs_f64(config.time_step);
        let period = controller.iteration_duration().unwrap_or(default_period);
        let loop_config = LoopConfig {
            frequency_hz: self.realtime.then_some(1.0 / period.as_secs_f64()),
            max_iterations: None,
            timeout,
            write_mode: WriteMode::Wait(default_period),
        };

        println!("⏳ {} 运动到 [{}]", config.strategy, format_positions(&to));
        let report = run_controller_until(&mut sink, controller, &loop_config, should_stop)?;
        Ok((report, config.strategy, to))
    }

    fn timeout(&self, strategy: StrategyKind) -> Result<Option<Duration>> {
        let seconds = match (self.timeout, strategy) {
            (Some(seconds), _) => seconds,
            (None, StrategyKind::ModeSwitching) => DEFAULT_MODE_SWITCH_TIMEOUT_S,
            (None, StrategyKind::RatioPid) => return Ok(None),
        };
        if !seconds.is_finite() || seconds <= 0.0 {
            anyhow::bail!("timeout 必须为正数，得到 {}", seconds);
        }
        Ok(Some(Duration::from_secs_f64(seconds)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(to: &str, strategy: Option<StrategyArg>) -> MoveCommand {
        MoveCommand {
            to: to.to_string(),
            strategy,
            speed: "1.0".to_string(),
            tolerance: "0.02".to_string(),
            timeout: None,
            realtime: false,
        }
    }

    #[test]
    fn test_strategy_from_config() {
        let mut config = ControlConfig::default_config();
        config.strategy = StrategyKind::ModeSwitching;
        config.mode_switch.gains = Some(vec![pam_control::types::PidGains::pd(0.01, 0.005); 4]);

        let (report, strategy, _) = command("0.2", None).run(config, || false).unwrap();
        assert_eq!(strategy, StrategyKind::ModeSwitching);
        assert!(report.finished);
        assert!(!report.timed_out);
        // 每条命令等待 iteration_duration_ms
        assert_eq!(report.elapsed, Duration::from_millis(10) * report.iterations as u32);
    }

    #[test]
    fn test_strategy_override() {
        let mut config = ControlConfig::default_config();
        config.strategy = StrategyKind::ModeSwitching;

        let (report, strategy, _) = command("0.2", Some(StrategyArg::RatioPid))
            .run(config, || false)
            .unwrap();
        assert_eq!(strategy, StrategyKind::RatioPid);
        assert!(report.finished);
    }

    #[test]
    fn test_mode_switching_default_timeout() {
        let cmd = command("0.2", None);
        assert_eq!(cmd.timeout(StrategyKind::RatioPid).unwrap(), None);
        assert_eq!(
            cmd.timeout(StrategyKind::ModeSwitching).unwrap(),
            Some(Duration::from_secs(10))
        );

        let cmd = MoveCommand {
            timeout: Some(-1.0),
            ..command("0.2", None)
        };
        assert!(cmd.timeout(StrategyKind::RatioPid).is_err());
    }

    #[test]
    fn test_invalid_target() {
        let config = ControlConfig::default_config();
        assert!(command("0.1,0.2", None).run(config, || false).is_err());
    }
}
