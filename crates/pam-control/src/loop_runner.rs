//! Loop Runner - 控制循环包装器
//!
//! 驱动任意 [`PressureController`] 与执行端交互：
//! 读取 → 计算 → 写入，直到控制器完成、达到最大迭代次数或被外部中断。
//!
//! # 核心功能
//!
//! - **精确定时**: 使用 `spin_sleep` 实现低抖动的周期节拍（可选）
//! - **外部中断**: [`run_controller_until`] 接受停止条件（如 Ctrl+C 标志）
//! - **超时**: 按控制时间累计（控制器声明的周期时长优先）
//! - **写入模式**: 控制器声明的写入模式优先于 [`LoopConfig::write_mode`]
//! - **错误传播**: 透明传播控制器和执行端错误
//!
//! # 示例
//!
//! ```rust
//! use pam_control::dummy::{DummyConfig, DummySink};
//! use pam_control::loop_runner::{run_controller, LoopConfig};
//! use pam_control::ratio_pid::RatioPidController;
//! use pam_control::sink::WriteMode;
//! use pam_control::trajectory::TrajectoryPlanner;
//! use pam_control::types::{ActuatorBounds, DofBounds, PidGains};
//! use std::sync::Arc;
//!
//! let bounds = Arc::new(ActuatorBounds::uniform(2, DofBounds::symmetric(5000, 20000)).unwrap());
//! let mut sink = DummySink::new(DummyConfig::default(), bounds.clone()).unwrap();
//!
//! let trajectory = TrajectoryPlanner::new(vec![0.0; 2], vec![1.0; 2], vec![1.0; 2], 0.25)
//!     .with_extra_steps(10)
//!     .plan()
//!     .unwrap();
//! let controller =
//!     RatioPidController::new(trajectory, bounds, vec![PidGains::pd(0.5, 0.05); 2], vec![0.5; 2])
//!         .unwrap();
//!
//! let config = LoopConfig {
//!     frequency_hz: None, // 不限速
//!     max_iterations: None,
//!     timeout: None,
//!     write_mode: WriteMode::Burst(10),
//! };
//! let report = run_controller(&mut sink, controller, &config).unwrap();
//! assert!(report.finished);
//! assert_eq!(report.iterations, 14);
//! ```

use crate::controller::PressureController;
use crate::error::{ControlError, Result};
use crate::sink::{ActuationSink, Observation, WriteMode};
use spin_sleep::SpinSleeper;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 控制循环配置
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    ///
    /// `None` 表示不限速（尽可能快，适合 burst 模式和仿真）。
    pub frequency_hz: Option<f64>,

    /// 最大迭代次数（None 表示运行到控制器完成）
    pub max_iterations: Option<usize>,

    /// 超时时间（None 表示不限）
    ///
    /// 每条命令计入 [`PressureController::iteration_duration`]，
    /// 控制器未声明时计入标称周期，不限速时计入实测耗时。
    pub timeout: Option<Duration>,

    /// 默认写入模式（控制器未声明 [`PressureController::write_mode`] 时使用）
    pub write_mode: WriteMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: Some(100.0), // 默认 100Hz
            max_iterations: None,
            timeout: None,
            write_mode: WriteMode::FireAndForget,
        }
    }
}

impl LoopConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if let Some(frequency_hz) = self.frequency_hz {
            if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
                return Err(ControlError::InvalidConfig(format!(
                    "Invalid frequency_hz: {} (must be > 0)",
                    frequency_hz
                )));
            }
            if frequency_hz > 10000.0 {
                warn!(
                    "Very high control frequency: {} Hz. This may cause performance issues.",
                    frequency_hz
                );
            }
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ControlError::InvalidConfig("timeout must be > 0".to_string()));
        }
        Ok(())
    }

    /// 标称周期
    pub fn period(&self) -> Option<Duration> {
        self.frequency_hz.map(|hz| Duration::from_secs_f64(1.0 / hz))
    }
}

/// 控制循环结束报告
#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    /// 实际发送的命令数
    pub iterations: usize,
    /// 控制器是否已完成
    pub finished: bool,
    /// 是否因外部停止条件退出
    pub stopped: bool,
    /// 是否超时
    pub timed_out: bool,
    /// 累计控制时间
    pub elapsed: Duration,
    /// 最后一次观测
    pub last_observation: Observation,
}

/// 运行控制循环
///
/// 这是一个阻塞函数，会持续运行直到：
/// - 控制器完成（返回 `Ok(None)`）
/// - 达到 `max_iterations`（如果设置）
/// - 超过 `timeout`（如果设置）
/// - 发生错误
///
/// # 示例
///
/// 见[模块文档](self)。
pub fn run_controller<S, C>(sink: S, controller: C, config: &LoopConfig) -> Result<LoopReport>
where
    S: ActuationSink,
    C: PressureController,
{
    run_controller_until(sink, controller, config, || false)
}

/// 运行控制循环，每个周期开始前检查 `should_stop`
///
/// 用于响应 Ctrl+C 等外部中断。
pub fn run_controller_until<S, C, F>(
    mut sink: S,
    mut controller: C,
    config: &LoopConfig,
    mut should_stop: F,
) -> Result<LoopReport>
where
    S: ActuationSink,
    C: PressureController,
    F: FnMut() -> bool,
{
    config.validate()?;

    let period = config.period();
    let sleeper = SpinSleeper::default();
    let mut observation = sink.read().map_err(ControlError::sink)?;
    let mut iterations = 0;
    let mut stopped = false;
    let mut timed_out = false;
    let mut elapsed = Duration::ZERO;
    let write_mode = controller.write_mode().unwrap_or(config.write_mode);

    debug!(
        "Control loop starting: {} dofs, period {:?}, write mode {:?}",
        observation.nb_dofs(),
        period,
        write_mode
    );

    loop {
        if let Some(max_iter) = config.max_iterations
            && iterations >= max_iter
        {
            break;
        }

        if should_stop() {
            info!("Control loop stopped after {} iterations", iterations);
            stopped = true;
            break;
        }

        let start = Instant::now();

        let Some(command) = controller.next_command(&observation)? else {
            break;
        };
        sink.write(command.as_slice(), write_mode).map_err(ControlError::sink)?;
        iterations += 1;

        observation = sink.read().map_err(ControlError::sink)?;

        elapsed += controller
            .iteration_duration()
            .or(period)
            .unwrap_or_else(|| start.elapsed());
        if let Some(timeout) = config.timeout
            && elapsed > timeout
        {
            warn!(
                "Control loop timed out after {:?} ({} iterations) before the controller finished",
                elapsed, iterations
            );
            timed_out = true;
            break;
        }

        if let Some(period) = period {
            let spent = start.elapsed();
            if spent < period {
                sleeper.sleep(period - spent);
            } else {
                debug!("Control iteration overran: {:?} > {:?}", spent, period);
            }
        }
    }

    let finished = controller.is_finished();
    if finished {
        info!("Controller finished after {} iterations", iterations);
    }

    Ok(LoopReport {
        iterations,
        finished,
        stopped,
        timed_out,
        elapsed,
        last_observation: observation,
    })
}
