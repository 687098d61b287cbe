//! Dummy Sink - 进程内模拟的 PAM 机器人
//!
//! 用于测试和命令行演示，不依赖任何真实后端。
//!
//! # 模型
//!
//! 每个仿真周期（`tick_period`）：
//!
//! 1. 每块肌肉的压力以不超过 `pressure_rate` 的速率逼近目标压力
//! 2. 关节加速度与压力差成正比，带弹性回复和粘性阻尼：
//!
//! ```text
//! acc = gain * (p_antago - p_ago) - stiffness * q - damping * q_vel
//! ```
//!
//! 拮抗肌压力更高时关节向正方向运动。
//!
//! # 写入模式
//!
//! - `Wait(d)`: 推进 `ceil(d / tick_period)` 个周期
//! - `Burst(n)`: 推进 `n` 个周期
//! - `FireAndForget`: 只更新目标，由下一次推进（或显式 [`DummySink::step`]）生效

use crate::error::Result;
use crate::sink::{ActuationSink, Observation, WriteMode};
use crate::types::dof::check_len;
use crate::types::{ActuatorBounds, DofArray, PressureCommand};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// 模拟器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DummyError {
    /// 命令长度与自由度数不一致
    #[error("Command has {actual} entries, dummy robot has {expected} dofs")]
    LengthMismatch { expected: usize, actual: usize },
}

/// 模拟器参数
#[derive(Debug, Clone, PartialEq)]
pub struct DummyConfig {
    /// 仿真周期
    pub tick_period: Duration,
    /// 每个周期的最大压力变化量
    pub pressure_rate: i32,
    /// 压力差到角加速度的增益
    pub gain: f64,
    /// 弹性回复系数
    pub stiffness: f64,
    /// 粘性阻尼系数
    pub damping: f64,
}

impl Default for DummyConfig {
    fn default() -> Self {
        DummyConfig {
            tick_period: Duration::from_millis(1),
            pressure_rate: 200,
            gain: 0.004,
            stiffness: 20.0,
            damping: 10.0,
        }
    }
}

/// 模拟的 PAM 机器人
#[derive(Debug, Clone)]
pub struct DummySink {
    config: DummyConfig,
    bounds: Arc<ActuatorBounds>,
    pressures: DofArray<PressureCommand>,
    targets: DofArray<PressureCommand>,
    q: DofArray<f64>,
    q_vel: DofArray<f64>,
    ticks: u64,
}

impl DummySink {
    /// 创建模拟器
    ///
    /// 初始压力为各肌肉压力范围的中点，初始关节位置与速度为 0。
    pub fn new(config: DummyConfig, bounds: Arc<ActuatorBounds>) -> Result<Self> {
        if config.tick_period.is_zero() {
            return Err(crate::error::ControlError::InvalidConfig(
                "dummy tick_period must be > 0".to_string(),
            ));
        }

        let nb_dofs = bounds.nb_dofs();
        let pressures: DofArray<PressureCommand> = bounds
            .iter()
            .map(|b| {
                PressureCommand::new(midpoint(b.min_ago, b.max_ago), midpoint(b.min_antago, b.max_antago))
            })
            .collect();

        Ok(DummySink {
            config,
            targets: pressures.clone(),
            pressures,
            q: DofArray::splat(nb_dofs, 0.0),
            q_vel: DofArray::splat(nb_dofs, 0.0),
            ticks: 0,
            bounds,
        })
    }

    /// 设置初始关节位置
    pub fn with_positions(mut self, q: impl Into<DofArray<f64>>) -> Result<Self> {
        let q = q.into();
        check_len("positions", self.nb_dofs(), q.len())?;
        self.q = q;
        Ok(self)
    }

    /// 设置初始压力（同时作为目标，钳位到边界）
    pub fn with_pressures(mut self, pressures: impl Into<DofArray<PressureCommand>>) -> Result<Self> {
        let pressures = pressures.into();
        check_len("pressures", self.nb_dofs(), pressures.len())?;
        self.pressures = self.bounds.clamp_all(pressures);
        self.targets = self.pressures.clone();
        Ok(self)
    }

    pub fn nb_dofs(&self) -> usize {
        self.bounds.nb_dofs()
    }

    /// 已推进的仿真周期数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 已推进的仿真时间
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.config.tick_period.as_secs_f64() * self.ticks as f64)
    }

    /// 当前目标压力
    pub fn targets(&self) -> &DofArray<PressureCommand> {
        &self.targets
    }

    /// 推进一个仿真周期
    pub fn step(&mut self) {
        let dt = self.config.tick_period.as_secs_f64();
        let rate = self.config.pressure_rate.max(0);

        for dof in 0..self.nb_dofs() {
            let target = self.targets[dof];
            let current = &mut self.pressures[dof];
            current.ago = approach(current.ago, target.ago, rate);
            current.antago = approach(current.antago, target.antago, rate);

            let diff = f64::from(current.antago) - f64::from(current.ago);
            let acc = self.config.gain * diff
                - self.config.stiffness * self.q[dof]
                - self.config.damping * self.q_vel[dof];
            self.q_vel[dof] += acc * dt;
            self.q[dof] += self.q_vel[dof] * dt;
        }

        self.ticks += 1;
    }

    /// 推进 `n` 个仿真周期
    pub fn advance(&mut self, n: u64) {
        for _ in 0..n {
            self.step();
        }
    }

    fn ticks_for(&self, duration: Duration) -> u64 {
        let ticks = duration.as_nanos().div_ceil(self.config.tick_period.as_nanos());
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}

/// 区间中点（向下取整，不溢出）
fn midpoint(min: i32, max: i32) -> i32 {
    let mid = (i64::from(min) + i64::from(max)).div_euclid(2);
    i32::try_from(mid).unwrap_or(min)
}

/// 以不超过 `rate` 的步长逼近目标
fn approach(current: i32, target: i32, rate: i32) -> i32 {
    let rate = i64::from(rate);
    let delta = (i64::from(target) - i64::from(current)).clamp(-rate, rate);
    // 结果介于 current 与 target 之间
    i32::try_from(i64::from(current) + delta).unwrap_or(target)
}

impl ActuationSink for DummySink {
    type Error = DummyError;

    fn read(&mut self) -> std::result::Result<Observation, DummyError> {
        Ok(Observation {
            p_ago: self.pressures.iter().map(|p| p.ago).collect(),
            p_antago: self.pressures.iter().map(|p| p.antago).collect(),
            q: self.q.clone(),
            q_vel: self.q_vel.clone(),
        })
    }

    fn write(
        &mut self,
        command: &[PressureCommand],
        mode: WriteMode,
    ) -> std::result::Result<(), DummyError> {
        if command.len() != self.nb_dofs() {
            return Err(DummyError::LengthMismatch {
                expected: self.nb_dofs(),
                actual: command.len(),
            });
        }

        for (dof, &c) in command.iter().enumerate() {
            self.targets[dof] = self.bounds[dof].clamp(c);
        }

        let ticks = match mode {
            WriteMode::Wait(duration) => self.ticks_for(duration),
            WriteMode::Burst(n) => u64::from(n),
            WriteMode::FireAndForget => 0,
        };
        trace!("dummy write {:?}: advancing {} ticks", mode, ticks);
        self.advance(ticks);
        Ok(())
    }
}
