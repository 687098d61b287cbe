//! Trajectory Planner - 轨迹规划器
//!
//! 一次性预计算从当前关节位置到目标位置的参考轨迹（每个自由度的位置和速度），
//! 按固定时间步长采样，并在末尾追加若干"稳定步"。
//!
//! # 算法
//!
//! ```text
//! error[dof] = q_desired[dof] - q_current[dof]
//! steps[dof] = ceil(|error| / time_step / |dq_desired|)
//! position[dof][k] = q_current + (error / steps) * k      k ∈ [0, steps)
//! velocity[dof][k] = sign(error) * |dq_desired|
//! max_steps = max(steps) + extra_steps
//! ```
//!
//! 所有自由度都被填充到 `max_steps`：位置填充为 `q_desired`，速度填充为 0。
//! 注意斜坡的最后一个采样点比 `q_desired` 少一个增量，目标值只出现在填充段。
//!
//! # 特性
//!
//! - **一次计算**: 构造后不可变，`[0, max_steps)` 内任意索引都有效
//! - **越界安全**: 超出 `max_steps` 的索引返回稳定点 `(q_desired, 0)`
//! - **快速失败**: 期望速度为 0 而误差非 0 时在构造阶段报错，不产生 NaN/Inf
//!
//! # 示例
//!
//! ```rust
//! use pam_control::trajectory::TrajectoryPlanner;
//!
//! let trajectory = TrajectoryPlanner::new(
//!     vec![10.0; 4],
//!     vec![20.0; 4],
//!     vec![5.0; 4],
//!     0.01,
//! )
//! .with_extra_steps(10)
//! .plan()
//! .unwrap();
//!
//! assert_eq!(trajectory.max_steps(), 210);
//! assert_eq!(trajectory.point(0, 0).position, 10.0);
//! assert_eq!(trajectory.point(0, 209).position, 20.0);
//! ```

use crate::error::{ControlError, Result};
use crate::types::DofArray;
use crate::types::dof::check_len;
use tracing::debug;

/// 单步轨迹上限（防止误配置导致的巨大内存分配）
const MAX_TRAJECTORY_STEPS: usize = 10_000_000;

/// 单个自由度在某一步的参考状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub position: f64,
    pub velocity: f64,
}

/// 轨迹规划器
///
/// 收集规划参数，调用 [`TrajectoryPlanner::plan`] 生成不可变的 [`Trajectory`]。
#[derive(Debug, Clone)]
pub struct TrajectoryPlanner {
    q_current: DofArray<f64>,
    q_desired: DofArray<f64>,
    dq_desired: DofArray<f64>,
    time_step: f64,
    extra_steps: usize,
}

impl TrajectoryPlanner {
    /// 默认稳定步数
    pub const DEFAULT_EXTRA_STEPS: usize = 100;

    /// 创建新的轨迹规划器
    ///
    /// # 参数
    ///
    /// - `q_current`: 当前关节位置（弧度）
    /// - `q_desired`: 目标关节位置（弧度）
    /// - `dq_desired`: 运动过程中的期望速度大小（弧度/秒）
    /// - `time_step`: 控制周期（秒），控制器每 `time_step` 被推进一次
    pub fn new(
        q_current: impl Into<DofArray<f64>>,
        q_desired: impl Into<DofArray<f64>>,
        dq_desired: impl Into<DofArray<f64>>,
        time_step: f64,
    ) -> Self {
        TrajectoryPlanner {
            q_current: q_current.into(),
            q_desired: q_desired.into(),
            dq_desired: dq_desired.into(),
            time_step,
            extra_steps: Self::DEFAULT_EXTRA_STEPS,
        }
    }

    /// 设置稳定步数
    ///
    /// 轨迹末尾追加 `extra_steps` 个 `(q_desired, 0)` 参考点，帮助系统稳定。
    pub fn with_extra_steps(mut self, extra_steps: usize) -> Self {
        self.extra_steps = extra_steps;
        self
    }

    /// 计算轨迹
    ///
    /// # 错误
    ///
    /// - 各数组长度不一致：[`ControlError::LengthMismatch`]
    /// - `time_step` 非有限正数：[`ControlError::InvalidTimeStep`]
    /// - 位置/速度包含 NaN/Inf：[`ControlError::NonFinite`]
    /// - 误差非 0 而期望速度为 0：[`ControlError::ZeroDesiredSpeed`]
    pub fn plan(self) -> Result<Trajectory> {
        let nb_dofs = self.q_current.len();
        if nb_dofs == 0 {
            return Err(ControlError::InvalidConfig(
                "trajectory needs at least one dof".to_string(),
            ));
        }
        check_len("q_desired", nb_dofs, self.q_desired.len())?;
        check_len("dq_desired", nb_dofs, self.dq_desired.len())?;

        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(ControlError::InvalidTimeStep(self.time_step));
        }

        let mut nominal_steps = Vec::with_capacity(nb_dofs);
        for dof in 0..nb_dofs {
            nominal_steps.push(self.steps_for(dof)?);
        }

        let max_steps = nominal_steps.iter().copied().max().unwrap_or(0) + self.extra_steps;

        let mut positions = Vec::with_capacity(nb_dofs);
        let mut velocities = Vec::with_capacity(nb_dofs);
        for (dof, &steps) in nominal_steps.iter().enumerate() {
            let current = self.q_current[dof];
            let desired = self.q_desired[dof];
            let error = desired - current;
            let velocity = error.signum() * self.dq_desired[dof].abs();

            let mut position_ramp: Vec<f64> = (0..steps)
                .map(|step| (error / steps as f64) * step as f64 + current)
                .collect();
            let mut velocity_profile = vec![velocity; steps];

            position_ramp.resize(max_steps, desired);
            velocity_profile.resize(max_steps, 0.0);

            positions.push(position_ramp);
            velocities.push(velocity_profile);
        }

        debug!(
            "Planned trajectory: {} dofs, nominal steps {:?}, max_steps {}",
            nb_dofs, nominal_steps, max_steps
        );

        Ok(Trajectory {
            positions: positions.into(),
            velocities: velocities.into(),
            q_desired: self.q_desired,
            nominal_steps: nominal_steps.into(),
            max_steps,
            time_step: self.time_step,
        })
    }

    /// 单个自由度穿越误差所需的步数
    fn steps_for(&self, dof: usize) -> Result<usize> {
        let current = self.q_current[dof];
        let desired = self.q_desired[dof];
        if !current.is_finite() {
            return Err(ControlError::NonFinite {
                what: "q_current",
                dof,
            });
        }
        if !desired.is_finite() {
            return Err(ControlError::NonFinite {
                what: "q_desired",
                dof,
            });
        }

        let error = desired - current;
        if error == 0.0 {
            return Ok(0);
        }

        let speed = self.dq_desired[dof].abs();
        if speed.is_infinite() {
            return Err(ControlError::NonFinite {
                what: "dq_desired",
                dof,
            });
        }
        if speed.is_nan() || speed == 0.0 {
            return Err(ControlError::ZeroDesiredSpeed { dof, error });
        }

        let steps = (error.abs() / self.time_step / speed).ceil();
        if steps > MAX_TRAJECTORY_STEPS as f64 {
            return Err(ControlError::InvalidConfig(format!(
                "dof {} needs {} steps (limit {})",
                dof, steps, MAX_TRAJECTORY_STEPS
            )));
        }
        Ok(steps as usize)
    }
}

/// 预计算的参考轨迹
///
/// 构造后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    positions: DofArray<Vec<f64>>,
    velocities: DofArray<Vec<f64>>,
    q_desired: DofArray<f64>,
    nominal_steps: DofArray<usize>,
    max_steps: usize,
    time_step: f64,
}

impl Trajectory {
    /// 自由度数量
    #[inline]
    pub fn nb_dofs(&self) -> usize {
        self.positions.len()
    }

    /// 轨迹总步数 `max(steps) + extra_steps`
    #[inline]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// 规划时使用的时间步长（秒）
    #[inline]
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// 轨迹总时长（秒）
    pub fn duration_s(&self) -> f64 {
        self.max_steps as f64 * self.time_step
    }

    /// 目标位置
    pub fn q_desired(&self) -> &DofArray<f64> {
        &self.q_desired
    }

    /// 每个自由度斜坡段的步数（不含填充）
    pub fn nominal_steps(&self) -> &DofArray<usize> {
        &self.nominal_steps
    }

    /// 某个自由度的完整位置序列（长度 `max_steps`）
    pub fn positions(&self, dof: usize) -> &[f64] {
        &self.positions[dof]
    }

    /// 某个自由度的完整速度序列（长度 `max_steps`）
    pub fn velocities(&self, dof: usize) -> &[f64] {
        &self.velocities[dof]
    }

    /// 某个自由度在第 `step` 步的参考点
    ///
    /// `step >= max_steps` 时返回稳定点 `(q_desired, 0)`。
    ///
    /// # Panics
    ///
    /// `dof >= nb_dofs()` 时 panic。
    pub fn point(&self, dof: usize, step: usize) -> TrajectoryPoint {
        match (self.positions[dof].get(step), self.velocities[dof].get(step)) {
            (Some(&position), Some(&velocity)) => TrajectoryPoint { position, velocity },
            _ => TrajectoryPoint {
                position: self.q_desired[dof],
                velocity: 0.0,
            },
        }
    }

    /// 所有自由度在第 `step` 步的参考点
    pub fn sample(&self, step: usize) -> DofArray<TrajectoryPoint> {
        (0..self.nb_dofs()).map(|dof| self.point(dof, step)).collect()
    }

    /// 按步迭代：每一项是所有自由度的 `(位置, 速度)`
    pub fn iter(&self) -> TrajectoryIter<'_> {
        TrajectoryIter {
            trajectory: self,
            index: 0,
        }
    }
}

/// [`Trajectory::iter`] 返回的迭代器
pub struct TrajectoryIter<'a> {
    trajectory: &'a Trajectory,
    index: usize,
}

impl Iterator for TrajectoryIter<'_> {
    type Item = (DofArray<f64>, DofArray<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.trajectory.max_steps {
            return None;
        }

        let sample = self.trajectory.sample(self.index);
        self.index += 1;

        let positions = sample.iter().map(|p| p.position).collect();
        let velocities = sample.iter().map(|p| p.velocity).collect();
        Some((positions, velocities))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.trajectory.max_steps.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TrajectoryIter<'_> {}
