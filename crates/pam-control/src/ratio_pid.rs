//! Ratio PID Controller - 主动肌/拮抗肌压力比 PID 控制器
//!
//! 沿预规划轨迹计算 PID 控制信号，再将控制信号映射为每个自由度的一对肌肉压力。
//!
//! # 算法
//!
//! ```text
//! error    = trajectory.position[dof][step] - position
//! d_error  = trajectory.velocity[dof][step] - velocity
//! integral += error                          （原始单位，不乘时间步长）
//! control  = clamp(Kp * error + Kd * d_error + Ki * integral, -1, 1)
//!
//! p_ago    = min_ago    + range_ago    * (ndp - control)
//! p_antago = min_antago + range_antago * (ndp + control)
//! ```
//!
//! `ndp` 是每个自由度的压力水平增益（0 ~ 1），决定名义共收缩基线：越大，两块肌肉的压力越高。
//! 结果截断为整数，并**强制**钳位到执行器边界：`ndp ± control` 本身并不保证落在 `[0, 1]`。
//!
//! # 示例
//!
//! ```rust
//! use pam_control::ratio_pid::RatioPidController;
//! use pam_control::trajectory::TrajectoryPlanner;
//! use pam_control::types::{ActuatorBounds, DofBounds, PidGains};
//! use std::sync::Arc;
//!
//! let trajectory = TrajectoryPlanner::new(vec![0.0; 2], vec![0.5; 2], vec![1.0; 2], 0.01)
//!     .with_extra_steps(20)
//!     .plan()
//!     .unwrap();
//! let bounds = Arc::new(ActuatorBounds::uniform(2, DofBounds::symmetric(5000, 20000)).unwrap());
//!
//! let mut controller = RatioPidController::new(
//!     trajectory,
//!     bounds,
//!     vec![PidGains::new(0.5, 0.0, 0.05); 2],
//!     vec![0.5; 2],
//! )
//! .unwrap();
//!
//! while controller.has_next() {
//!     // 每个控制周期：读取关节状态 -> 计算压力 -> 发送
//!     let pressures = controller.advance(&[0.0, 0.0], &[0.0, 0.0]).unwrap();
//!     assert_eq!(pressures.len(), 2);
//! }
//! ```

use crate::controller::PressureController;
use crate::error::{ControlError, Result};
use crate::sink::Observation;
use crate::trajectory::Trajectory;
use crate::types::dof::check_len;
use crate::types::{ActuatorBounds, DofArray, DofBounds, PidGains, PressureCommand};
use std::sync::Arc;
use tracing::{debug, trace};

/// 单个自由度最近一步的诊断记录
///
/// 每次 [`RatioPidController::advance`] 覆盖写入，不累积历史。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Introspection {
    /// 本次使用的步索引
    pub step: usize,
    /// 测量位置
    pub position: f64,
    /// 测量速度
    pub velocity: f64,
    /// 参考位置
    pub desired_position: f64,
    /// 参考速度
    pub desired_velocity: f64,
    /// 位置误差
    pub error: f64,
    /// 速度误差
    pub d_error: f64,
    /// 累积误差
    pub integral: f64,
    /// 比例项
    pub p_term: f64,
    /// 积分项
    pub i_term: f64,
    /// 微分项
    pub d_term: f64,
    /// 钳位前的控制信号
    pub raw_control: f64,
    /// 钳位到 [-1, 1] 后的控制信号
    pub control: f64,
    /// 最终压力命令
    pub command: PressureCommand,
    /// 压力是否被边界钳位
    pub saturated: bool,
}

/// 压力比 PID 控制器
#[derive(Debug, Clone)]
pub struct RatioPidController {
    trajectory: Trajectory,
    bounds: Arc<ActuatorBounds>,
    gains: DofArray<PidGains>,
    ndp: DofArray<f64>,

    /// 积分项累积值（仅在构造时清零）
    integral: DofArray<f64>,

    /// 当前步索引（只增不减）
    step: usize,

    introspection: DofArray<Introspection>,
}

impl RatioPidController {
    /// 创建新的压力比 PID 控制器
    ///
    /// # 参数
    ///
    /// - `trajectory`: 预规划的参考轨迹
    /// - `bounds`: 执行器压力边界（只读共享）
    /// - `gains`: 每个自由度的 PID 增益
    /// - `ndp`: 每个自由度的压力水平增益，取值 `[0, 1]`
    ///
    /// # 错误
    ///
    /// - 任一数组长度与轨迹自由度数不一致：[`ControlError::LengthMismatch`]
    /// - `ndp` 不在 `[0, 1]`：[`ControlError::InvalidNdp`]
    /// - 增益包含 NaN/Inf：[`ControlError::NonFinite`]
    pub fn new(
        trajectory: Trajectory,
        bounds: Arc<ActuatorBounds>,
        gains: impl Into<DofArray<PidGains>>,
        ndp: impl Into<DofArray<f64>>,
    ) -> Result<Self> {
        let gains = gains.into();
        let ndp = ndp.into();
        let nb_dofs = trajectory.nb_dofs();

        check_len("bounds", nb_dofs, bounds.nb_dofs())?;
        check_len("gains", nb_dofs, gains.len())?;
        check_len("ndp", nb_dofs, ndp.len())?;

        for (dof, g) in gains.iter().enumerate() {
            if !g.is_finite() {
                return Err(ControlError::NonFinite { what: "gains", dof });
            }
        }
        for (dof, &value) in ndp.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ControlError::InvalidNdp { dof, value });
            }
        }

        debug!(
            "RatioPidController: {} dofs, {} steps, gains {:?}, ndp {:?}",
            nb_dofs,
            trajectory.max_steps(),
            gains,
            ndp
        );

        Ok(RatioPidController {
            trajectory,
            bounds,
            gains,
            ndp,
            integral: DofArray::splat(nb_dofs, 0.0),
            step: 0,
            introspection: DofArray::splat(nb_dofs, Introspection::default()),
        })
    }

    /// 轨迹是否还有剩余步
    #[inline]
    pub fn has_next(&self) -> bool {
        self.step < self.trajectory.max_steps()
    }

    /// 推进一个控制周期
    ///
    /// # 参数
    ///
    /// - `position`: 每个自由度的测量位置
    /// - `velocity`: 每个自由度的测量速度
    ///
    /// # 返回
    ///
    /// 每个自由度的压力命令，保证落在执行器边界内。
    /// 轨迹结束后继续调用是允许的：参考点保持为 `(q_desired, 0)`。
    ///
    /// # 错误
    ///
    /// 长度不一致或输入包含 NaN/Inf 时返回错误，此时步索引和积分不变。
    pub fn advance(
        &mut self,
        position: &[f64],
        velocity: &[f64],
    ) -> Result<DofArray<PressureCommand>> {
        let nb_dofs = self.nb_dofs();
        check_len("position", nb_dofs, position.len())?;
        check_len("velocity", nb_dofs, velocity.len())?;
        for dof in 0..nb_dofs {
            if !position[dof].is_finite() {
                return Err(ControlError::NonFinite {
                    what: "position",
                    dof,
                });
            }
            if !velocity[dof].is_finite() {
                return Err(ControlError::NonFinite {
                    what: "velocity",
                    dof,
                });
            }
        }

        let step = self.step;
        let commands = (0..nb_dofs)
            .map(|dof| self.advance_dof(dof, step, position[dof], velocity[dof]))
            .collect();
        self.step += 1;

        Ok(commands)
    }

    fn advance_dof(&mut self, dof: usize, step: usize, q: f64, qd: f64) -> PressureCommand {
        let reference = self.trajectory.point(dof, step);
        let gains = self.gains[dof];

        let error = reference.position - q;
        let d_error = reference.velocity - qd;
        self.integral[dof] += error;
        let integral = self.integral[dof];

        let p_term = gains.kp * error;
        let d_term = gains.kd * d_error;
        let i_term = gains.ki * integral;
        let raw_control = p_term + d_term + i_term;
        let control = raw_control.clamp(-1.0, 1.0);

        let bounds = &self.bounds[dof];
        let (command, saturated) = pressures_from_control(bounds, self.ndp[dof], control);

        trace!(
            "step {} dof {}: error {:.5}, d_error {:.5}, control {:.4} -> ({}, {})",
            step, dof, error, d_error, control, command.ago, command.antago
        );

        self.introspection[dof] = Introspection {
            step,
            position: q,
            velocity: qd,
            desired_position: reference.position,
            desired_velocity: reference.velocity,
            error,
            d_error,
            integral,
            p_term,
            i_term,
            d_term,
            raw_control,
            control,
            command,
            saturated,
        };

        command
    }

    /// 自由度数量
    #[inline]
    pub fn nb_dofs(&self) -> usize {
        self.trajectory.nb_dofs()
    }

    /// 当前步索引
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    /// 当前积分项
    ///
    /// 用于调试和监控。
    pub fn integral(&self) -> &DofArray<f64> {
        &self.integral
    }

    /// 最近一步的诊断记录（每个自由度一条）
    pub fn introspection(&self) -> &DofArray<Introspection> {
        &self.introspection
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn bounds(&self) -> &Arc<ActuatorBounds> {
        &self.bounds
    }

    pub fn gains(&self) -> &DofArray<PidGains> {
        &self.gains
    }

    pub fn ndp(&self) -> &DofArray<f64> {
        &self.ndp
    }
}

/// 将控制信号映射为一对肌肉压力
///
/// 返回 `(命令, 是否被边界钳位)`。压力先截断为整数再钳位到边界。
pub fn pressures_from_control(bounds: &DofBounds, ndp: f64, control: f64) -> (PressureCommand, bool) {
    let raw_ago = f64::from(bounds.min_ago) + bounds.range_ago() * (ndp - control);
    let raw_antago = f64::from(bounds.min_antago) + bounds.range_antago() * (ndp + control);

    // `as` 对越界浮点做饱和转换，NaN 变为 0，随后统一钳位
    let raw = PressureCommand::new(raw_ago as i32, raw_antago as i32);
    let command = bounds.clamp(raw);
    (command, command != raw)
}

impl PressureController for RatioPidController {
    fn next_command(
        &mut self,
        observation: &Observation,
    ) -> Result<Option<DofArray<PressureCommand>>> {
        if !self.has_next() {
            return Ok(None);
        }
        self.advance(observation.q.as_slice(), observation.q_vel.as_slice()).map(Some)
    }

    fn is_finished(&self) -> bool {
        !self.has_next()
    }
}
