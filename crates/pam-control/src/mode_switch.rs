//! Mode-Switching Ratio Controller - 模式切换压力比控制器
//!
//! 备选控制策略：不直接映射到压力边界，而是围绕每个自由度的**参考压力**，
//! 调节主导肌肉与被动肌肉之间的压力比，从而到达目标关节位置。
//!
//! # 算法
//!
//! 每个自由度维护 `(mode, ratio)`：
//!
//! - `mode = true`：主动肌主导，`ratio = p_ago / p_antago`
//! - `mode = false`：拮抗肌主导，`ratio = p_antago / p_ago`
//! - 始终 `ratio >= 1`
//!
//! 每个控制周期：
//!
//! ```text
//! error     = q_desired - q
//! error_vel = -q_vel
//! force     = Kp * error + Kd * error_vel + Ki * Σerror
//! ratio    += mode ? -force : +force
//! if ratio < 1 { mode = !mode; ratio = 1 / ratio }   // 模式切换
//! p2 = 2 * ref / (ratio + 1),  p1 = ratio * p2        // p1 + p2 = 2 * ref
//! (ago, antago) = mode ? (p1, p2) : (p2, p1)
//! ```
//!
//! # 模式切换的连续性
//!
//! 模式只在 ratio **跌破 1** 时切换，并且切换时 ratio 取倒数：
//! `(mode, r)` 与 `(!mode, 1 / r)` 对应完全相同的物理压力对，
//! 因此切换本身不引入任何压力跳变。
//!
//! # 步进协议
//!
//! [`ModeSwitchingRatioController::go_to`] 返回一个显式的步进对象 [`GoTo`]，
//! 每次 [`GoTo::poll`] 恰好执行一个控制周期，返回三态结果 [`GoToOutcome`]：
//! 成功 / 继续 / 失败（超时）。超时是结果，不是错误。
//!
//! # 示例
//!
//! ```rust
//! use pam_control::dummy::{DummyConfig, DummySink};
//! use pam_control::mode_switch::{GoToOutcome, ModeSwitchConfig, ModeSwitchingRatioController};
//! use pam_control::types::{ActuatorBounds, DofBounds, PidGains};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let bounds = Arc::new(ActuatorBounds::uniform(4, DofBounds::symmetric(5000, 20000)).unwrap());
//! let sink = DummySink::new(DummyConfig::default(), bounds.clone()).unwrap();
//! let config = ModeSwitchConfig::new(
//!     vec![12000.0; 4],
//!     vec![PidGains::pd(0.5, 0.05); 4],
//!     Duration::from_millis(10),
//! );
//! let mut controller = ModeSwitchingRatioController::new(sink, bounds, config).unwrap();
//!
//! // 目标就是当前位置：第一个周期即成功
//! let mut motion = controller.go_to(vec![0.0; 4], vec![0.05; 4], Duration::from_secs(1)).unwrap();
//! assert_eq!(motion.poll().unwrap(), GoToOutcome::Success);
//! ```

use crate::controller::PressureController;
use crate::error::{ControlError, Result};
use crate::sink::{ActuationSink, Observation, WriteMode};
use crate::types::dof::check_len;
use crate::types::{ActuatorBounds, DofArray, PidGains, PressureCommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 默认最大压力比
pub const DEFAULT_MAX_RATIO: f64 = 100.0;

/// 单个自由度的压力比状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioState {
    /// `true`：主动肌主导
    pub mode: bool,
    /// 主导肌肉压力 / 另一块肌肉压力，`>= 1`
    pub ratio: f64,
}

impl RatioState {
    /// 从观测压力推导初始状态
    ///
    /// 分母下限为 1，避免零压力时除零。
    pub fn from_pressures(p_ago: f64, p_antago: f64, max_ratio: f64) -> Self {
        let mode = p_ago > p_antago;
        let (dominant, other) = if mode { (p_ago, p_antago) } else { (p_antago, p_ago) };
        let ratio = (dominant / other.max(1.0)).clamp(1.0, max_ratio);
        RatioState { mode, ratio }
    }

    /// 施加一个控制力，返回是否发生了模式切换
    ///
    /// 模式只在更新后的 ratio 跌破 1 时切换，切换时 ratio 取倒数，
    /// 物理压力对保持连续。ratio 上限为 `max_ratio`；
    /// 跌到 `1 / max_ratio` 以下（包括负值）时按 `1 / max_ratio` 处理。
    pub fn apply_force(&mut self, force: f64, max_ratio: f64) -> bool {
        if !force.is_finite() {
            return false;
        }

        let updated = if self.mode {
            self.ratio - force
        } else {
            self.ratio + force
        };

        if updated < 1.0 {
            self.mode = !self.mode;
            self.ratio = (1.0 / updated.max(1.0 / max_ratio)).min(max_ratio);
            true
        } else {
            self.ratio = updated.min(max_ratio);
            false
        }
    }

    /// 转换为 `(主动肌压力, 拮抗肌压力)`（浮点，未钳位）
    ///
    /// 满足 `p_ago + p_antago = 2 * reference`。
    pub fn pressures(&self, reference: f64) -> (f64, f64) {
        let p2 = 2.0 * reference / (self.ratio + 1.0);
        let p1 = self.ratio * p2;
        if self.mode { (p1, p2) } else { (p2, p1) }
    }
}

/// 模式切换控制器配置
///
/// 构造后只读，通过 `Arc` 在控制器与各次运动之间共享。
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSwitchConfig {
    /// 每个自由度的参考（中点）压力
    pub reference_pressures: DofArray<f64>,
    /// 每个自由度的增益（Ki 为 0 时不使用积分项）
    pub gains: DofArray<PidGains>,
    /// 单个控制周期时长（用于等待模式和超时累计）
    pub iteration_duration: Duration,
    /// 写入模式
    pub write_mode: WriteMode,
    /// 掩码：`false` 的自由度保持初始压力不动
    pub mask: Option<DofArray<bool>>,
    /// 最大压力比
    pub max_ratio: f64,
}

impl ModeSwitchConfig {
    /// 创建配置（等待模式，全部自由度参与控制）
    pub fn new(
        reference_pressures: impl Into<DofArray<f64>>,
        gains: impl Into<DofArray<PidGains>>,
        iteration_duration: Duration,
    ) -> Self {
        ModeSwitchConfig {
            reference_pressures: reference_pressures.into(),
            gains: gains.into(),
            iteration_duration,
            write_mode: WriteMode::Wait(iteration_duration),
            mask: None,
            max_ratio: DEFAULT_MAX_RATIO,
        }
    }

    /// 使用 burst 模式：每个周期同步推进后端 `iterations` 个周期
    pub fn with_burst(mut self, iterations: u32) -> Self {
        self.write_mode = WriteMode::Burst(iterations);
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_mask(mut self, mask: impl Into<DofArray<bool>>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn with_max_ratio(mut self, max_ratio: f64) -> Self {
        self.max_ratio = max_ratio;
        self
    }

    /// 自由度数量
    pub fn nb_dofs(&self) -> usize {
        self.reference_pressures.len()
    }

    /// 某个自由度是否参与控制
    pub fn is_active(&self, dof: usize) -> bool {
        self.mask.as_ref().is_none_or(|m| m[dof])
    }

    /// 校验配置
    pub fn validate(&self, nb_dofs: usize) -> Result<()> {
        check_len("reference_pressures", nb_dofs, self.reference_pressures.len())?;
        check_len("gains", nb_dofs, self.gains.len())?;
        if let Some(mask) = &self.mask {
            check_len("mask", nb_dofs, mask.len())?;
        }
        for (dof, &reference) in self.reference_pressures.iter().enumerate() {
            if !reference.is_finite() || reference <= 0.0 {
                return Err(ControlError::InvalidConfig(format!(
                    "reference pressure of dof {} must be finite and > 0, got {}",
                    dof, reference
                )));
            }
        }
        for (dof, gains) in self.gains.iter().enumerate() {
            if !gains.is_finite() {
                return Err(ControlError::NonFinite { what: "gains", dof });
            }
        }
        if !self.max_ratio.is_finite() || self.max_ratio < 1.0 {
            return Err(ControlError::InvalidConfig(format!(
                "max_ratio must be finite and >= 1, got {}",
                self.max_ratio
            )));
        }
        if self.iteration_duration.is_zero() {
            return Err(ControlError::InvalidConfig(
                "iteration_duration must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 模式切换控制律（纯计算，不做 IO）
///
/// 由 [`GoTo`] 驱动，也可以作为 [`PressureController`] 交给循环执行器。
#[derive(Debug, Clone)]
pub struct ModeSwitchingLaw {
    bounds: Arc<ActuatorBounds>,
    config: Arc<ModeSwitchConfig>,
    q_desired: DofArray<f64>,
    q_err: DofArray<f64>,
    states: DofArray<RatioState>,
    integral: DofArray<f64>,
    initial: DofArray<PressureCommand>,
    ticks: usize,
    converged: bool,
}

impl ModeSwitchingLaw {
    /// 从初始观测创建控制律
    ///
    /// # 参数
    ///
    /// - `q_desired`: 目标关节位置
    /// - `q_err`: 每个自由度的收敛阈值（`|error| < q_err` 视为到达）
    /// - `initial`: 初始观测（决定初始模式/压力比，以及被掩码自由度的保持压力）
    pub fn new(
        bounds: Arc<ActuatorBounds>,
        config: Arc<ModeSwitchConfig>,
        q_desired: impl Into<DofArray<f64>>,
        q_err: impl Into<DofArray<f64>>,
        initial: &Observation,
    ) -> Result<Self> {
        let q_desired = q_desired.into();
        let q_err = q_err.into();
        let nb_dofs = bounds.nb_dofs();

        config.validate(nb_dofs)?;
        check_len("q_desired", nb_dofs, q_desired.len())?;
        check_len("q_err", nb_dofs, q_err.len())?;
        check_observation(initial, nb_dofs)?;
        for dof in 0..nb_dofs {
            if !q_desired[dof].is_finite() {
                return Err(ControlError::NonFinite {
                    what: "q_desired",
                    dof,
                });
            }
        }

        let states: DofArray<RatioState> = (0..nb_dofs)
            .map(|dof| {
                RatioState::from_pressures(
                    f64::from(initial.p_ago[dof]),
                    f64::from(initial.p_antago[dof]),
                    config.max_ratio,
                )
            })
            .collect();

        debug!(
            "ModeSwitchingLaw: target {:?}, tolerance {:?}, initial states {:?}",
            q_desired, q_err, states
        );

        Ok(ModeSwitchingLaw {
            bounds,
            q_desired,
            q_err,
            states,
            integral: DofArray::splat(nb_dofs, 0.0),
            initial: initial.pressures(),
            ticks: 0,
            converged: false,
            config,
        })
    }

    /// 所有参与控制的自由度是否都在阈值内
    pub fn within_tolerance(&self, observation: &Observation) -> bool {
        (0..self.nb_dofs())
            .filter(|&dof| self.config.is_active(dof))
            .all(|dof| (self.q_desired[dof] - observation.q[dof]).abs() < self.q_err[dof])
    }

    /// 计算本周期的压力命令（不做收敛判断）
    pub fn compute(&mut self, observation: &Observation) -> Result<DofArray<PressureCommand>> {
        let nb_dofs = self.nb_dofs();
        check_observation(observation, nb_dofs)?;

        let mut commands = Vec::with_capacity(nb_dofs);
        for dof in 0..nb_dofs {
            if !self.config.is_active(dof) {
                commands.push(self.initial[dof]);
                continue;
            }

            let gains = self.config.gains[dof];
            let error = self.q_desired[dof] - observation.q[dof];
            let error_vel = -observation.q_vel[dof];
            self.integral[dof] += error;
            let force = gains.kp * error + gains.kd * error_vel + gains.ki * self.integral[dof];

            let state = &mut self.states[dof];
            let before = *state;
            if state.apply_force(force, self.config.max_ratio) {
                debug!(
                    "dof {} mode switch: {} (ratio {:.4}) -> {} (ratio {:.4})",
                    dof, before.mode, before.ratio, state.mode, state.ratio
                );
            }

            let (p_ago, p_antago) = state.pressures(self.config.reference_pressures[dof]);
            let bounds = &self.bounds[dof];
            let command = bounds.clamp(PressureCommand::new(
                round_half_up(bounds.clamp_ago_f64(p_ago)),
                round_half_up(bounds.clamp_antago_f64(p_antago)),
            ));

            trace!(
                "tick {} dof {}: error {:.5}, force {:.5}, mode {}, ratio {:.4} -> ({}, {})",
                self.ticks, dof, error, force, state.mode, state.ratio, command.ago, command.antago
            );

            commands.push(command);
        }

        self.ticks += 1;
        Ok(commands.into())
    }

    /// 自由度数量
    pub fn nb_dofs(&self) -> usize {
        self.bounds.nb_dofs()
    }

    /// 当前各自由度的模式（`true` = 主动肌主导）
    pub fn modes(&self) -> DofArray<bool> {
        self.states.iter().map(|s| s.mode).collect()
    }

    /// 当前各自由度的压力比
    pub fn ratios(&self) -> DofArray<f64> {
        self.states.iter().map(|s| s.ratio).collect()
    }

    pub fn states(&self) -> &DofArray<RatioState> {
        &self.states
    }

    pub fn integral(&self) -> &DofArray<f64> {
        &self.integral
    }

    /// 已计算的控制周期数
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn config(&self) -> &Arc<ModeSwitchConfig> {
        &self.config
    }

    pub fn q_desired(&self) -> &DofArray<f64> {
        &self.q_desired
    }
}

impl PressureController for ModeSwitchingLaw {
    fn next_command(
        &mut self,
        observation: &Observation,
    ) -> Result<Option<DofArray<PressureCommand>>> {
        if self.converged {
            return Ok(None);
        }
        check_observation(observation, self.nb_dofs())?;
        if self.within_tolerance(observation) {
            info!("Target reached after {} ticks", self.ticks);
            self.converged = true;
            return Ok(None);
        }
        self.compute(observation).map(Some)
    }

    fn is_finished(&self) -> bool {
        self.converged
    }

    fn write_mode(&self) -> Option<WriteMode> {
        Some(self.config.write_mode)
    }

    fn iteration_duration(&self) -> Option<Duration> {
        Some(self.config.iteration_duration)
    }
}

fn round_half_up(pressure: f64) -> i32 {
    (pressure + 0.5).floor() as i32
}

fn check_observation(observation: &Observation, nb_dofs: usize) -> Result<()> {
    check_len("observation.p_ago", nb_dofs, observation.p_ago.len())?;
    check_len("observation.p_antago", nb_dofs, observation.p_antago.len())?;
    check_len("observation.q", nb_dofs, observation.q.len())?;
    check_len("observation.q_vel", nb_dofs, observation.q_vel.len())?;
    for dof in 0..nb_dofs {
        if !observation.q[dof].is_finite() {
            return Err(ControlError::NonFinite {
                what: "observation.q",
                dof,
            });
        }
        if !observation.q_vel[dof].is_finite() {
            return Err(ControlError::NonFinite {
                what: "observation.q_vel",
                dof,
            });
        }
    }
    Ok(())
}

/// 失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// 累计周期时长超过超时时间仍未到达目标
    Timeout { elapsed: Duration, timeout: Duration },
}

/// 单个控制周期的三态结果
#[derive(Debug, Clone, PartialEq)]
pub enum GoToOutcome {
    /// 未结束，附带最新观测
    Continue(Observation),
    /// 所有参与控制的自由度都已到达
    Success,
    /// 失败（未到达目标）
    Failure(FailureReason),
}

impl GoToOutcome {
    /// 是否为终止结果（成功或失败）
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GoToOutcome::Continue(_))
    }
}

/// 一次 `go_to` 运动的步进对象
///
/// 每次 [`GoTo::poll`] 执行一个控制周期。终止后再次 `poll` 返回相同结果，且不再访问执行端。
pub struct GoTo<'a, S: ActuationSink> {
    sink: &'a mut S,
    law: ModeSwitchingLaw,
    current: Observation,
    timeout: Duration,
    elapsed: Duration,
    terminal: Option<GoToOutcome>,
}

impl<S: ActuationSink> GoTo<'_, S> {
    /// 执行一个控制周期
    ///
    /// # 返回
    ///
    /// - `Ok(GoToOutcome::Success)`: 已到达（本周期不发送命令）
    /// - `Ok(GoToOutcome::Continue(obs))`: 已发送命令，附带新的观测
    /// - `Ok(GoToOutcome::Failure(_))`: 超时
    /// - `Err(e)`: 执行端读写失败或观测非法。控制律状态和累计时长保持不变，
    ///   再次 `poll` 会基于同一观测重做本周期
    pub fn poll(&mut self) -> Result<GoToOutcome> {
        if let Some(outcome) = &self.terminal {
            return Ok(outcome.clone());
        }

        // 在副本上推进控制律，读写都成功后才提交；出错时状态不变，下次 poll 重做本周期
        let mut law = self.law.clone();
        let Some(command) = law.next_command(&self.current)? else {
            self.law = law;
            self.terminal = Some(GoToOutcome::Success);
            return Ok(GoToOutcome::Success);
        };

        let config = law.config().clone();
        self.sink.write(command.as_slice(), config.write_mode).map_err(ControlError::sink)?;

        let elapsed = self.elapsed + config.iteration_duration;
        if elapsed > self.timeout {
            warn!(
                "go_to timed out after {:?} ({} ticks) without reaching target",
                elapsed,
                law.ticks()
            );
            self.law = law;
            self.elapsed = elapsed;
            let outcome = GoToOutcome::Failure(FailureReason::Timeout {
                elapsed,
                timeout: self.timeout,
            });
            self.terminal = Some(outcome.clone());
            return Ok(outcome);
        }

        let observation = self.sink.read().map_err(ControlError::sink)?;
        self.law = law;
        self.elapsed = elapsed;
        self.current = observation;
        Ok(GoToOutcome::Continue(self.current.clone()))
    }

    /// 持续执行直到成功或失败
    pub fn run(&mut self) -> Result<GoToOutcome> {
        loop {
            let outcome = self.poll()?;
            if outcome.is_terminal() {
                return Ok(outcome);
            }
        }
    }

    /// 已累计的周期时长
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// 最近一次观测
    pub fn observation(&self) -> &Observation {
        &self.current
    }

    pub fn law(&self) -> &ModeSwitchingLaw {
        &self.law
    }

    /// 当前各自由度的模式
    pub fn modes(&self) -> DofArray<bool> {
        self.law.modes()
    }

    /// 当前各自由度的压力比
    pub fn ratios(&self) -> DofArray<f64> {
        self.law.ratios()
    }
}

/// 模式切换压力比控制器
///
/// 持有执行端，每次 [`go_to`](Self::go_to) 创建一次独立的运动。
pub struct ModeSwitchingRatioController<S: ActuationSink> {
    sink: S,
    bounds: Arc<ActuatorBounds>,
    config: Arc<ModeSwitchConfig>,
}

impl<S: ActuationSink> ModeSwitchingRatioController<S> {
    /// 创建控制器
    ///
    /// # 错误
    ///
    /// 配置与边界的自由度数不一致、参考压力非正等：见 [`ModeSwitchConfig::validate`]。
    pub fn new(sink: S, bounds: Arc<ActuatorBounds>, config: ModeSwitchConfig) -> Result<Self> {
        config.validate(bounds.nb_dofs())?;
        Ok(ModeSwitchingRatioController {
            sink,
            bounds,
            config: Arc::new(config),
        })
    }

    /// 开始一次运动
    ///
    /// 立即读取一次执行端状态作为初始状态。
    ///
    /// # 参数
    ///
    /// - `q_desired`: 目标关节位置
    /// - `q_err`: 每个自由度的收敛阈值
    /// - `timeout`: 超时时间（按控制周期时长累计）
    pub fn go_to(
        &mut self,
        q_desired: impl Into<DofArray<f64>>,
        q_err: impl Into<DofArray<f64>>,
        timeout: Duration,
    ) -> Result<GoTo<'_, S>> {
        let initial = self.sink.read().map_err(ControlError::sink)?;
        let law = ModeSwitchingLaw::new(
            self.bounds.clone(),
            self.config.clone(),
            q_desired,
            q_err,
            &initial,
        )?;

        Ok(GoTo {
            sink: &mut self.sink,
            law,
            current: initial,
            timeout,
            elapsed: Duration::ZERO,
            terminal: None,
        })
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// 取回执行端
    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn bounds(&self) -> &Arc<ActuatorBounds> {
        &self.bounds
    }

    pub fn config(&self) -> &Arc<ModeSwitchConfig> {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DofBounds;
    use std::collections::VecDeque;

    #[derive(Debug, thiserror::Error)]
    #[error("scripted sink fault")]
    struct Fault;

    /// 按脚本返回观测、记录写入的测试执行端
    ///
    /// `failing_writes` / `failing_reads` 次读写先返回错误。
    struct ScriptedSink {
        observations: VecDeque<Observation>,
        last: Observation,
        writes: Vec<(Vec<PressureCommand>, WriteMode)>,
        failing_writes: usize,
        failing_reads: usize,
    }

    impl ScriptedSink {
        fn new(first: Observation) -> Self {
            ScriptedSink {
                observations: VecDeque::new(),
                last: first,
                writes: Vec::new(),
                failing_writes: 0,
                failing_reads: 0,
            }
        }
    }

    impl ActuationSink for ScriptedSink {
        type Error = Fault;

        fn read(&mut self) -> std::result::Result<Observation, Fault> {
            if self.failing_reads > 0 {
                self.failing_reads -= 1;
                return Err(Fault);
            }
            if let Some(next) = self.observations.pop_front() {
                self.last = next;
            }
            Ok(self.last.clone())
        }

        fn write(
            &mut self,
            command: &[PressureCommand],
            mode: WriteMode,
        ) -> std::result::Result<(), Fault> {
            if self.failing_writes > 0 {
                self.failing_writes -= 1;
                return Err(Fault);
            }
            self.writes.push((command.to_vec(), mode));
            Ok(())
        }
    }

    fn observation(p_ago: i32, p_antago: i32, q: f64) -> Observation {
        Observation {
            p_ago: DofArray::from([p_ago]),
            p_antago: DofArray::from([p_antago]),
            q: DofArray::from([q]),
            q_vel: DofArray::from([0.0]),
        }
    }

    fn bounds() -> Arc<ActuatorBounds> {
        Arc::new(ActuatorBounds::uniform(1, DofBounds::symmetric(0, 40000)).unwrap())
    }

    fn config(kp: f64) -> ModeSwitchConfig {
        ModeSwitchConfig::new(vec![10000.0], vec![PidGains::pd(kp, 0.0)], Duration::from_millis(10))
    }

    #[test]
    fn test_ratio_state_from_pressures() {
        let s = RatioState::from_pressures(15000.0, 10000.0, 100.0);
        assert!(s.mode);
        assert!((s.ratio - 1.5).abs() < 1e-12);

        let s = RatioState::from_pressures(10000.0, 15000.0, 100.0);
        assert!(!s.mode);
        assert!((s.ratio - 1.5).abs() < 1e-12);

        // 相等：拮抗肌模式，ratio = 1
        let s = RatioState::from_pressures(10000.0, 10000.0, 100.0);
        assert!(!s.mode);
        assert_eq!(s.ratio, 1.0);

        // 零压力不除零
        let s = RatioState::from_pressures(0.0, 0.0, 100.0);
        assert_eq!(s.ratio, 1.0);
        let s = RatioState::from_pressures(500.0, 0.0, 100.0);
        assert!(s.mode);
        assert_eq!(s.ratio, 100.0);
    }

    #[test]
    fn test_pressures_sum_to_twice_reference() {
        let s = RatioState {
            mode: true,
            ratio: 3.0,
        };
        let (ago, antago) = s.pressures(1000.0);
        assert!((ago - 1500.0).abs() < 1e-9);
        assert!((antago - 500.0).abs() < 1e-9);

        let s = RatioState {
            mode: false,
            ratio: 3.0,
        };
        let (ago, antago) = s.pressures(1000.0);
        assert!((ago - 500.0).abs() < 1e-9);
        assert!((antago - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_force_without_switch() {
        let mut s = RatioState {
            mode: true,
            ratio: 2.0,
        };
        assert!(!s.apply_force(0.5, 100.0));
        assert!(s.mode);
        assert!((s.ratio - 1.5).abs() < 1e-12);

        // 拮抗肌模式：正向力增大 ratio
        let mut s = RatioState {
            mode: false,
            ratio: 2.0,
        };
        assert!(!s.apply_force(0.5, 100.0));
        assert!((s.ratio - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_apply_force_switch_inverts_ratio() {
        let mut s = RatioState {
            mode: true,
            ratio: 1.2,
        };
        let raw = RatioState {
            mode: true,
            ratio: 0.8,
        };
        assert!(s.apply_force(0.4, 100.0));
        assert!(!s.mode);
        assert!((s.ratio - 1.25).abs() < 1e-12);

        // 切换前后（未切换的原始值 vs 切换后）物理压力相同
        let (a0, b0) = raw.pressures(1000.0);
        let (a1, b1) = s.pressures(1000.0);
        assert!((a0 - a1).abs() < 1e-9);
        assert!((b0 - b1).abs() < 1e-9);
    }

    #[test]
    fn test_apply_force_exactly_one_does_not_switch() {
        let mut s = RatioState {
            mode: true,
            ratio: 1.5,
        };
        assert!(!s.apply_force(0.5, 100.0));
        assert!(s.mode);
        assert_eq!(s.ratio, 1.0);
    }

    #[test]
    fn test_apply_force_large_overshoot_capped() {
        let mut s = RatioState {
            mode: true,
            ratio: 1.0,
        };
        assert!(s.apply_force(50.0, 100.0));
        assert!(!s.mode);
        assert_eq!(s.ratio, 100.0);

        let mut s = RatioState {
            mode: false,
            ratio: 90.0,
        };
        assert!(!s.apply_force(50.0, 100.0));
        assert_eq!(s.ratio, 100.0);
    }

    #[test]
    fn test_apply_force_ignores_nan() {
        let mut s = RatioState {
            mode: true,
            ratio: 2.0,
        };
        assert!(!s.apply_force(f64::NAN, 100.0));
        assert_eq!(s.ratio, 2.0);
    }

    #[test]
    fn test_go_to_already_there() {
        let sink = ScriptedSink::new(observation(10000, 10000, 0.3));
        let mut controller = ModeSwitchingRatioController::new(sink, bounds(), config(1.0)).unwrap();
        let mut motion = controller.go_to(vec![0.3], vec![0.01], Duration::from_secs(1)).unwrap();
        assert_eq!(motion.poll().unwrap(), GoToOutcome::Success);
        // 终止后重复 poll 返回相同结果
        assert_eq!(motion.poll().unwrap(), GoToOutcome::Success);
        assert!(controller.sink().writes.is_empty());
    }

    #[test]
    fn test_go_to_timeout() {
        let sink = ScriptedSink::new(observation(10000, 10000, 0.0));
        let mut controller = ModeSwitchingRatioController::new(sink, bounds(), config(0.1)).unwrap();
        let mut motion =
            controller.go_to(vec![1.0], vec![0.01], Duration::from_millis(25)).unwrap();

        assert!(matches!(motion.poll().unwrap(), GoToOutcome::Continue(_)));
        assert!(matches!(motion.poll().unwrap(), GoToOutcome::Continue(_)));
        match motion.poll().unwrap() {
            GoToOutcome::Failure(FailureReason::Timeout { elapsed, timeout }) => {
                assert_eq!(elapsed, Duration::from_millis(30));
                assert_eq!(timeout, Duration::from_millis(25));
            },
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert!(motion.poll().unwrap().is_terminal());
        assert_eq!(controller.sink().writes.len(), 3);
    }

    #[test]
    fn test_go_to_pushes_towards_antagonist() {
        // 目标在正方向：拮抗肌压力应上升
        let sink = ScriptedSink::new(observation(10000, 10000, 0.0));
        let mut controller = ModeSwitchingRatioController::new(sink, bounds(), config(0.5)).unwrap();
        let mut motion = controller.go_to(vec![1.0], vec![0.01], Duration::from_secs(1)).unwrap();
        motion.poll().unwrap();

        let (command, mode) = &controller.sink().writes[0];
        assert_eq!(*mode, WriteMode::Wait(Duration::from_millis(10)));
        // mode=false, ratio 1 + 0.5 = 1.5：antago = 12000, ago = 8000
        assert_eq!(command[0], PressureCommand::new(8000, 12000));
    }

    #[test]
    fn test_failed_write_leaves_state_untouched() {
        let sink = ScriptedSink::new(observation(10000, 10000, 0.0));
        let mut controller = ModeSwitchingRatioController::new(sink, bounds(), config(0.5)).unwrap();
        controller.sink_mut().failing_writes = 1;
        let mut motion = controller.go_to(vec![1.0], vec![0.01], Duration::from_secs(1)).unwrap();

        assert!(matches!(motion.poll(), Err(ControlError::Sink(_))));
        assert_eq!(motion.law().ticks(), 0);
        assert_eq!(motion.ratios()[0], 1.0);
        assert_eq!(motion.law().integral()[0], 0.0);
        assert_eq!(motion.elapsed(), Duration::ZERO);

        // 重试时只施加一次力：ratio 1 + 0.5
        assert!(matches!(motion.poll().unwrap(), GoToOutcome::Continue(_)));
        assert_eq!(motion.law().ticks(), 1);
        assert!((motion.ratios()[0] - 1.5).abs() < 1e-12);
        assert_eq!(motion.elapsed(), Duration::from_millis(10));

        let writes = &controller.sink().writes;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0[0], PressureCommand::new(8000, 12000));
    }

    #[test]
    fn test_failed_read_retries_same_tick() {
        let sink = ScriptedSink::new(observation(10000, 10000, 0.0));
        let mut controller = ModeSwitchingRatioController::new(sink, bounds(), config(0.5)).unwrap();
        let mut motion = controller.go_to(vec![1.0], vec![0.01], Duration::from_secs(1)).unwrap();
        motion.sink.failing_reads = 1;

        assert!(matches!(motion.poll(), Err(ControlError::Sink(_))));
        assert_eq!(motion.law().ticks(), 0);
        assert_eq!(motion.elapsed(), Duration::ZERO);

        assert!(matches!(motion.poll().unwrap(), GoToOutcome::Continue(_)));
        assert!((motion.ratios()[0] - 1.5).abs() < 1e-12);
        assert_eq!(motion.elapsed(), Duration::from_millis(10));

        // 同一命令重发，不会叠加
        let writes = &controller.sink().writes;
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].0, writes[1].0);
        assert_eq!(writes[1].0[0], PressureCommand::new(8000, 12000));
    }

    #[test]
    fn test_go_to_switches_mode_continuously() {
        // 主动肌主导 (ratio 1.2)，目标在正方向：ratio 跌破 1 后切换到拮抗肌模式
        let sink = ScriptedSink::new(observation(12000, 10000, 0.0));
        let mut controller = ModeSwitchingRatioController::new(sink, bounds(), config(0.4)).unwrap();
        let mut motion = controller.go_to(vec![1.0], vec![0.01], Duration::from_secs(1)).unwrap();
        assert!(motion.law().modes()[0]);

        motion.poll().unwrap();
        assert!(!motion.law().modes()[0]);
        assert!((motion.law().ratios()[0] - 1.25).abs() < 1e-12);

        // 切换后的压力等于 ratio 0.8 在主动肌模式下的压力：ago = 0.8 * 2 * ref / 1.8
        let (command, _) = &controller.sink().writes[0];
        let expected_ago = (0.8_f64 * 20000.0 / 1.8 + 0.5).floor() as i32;
        assert_eq!(command[0].ago, expected_ago);
        assert_eq!(command[0].ago + command[0].antago, 20000);
    }

    #[test]
    fn test_mask_holds_initial_pressures() {
        let initial = Observation {
            p_ago: DofArray::from([11000, 13000]),
            p_antago: DofArray::from([9000, 7000]),
            q: DofArray::from([0.0, 0.0]),
            q_vel: DofArray::from([0.0, 0.0]),
        };
        let sink = ScriptedSink::new(initial);
        let bounds = Arc::new(ActuatorBounds::uniform(2, DofBounds::symmetric(0, 40000)).unwrap());
        let config = ModeSwitchConfig::new(
            vec![10000.0; 2],
            vec![PidGains::pd(0.5, 0.0); 2],
            Duration::from_millis(10),
        )
        .with_mask(vec![true, false])
        .with_burst(3);

        let mut controller = ModeSwitchingRatioController::new(sink, bounds, config).unwrap();
        // dof 1 被掩码，即使误差很大也不影响收敛判断
        let mut motion =
            controller.go_to(vec![1.0, 5.0], vec![0.01, 0.01], Duration::from_secs(1)).unwrap();
        motion.poll().unwrap();

        let (command, mode) = &controller.sink().writes[0];
        assert_eq!(*mode, WriteMode::Burst(3));
        assert_eq!(command[1], PressureCommand::new(13000, 7000));
        assert_ne!(command[0], PressureCommand::new(11000, 9000));
    }

    #[test]
    fn test_pressures_clamped_to_each_muscle_bounds() {
        let sink = ScriptedSink::new(observation(10000, 10000, 0.0));
        let bounds = Arc::new(
            ActuatorBounds::new(vec![DofBounds {
                min_ago: 9000,
                max_ago: 20000,
                min_antago: 0,
                max_antago: 11000,
            }])
            .unwrap(),
        );
        let mut controller = ModeSwitchingRatioController::new(sink, bounds, config(5.0)).unwrap();
        let mut motion = controller.go_to(vec![1.0], vec![0.01], Duration::from_secs(1)).unwrap();
        motion.poll().unwrap();

        // 力很大：ratio = 6，antago ≈ 17143 > 11000，ago ≈ 2857 < 9000
        let (command, _) = &controller.sink().writes[0];
        assert_eq!(command[0], PressureCommand::new(9000, 11000));
    }

    #[test]
    fn test_go_to_length_mismatch() {
        let sink = ScriptedSink::new(observation(10000, 10000, 0.0));
        let mut controller = ModeSwitchingRatioController::new(sink, bounds(), config(1.0)).unwrap();
        let result = controller.go_to(vec![1.0, 2.0], vec![0.01], Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(ControlError::LengthMismatch {
                what: "q_desired",
                ..
            })
        ));
    }

    #[test]
    fn test_config_write_mode_builders() {
        assert_eq!(config(1.0).write_mode, WriteMode::Wait(Duration::from_millis(10)));
        assert_eq!(config(1.0).with_burst(4).write_mode, WriteMode::Burst(4));
        let cfg = config(1.0).with_burst(4).with_write_mode(WriteMode::FireAndForget);
        assert_eq!(cfg.write_mode, WriteMode::FireAndForget);
    }

    #[test]
    fn test_config_validation() {
        let cfg = config(1.0);
        assert!(cfg.validate(1).is_ok());
        assert!(matches!(cfg.validate(2), Err(ControlError::LengthMismatch { .. })));

        let cfg = config(1.0).with_max_ratio(0.5);
        assert!(matches!(cfg.validate(1), Err(ControlError::InvalidConfig(_))));

        let cfg = ModeSwitchConfig::new(vec![0.0], vec![PidGains::default()], Duration::from_millis(1));
        assert!(matches!(cfg.validate(1), Err(ControlError::InvalidConfig(_))));

        let cfg = ModeSwitchConfig::new(vec![1.0], vec![PidGains::default()], Duration::ZERO);
        assert!(matches!(cfg.validate(1), Err(ControlError::InvalidConfig(_))));
    }

    #[test]
    fn test_law_as_pressure_controller() {
        let initial = observation(10000, 10000, 0.0);
        let mut law = ModeSwitchingLaw::new(
            bounds(),
            Arc::new(config(0.5)),
            vec![0.5],
            vec![0.1],
            &initial,
        )
        .unwrap();

        assert!(law.next_command(&initial).unwrap().is_some());
        assert!(!law.is_finished());
        assert_eq!(law.write_mode(), Some(WriteMode::Wait(Duration::from_millis(10))));
        assert_eq!(law.iteration_duration(), Some(Duration::from_millis(10)));

        let reached = observation(10000, 10000, 0.45);
        assert!(law.next_command(&reached).unwrap().is_none());
        assert!(law.is_finished());
        assert!(law.next_command(&initial).unwrap().is_none());
    }
}
