//! PressureController trait - 压力控制器通用接口
//!
//! 所有控制律都实现同一个约定："根据当前观测，产生下一条压力命令"。
//!
//! # 设计理念
//!
//! - **Tick 模式**: 调用方驱动循环，控制器只负责计算，不阻塞、不计时
//! - **纯状态机**: 每次调用恰好推进一个控制周期
//! - **显式结束**: 返回 `Ok(None)` 表示控制器已完成（轨迹结束或已收敛）
//!
//! # 策略选择
//!
//! [`ControlStrategy`] 在构造时选择具体控制律：
//!
//! - [`ControlStrategy::RatioPid`]: 主策略，沿预规划轨迹做 PID，映射为主动肌/拮抗肌压力
//! - [`ControlStrategy::ModeSwitching`]: 备选策略，围绕参考压力调节压力比并切换主导肌肉

use crate::error::Result;
use crate::mode_switch::ModeSwitchingLaw;
use crate::ratio_pid::RatioPidController;
use crate::sink::{Observation, WriteMode};
use crate::types::{DofArray, PressureCommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 压力控制器通用接口
///
/// # 线程安全
///
/// `PressureController` 本身不要求 `Send` 或 `Sync`。
/// 每个控制器实例同一时刻只被一个调用序列使用（`&mut self`）。
pub trait PressureController {
    /// 计算下一条压力命令
    ///
    /// # 返回
    ///
    /// - `Ok(Some(command))`: 本周期应发送的压力命令（已钳位到执行器边界）
    /// - `Ok(None)`: 控制器已完成，不再产生命令
    /// - `Err(e)`: 输入非法（如长度不一致）
    fn next_command(
        &mut self,
        observation: &Observation,
    ) -> Result<Option<DofArray<PressureCommand>>>;

    /// 控制器是否已完成
    fn is_finished(&self) -> bool;

    /// 控制器要求的写入模式
    ///
    /// 返回 `None` 时由调用方（如 [`run_controller`](crate::loop_runner::run_controller)）决定。
    fn write_mode(&self) -> Option<WriteMode> {
        None
    }

    /// 每条命令对应的标称控制时长，用于按控制时间计算超时
    fn iteration_duration(&self) -> Option<Duration> {
        None
    }
}

/// 控制策略类型（用于配置文件/命令行）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// 比例 PID 控制器（主策略）
    #[default]
    RatioPid,
    /// 模式切换压力比控制器（备选策略）
    ModeSwitching,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::RatioPid => write!(f, "ratio_pid"),
            StrategyKind::ModeSwitching => write!(f, "mode_switching"),
        }
    }
}

/// 构造时选定的控制策略
#[derive(Debug, Clone)]
pub enum ControlStrategy {
    RatioPid(RatioPidController),
    ModeSwitching(ModeSwitchingLaw),
}

impl ControlStrategy {
    /// 策略类型
    pub fn kind(&self) -> StrategyKind {
        match self {
            ControlStrategy::RatioPid(_) => StrategyKind::RatioPid,
            ControlStrategy::ModeSwitching(_) => StrategyKind::ModeSwitching,
        }
    }
}

impl From<RatioPidController> for ControlStrategy {
    fn from(value: RatioPidController) -> Self {
        ControlStrategy::RatioPid(value)
    }
}

impl From<ModeSwitchingLaw> for ControlStrategy {
    fn from(value: ModeSwitchingLaw) -> Self {
        ControlStrategy::ModeSwitching(value)
    }
}

impl PressureController for ControlStrategy {
    fn next_command(
        &mut self,
        observation: &Observation,
    ) -> Result<Option<DofArray<PressureCommand>>> {
        match self {
            ControlStrategy::RatioPid(c) => c.next_command(observation),
            ControlStrategy::ModeSwitching(c) => c.next_command(observation),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            ControlStrategy::RatioPid(c) => c.is_finished(),
            ControlStrategy::ModeSwitching(c) => c.is_finished(),
        }
    }

    fn write_mode(&self) -> Option<WriteMode> {
        match self {
            ControlStrategy::RatioPid(c) => c.write_mode(),
            ControlStrategy::ModeSwitching(c) => c.write_mode(),
        }
    }

    fn iteration_duration(&self) -> Option<Duration> {
        match self {
            ControlStrategy::RatioPid(c) => c.iteration_duration(),
            ControlStrategy::ModeSwitching(c) => c.iteration_duration(),
        }
    }
}

impl<C: PressureController + ?Sized> PressureController for Box<C> {
    fn next_command(
        &mut self,
        observation: &Observation,
    ) -> Result<Option<DofArray<PressureCommand>>> {
        (**self).next_command(observation)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn write_mode(&self) -> Option<WriteMode> {
        (**self).write_mode()
    }

    fn iteration_duration(&self) -> Option<Duration> {
        (**self).iteration_duration()
    }
}

impl<C: PressureController + ?Sized> PressureController for &mut C {
    fn next_command(
        &mut self,
        observation: &Observation,
    ) -> Result<Option<DofArray<PressureCommand>>> {
        (**self).next_command(observation)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn write_mode(&self) -> Option<WriteMode> {
        (**self).write_mode()
    }

    fn iteration_duration(&self) -> Option<Duration> {
        (**self).iteration_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 固定次数后结束的测试控制器
    struct CountdownController {
        remaining: usize,
    }

    impl PressureController for CountdownController {
        fn next_command(
            &mut self,
            observation: &Observation,
        ) -> Result<Option<DofArray<PressureCommand>>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(observation.pressures()))
        }

        fn is_finished(&self) -> bool {
            self.remaining == 0
        }
    }

    fn observation() -> Observation {
        Observation {
            p_ago: DofArray::from([10, 20]),
            p_antago: DofArray::from([30, 40]),
            q: DofArray::from([0.0, 0.0]),
            q_vel: DofArray::from([0.0, 0.0]),
        }
    }

    #[test]
    fn test_controller_trait_basic() {
        let mut controller = CountdownController { remaining: 2 };
        let obs = observation();

        let cmd = controller.next_command(&obs).unwrap().unwrap();
        assert_eq!(cmd[0], PressureCommand::new(10, 30));
        assert!(!controller.is_finished());

        assert!(controller.next_command(&obs).unwrap().is_some());
        assert!(controller.is_finished());
        assert!(controller.next_command(&obs).unwrap().is_none());
    }

    #[test]
    fn test_boxed_controller() {
        let mut controller: Box<dyn PressureController> =
            Box::new(CountdownController { remaining: 1 });
        assert!(controller.next_command(&observation()).unwrap().is_some());
        assert!(controller.is_finished());
        assert_eq!(controller.write_mode(), None);
        assert_eq!(controller.iteration_duration(), None);
    }

    #[test]
    fn test_strategy_kind_serde() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            strategy: StrategyKind,
        }
        let w: Wrapper = toml::from_str("strategy = \"mode_switching\"").unwrap();
        assert_eq!(w.strategy, StrategyKind::ModeSwitching);
        assert_eq!(StrategyKind::default().to_string(), "ratio_pid");
    }
}
