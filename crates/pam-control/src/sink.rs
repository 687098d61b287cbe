//! 执行端接口（Actuation Sink）
//!
//! 控制器只通过这个接口与后端交互：读取最新状态、写入压力目标。
//! 后端本身可能运行在独立的实时线程/进程中，但对控制器而言，
//! 每次 `read()` / `write()` 都是一次**阻塞、同步**的往返，
//! 除"最新状态"外不提供任何排队保证。
//!
//! # 写入模式
//!
//! - [`WriteMode::Wait`]: 在给定时长内完成插值并阻塞到应用完成
//! - [`WriteMode::Burst`]: 同步推进后端 N 个周期后返回
//! - [`WriteMode::FireAndForget`]: 仅排队，由下一个外部周期执行

use crate::types::{DofArray, PressureCommand};
use std::time::Duration;

/// 后端观测值（所有自由度的最新状态）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    /// 主动肌观测压力
    pub p_ago: DofArray<i32>,
    /// 拮抗肌观测压力
    pub p_antago: DofArray<i32>,
    /// 关节位置（弧度）
    pub q: DofArray<f64>,
    /// 关节速度（弧度/秒）
    pub q_vel: DofArray<f64>,
}

impl Observation {
    /// 自由度数量（以关节位置数组为准）
    pub fn nb_dofs(&self) -> usize {
        self.q.len()
    }

    /// 当前观测压力打包为命令（用于保持当前压力）
    pub fn pressures(&self) -> DofArray<PressureCommand> {
        self.p_ago.clone().map_with(self.p_antago.clone(), PressureCommand::new)
    }
}

/// 写入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// 在 `Duration` 内到达目标，并阻塞直到应用完成
    Wait(Duration),
    /// 同步推进后端 N 个周期
    Burst(u32),
    /// 排队，由下一个外部周期执行
    #[default]
    FireAndForget,
}

/// 执行端通用接口
///
/// # 线程安全
///
/// `ActuationSink` 本身不要求 `Send` 或 `Sync`；同一时刻只有一个控制调用序列使用它。
pub trait ActuationSink {
    /// 执行端错误类型
    type Error: std::error::Error + Send + Sync + 'static;

    /// 读取所有自由度的最新状态
    fn read(&mut self) -> Result<Observation, Self::Error>;

    /// 写入新的压力目标
    fn write(&mut self, command: &[PressureCommand], mode: WriteMode) -> Result<(), Self::Error>;
}

impl<S: ActuationSink + ?Sized> ActuationSink for &mut S {
    type Error = S::Error;

    fn read(&mut self) -> Result<Observation, Self::Error> {
        (**self).read()
    }

    fn write(&mut self, command: &[PressureCommand], mode: WriteMode) -> Result<(), Self::Error> {
        (**self).write(command, mode)
    }
}
