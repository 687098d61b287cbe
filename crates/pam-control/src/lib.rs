//! PAM Control - 气动人工肌肉机器人的压力比位置控制
//!
//! 每个关节（自由度）由一对气动人工肌肉驱动：**主动肌**（agonist）和**拮抗肌**（antagonist）。
//! 控制器唯一的输出是每个自由度的一对整数压力。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **基础类型** (`types`): 自由度数组、压力边界、压力命令、PID 增益
//! - **轨迹规划** (`trajectory`): 预先计算带稳定段的定长参考轨迹
//! - **控制律** (`ratio_pid`, `mode_switch`): 比例 PID 与模式切换压力比两种策略
//! - **执行端** (`sink`, `dummy`): 同步读写接口，以及进程内模拟机器人
//! - **控制循环** (`loop_runner`): 读取 → 计算 → 写入的节拍循环
//! - **配置** (`config`): TOML 配置文件
//!
//! # 快速开始
//!
//! ```rust
//! use pam_control::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ControlConfig::default_config();
//! let bounds = Arc::new(config.bounds().unwrap());
//! let mut sink = DummySink::new(DummyConfig::default(), bounds.clone()).unwrap();
//!
//! let initial = sink.read().unwrap();
//! let controller = config
//!     .build_strategy(bounds, &initial, vec![0.2; 4], vec![1.0; 4], vec![0.01; 4])
//!     .unwrap();
//!
//! let loop_config = LoopConfig {
//!     frequency_hz: None,
//!     max_iterations: Some(50),
//!     timeout: None,
//!     write_mode: WriteMode::Burst(10),
//! };
//! let report = run_controller(&mut sink, controller, &loop_config).unwrap();
//! assert_eq!(report.iterations, 50);
//! ```

pub mod config;
pub mod controller;
pub mod dummy;
pub mod error;
pub mod loop_runner;
pub mod mode_switch;
pub mod ratio_pid;
pub mod sink;
pub mod trajectory;
pub mod types;

pub mod prelude;

pub use config::ControlConfig;
pub use controller::{ControlStrategy, PressureController, StrategyKind};
pub use error::{ControlError, Result};
pub use mode_switch::{
    FailureReason, GoTo, GoToOutcome, ModeSwitchConfig, ModeSwitchingLaw,
    ModeSwitchingRatioController,
};
pub use ratio_pid::RatioPidController;
pub use sink::{ActuationSink, Observation, WriteMode};
pub use trajectory::{Trajectory, TrajectoryPlanner, TrajectoryPoint};
