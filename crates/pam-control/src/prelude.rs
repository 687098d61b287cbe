//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use pam_control::prelude::*;
//! ```

pub use crate::config::ControlConfig;
pub use crate::controller::{ControlStrategy, PressureController, StrategyKind};
pub use crate::dummy::{DummyConfig, DummySink};
pub use crate::loop_runner::{LoopConfig, LoopReport, run_controller, run_controller_until};
pub use crate::mode_switch::{
    FailureReason, GoToOutcome, ModeSwitchConfig, ModeSwitchingRatioController,
};
pub use crate::ratio_pid::RatioPidController;
pub use crate::sink::{ActuationSink, Observation, WriteMode};
pub use crate::trajectory::{Trajectory, TrajectoryPlanner};
pub use crate::types::{ActuatorBounds, DofArray, DofBounds, PidGains, PressureCommand};

// 错误类型
pub use crate::error::ControlError;
