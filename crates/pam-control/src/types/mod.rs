//! 基础类型
//!
//! - [`DofArray`] - 按自由度组织的数组
//! - [`DofBounds`] / [`ActuatorBounds`] - 执行器压力边界
//! - [`PressureCommand`] - 主动肌/拮抗肌压力命令
//! - [`PidGains`] - PID 增益

pub mod dof;
pub mod gains;
pub mod pressure;

pub use dof::DofArray;
pub use gains::PidGains;
pub use pressure::{ActuatorBounds, DofBounds, PressureCommand};
