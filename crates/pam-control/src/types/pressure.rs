//! 压力类型：执行器压力边界与压力命令
//!
//! 压力单位沿用后端的整数压力单位（无量纲整数）。

use super::dof::DofArray;
use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// 单个自由度的压力边界
///
/// 不变量：`min_ago <= max_ago` 且 `min_antago <= max_antago`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DofBounds {
    /// 主动肌（agonist）最小压力
    pub min_ago: i32,
    /// 主动肌（agonist）最大压力
    pub max_ago: i32,
    /// 拮抗肌（antagonist）最小压力
    pub min_antago: i32,
    /// 拮抗肌（antagonist）最大压力
    pub max_antago: i32,
}

impl DofBounds {
    /// 两块肌肉使用相同的边界
    pub const fn symmetric(min: i32, max: i32) -> Self {
        DofBounds {
            min_ago: min,
            max_ago: max,
            min_antago: min,
            max_antago: max,
        }
    }

    /// 主动肌压力范围 `max_ago - min_ago`
    #[inline]
    pub fn range_ago(&self) -> f64 {
        f64::from(self.max_ago) - f64::from(self.min_ago)
    }

    /// 拮抗肌压力范围 `max_antago - min_antago`
    #[inline]
    pub fn range_antago(&self) -> f64 {
        f64::from(self.max_antago) - f64::from(self.min_antago)
    }

    /// 钳位主动肌压力（浮点，未取整）
    #[inline]
    pub fn clamp_ago_f64(&self, pressure: f64) -> f64 {
        pressure.clamp(f64::from(self.min_ago), f64::from(self.max_ago))
    }

    /// 钳位拮抗肌压力（浮点，未取整）
    #[inline]
    pub fn clamp_antago_f64(&self, pressure: f64) -> f64 {
        pressure.clamp(f64::from(self.min_antago), f64::from(self.max_antago))
    }

    /// 将一对压力钳位到边界内
    pub fn clamp(&self, command: PressureCommand) -> PressureCommand {
        PressureCommand {
            ago: command.ago.clamp(self.min_ago, self.max_ago),
            antago: command.antago.clamp(self.min_antago, self.max_antago),
        }
    }

    /// 压力对是否在边界内
    pub fn contains(&self, command: PressureCommand) -> bool {
        (self.min_ago..=self.max_ago).contains(&command.ago)
            && (self.min_antago..=self.max_antago).contains(&command.antago)
    }

    fn validate(&self, dof: usize) -> Result<()> {
        if self.min_ago > self.max_ago {
            return Err(ControlError::InvalidBounds {
                dof,
                reason: format!("min_ago ({}) > max_ago ({})", self.min_ago, self.max_ago),
            });
        }
        if self.min_antago > self.max_antago {
            return Err(ControlError::InvalidBounds {
                dof,
                reason: format!(
                    "min_antago ({}) > max_antago ({})",
                    self.min_antago, self.max_antago
                ),
            });
        }
        Ok(())
    }
}

/// 执行器压力边界（所有自由度）
///
/// 构造后不可变；多个控制器通过 `Arc<ActuatorBounds>` 只读共享同一份边界。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DofBounds>", into = "Vec<DofBounds>")]
pub struct ActuatorBounds {
    dofs: DofArray<DofBounds>,
}

impl ActuatorBounds {
    /// 创建并校验边界
    ///
    /// # 错误
    ///
    /// - 没有任何自由度：[`ControlError::InvalidConfig`]
    /// - 某个自由度 `min > max`：[`ControlError::InvalidBounds`]
    pub fn new(dofs: impl Into<DofArray<DofBounds>>) -> Result<Self> {
        let dofs = dofs.into();
        if dofs.is_empty() {
            return Err(ControlError::InvalidConfig(
                "actuator bounds must describe at least one dof".to_string(),
            ));
        }
        for (dof, bounds) in dofs.iter().enumerate() {
            bounds.validate(dof)?;
        }
        Ok(ActuatorBounds { dofs })
    }

    /// 所有自由度使用相同边界
    pub fn uniform(nb_dofs: usize, bounds: DofBounds) -> Result<Self> {
        Self::new(DofArray::splat(nb_dofs, bounds))
    }

    /// 自由度数量
    #[inline]
    pub fn nb_dofs(&self) -> usize {
        self.dofs.len()
    }

    /// 将所有自由度的压力命令钳位到边界内
    pub fn clamp_all(&self, commands: DofArray<PressureCommand>) -> DofArray<PressureCommand> {
        commands.map_with_dof(|dof, c| self.dofs[dof].clamp(c))
    }
}

impl Deref for ActuatorBounds {
    type Target = DofArray<DofBounds>;

    fn deref(&self) -> &Self::Target {
        &self.dofs
    }
}

impl TryFrom<Vec<DofBounds>> for ActuatorBounds {
    type Error = ControlError;

    fn try_from(value: Vec<DofBounds>) -> Result<Self> {
        ActuatorBounds::new(value)
    }
}

impl From<ActuatorBounds> for Vec<DofBounds> {
    fn from(value: ActuatorBounds) -> Self {
        value.dofs.into_vec()
    }
}

/// 单个自由度的压力命令：`(主动肌压力, 拮抗肌压力)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PressureCommand {
    pub ago: i32,
    pub antago: i32,
}

impl PressureCommand {
    #[inline]
    pub const fn new(ago: i32, antago: i32) -> Self {
        PressureCommand { ago, antago }
    }
}

impl From<(i32, i32)> for PressureCommand {
    fn from((ago, antago): (i32, i32)) -> Self {
        PressureCommand { ago, antago }
    }
}
