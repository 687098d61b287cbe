//! 控制配置
//!
//! 从 TOML 文件加载压力边界、增益和控制器参数。
//!
//! # 文件格式
//!
//! ```toml
//! strategy = "ratio_pid"   # 或 "mode_switching"
//! time_step = 0.01
//! extra_steps = 100
//!
//! [[dofs]]
//! min_ago = 5000
//! max_ago = 20000
//! min_antago = 5000
//! max_antago = 20000
//! kp = 0.05
//! ki = 0.0
//! kd = 0.01
//! ndp = 0.5
//! ref_pressure = 12500.0   # 可省略，默认取两块肌肉压力范围中点的平均值
//!
//! [mode_switch]
//! iteration_duration_ms = 10
//! max_ratio = 100.0
//! burst = 0                # 0 = 等待模式
//! ```

use crate::controller::{ControlStrategy, StrategyKind};
use crate::error::{ControlError, Result};
use crate::mode_switch::{DEFAULT_MAX_RATIO, ModeSwitchConfig, ModeSwitchingLaw};
use crate::ratio_pid::RatioPidController;
use crate::sink::Observation;
use crate::trajectory::TrajectoryPlanner;
use crate::types::dof::check_len;
use crate::types::{ActuatorBounds, DofArray, DofBounds, PidGains};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

fn default_time_step() -> f64 {
    0.01
}

fn default_extra_steps() -> usize {
    TrajectoryPlanner::DEFAULT_EXTRA_STEPS
}

fn default_ndp() -> f64 {
    0.5
}

/// 单个自由度的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DofConfig {
    pub min_ago: i32,
    pub max_ago: i32,
    pub min_antago: i32,
    pub max_antago: i32,

    /// 比例增益
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,

    /// 压力水平增益（0 ~ 1）
    #[serde(default = "default_ndp")]
    pub ndp: f64,

    /// 模式切换控制器的参考压力
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_pressure: Option<f64>,
}

impl DofConfig {
    pub fn bounds(&self) -> DofBounds {
        DofBounds {
            min_ago: self.min_ago,
            max_ago: self.max_ago,
            min_antago: self.min_antago,
            max_antago: self.max_antago,
        }
    }

    pub fn gains(&self) -> PidGains {
        PidGains::new(self.kp, self.ki, self.kd)
    }

    /// 参考压力（未配置时取两块肌肉压力范围中点的平均值）
    pub fn reference_pressure(&self) -> f64 {
        self.ref_pressure.unwrap_or_else(|| {
            let mid_ago = (f64::from(self.min_ago) + f64::from(self.max_ago)) / 2.0;
            let mid_antago = (f64::from(self.min_antago) + f64::from(self.max_antago)) / 2.0;
            (mid_ago + mid_antago) / 2.0
        })
    }
}

/// 模式切换控制器的配置段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSwitchSection {
    /// 控制周期（毫秒）
    pub iteration_duration_ms: u64,
    pub max_ratio: f64,
    /// 大于 0 时使用 burst 模式，每周期推进的后端周期数
    pub burst: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<bool>>,
    /// 独立的增益（未配置时使用 `[[dofs]]` 中的增益）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gains: Option<Vec<PidGains>>,
}

impl Default for ModeSwitchSection {
    fn default() -> Self {
        ModeSwitchSection {
            iteration_duration_ms: 10,
            max_ratio: DEFAULT_MAX_RATIO,
            burst: 0,
            mask: None,
            gains: None,
        }
    }
}

/// 控制配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// 使用的控制策略
    #[serde(default)]
    pub strategy: StrategyKind,

    /// 轨迹时间步长（秒）
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// 轨迹末尾的稳定步数
    #[serde(default = "default_extra_steps")]
    pub extra_steps: usize,

    /// 每个自由度的边界和增益
    pub dofs: Vec<DofConfig>,

    #[serde(default)]
    pub mode_switch: ModeSwitchSection,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ControlConfig {
    /// 创建默认配置（4 个自由度）
    pub fn default_config() -> Self {
        let dof = DofConfig {
            min_ago: 5000,
            max_ago: 20000,
            min_antago: 5000,
            max_antago: 20000,
            kp: 0.05,
            ki: 0.0,
            kd: 0.01,
            ndp: 0.5,
            ref_pressure: None,
        };
        ControlConfig {
            strategy: StrategyKind::default(),
            time_step: default_time_step(),
            extra_steps: default_extra_steps(),
            dofs: vec![dof; 4],
            mode_switch: ModeSwitchSection::default(),
        }
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ControlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded control config from {} ({} dofs)", path.display(), config.nb_dofs());
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 自由度数量
    pub fn nb_dofs(&self) -> usize {
        self.dofs.len()
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        let bounds = self.bounds()?;
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(ControlError::InvalidTimeStep(self.time_step));
        }
        for (dof, cfg) in self.dofs.iter().enumerate() {
            if !cfg.gains().is_finite() {
                return Err(ControlError::NonFinite { what: "gains", dof });
            }
            if !(0.0..=1.0).contains(&cfg.ndp) {
                return Err(ControlError::InvalidNdp {
                    dof,
                    value: cfg.ndp,
                });
            }
        }
        self.mode_switch_config()?.validate(bounds.nb_dofs())
    }

    /// 压力边界
    pub fn bounds(&self) -> Result<ActuatorBounds> {
        ActuatorBounds::new(self.dofs.iter().map(DofConfig::bounds).collect::<Vec<_>>())
    }

    /// 比例 PID 增益
    pub fn gains(&self) -> DofArray<PidGains> {
        self.dofs.iter().map(DofConfig::gains).collect()
    }

    pub fn ndp(&self) -> DofArray<f64> {
        self.dofs.iter().map(|d| d.ndp).collect()
    }

    pub fn reference_pressures(&self) -> DofArray<f64> {
        self.dofs.iter().map(DofConfig::reference_pressure).collect()
    }

    /// 模式切换控制器配置
    pub fn mode_switch_config(&self) -> Result<ModeSwitchConfig> {
        let section = &self.mode_switch;
        let gains = match &section.gains {
            Some(gains) => {
                check_len("mode_switch.gains", self.nb_dofs(), gains.len())?;
                DofArray::from(gains.clone())
            },
            None => self.gains(),
        };

        let mut config = ModeSwitchConfig::new(
            self.reference_pressures(),
            gains,
            Duration::from_millis(section.iteration_duration_ms),
        )
        .with_max_ratio(section.max_ratio);
        if section.burst > 0 {
            config = config.with_burst(section.burst);
        }
        if let Some(mask) = &section.mask {
            config = config.with_mask(mask.clone());
        }
        Ok(config)
    }

    /// 轨迹规划器（使用配置中的时间步长和稳定步数）
    pub fn planner(
        &self,
        q_current: impl Into<DofArray<f64>>,
        q_desired: impl Into<DofArray<f64>>,
        dq_desired: impl Into<DofArray<f64>>,
    ) -> TrajectoryPlanner {
        TrajectoryPlanner::new(q_current, q_desired, dq_desired, self.time_step)
            .with_extra_steps(self.extra_steps)
    }

    /// 按配置的策略构造控制器
    ///
    /// # 参数
    ///
    /// - `initial`: 当前观测（轨迹起点 / 模式切换初始状态）
    /// - `q_desired`: 目标关节位置
    /// - `dq_desired`: 期望速度（仅比例 PID 使用）
    /// - `q_err`: 收敛阈值（仅模式切换使用）
    pub fn build_strategy(
        &self,
        bounds: Arc<ActuatorBounds>,
        initial: &Observation,
        q_desired: impl Into<DofArray<f64>>,
        dq_desired: impl Into<DofArray<f64>>,
        q_err: impl Into<DofArray<f64>>,
    ) -> Result<ControlStrategy> {
        check_len("bounds", self.nb_dofs(), bounds.nb_dofs())?;

        let strategy: ControlStrategy = match self.strategy {
            StrategyKind::RatioPid => {
                let trajectory =
                    self.planner(initial.q.clone(), q_desired, dq_desired).plan()?;
                RatioPidController::new(trajectory, bounds, self.gains(), self.ndp())?.into()
            },
            StrategyKind::ModeSwitching => ModeSwitchingLaw::new(
                bounds,
                Arc::new(self.mode_switch_config()?),
                q_desired,
                q_err,
                initial,
            )?
            .into(),
        };

        debug!("Built {} controller for {} dofs", self.strategy, self.nb_dofs());
        Ok(strategy)
    }
}
