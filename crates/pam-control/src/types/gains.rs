//! PID 增益

use serde::{Deserialize, Serialize};

/// 单个自由度的 PID 增益
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    /// 比例增益 (Kp)
    pub kp: f64,
    /// 积分增益 (Ki)
    #[serde(default)]
    pub ki: f64,
    /// 微分增益 (Kd)
    #[serde(default)]
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        PidGains { kp, ki, kd }
    }

    /// 仅 PD（Ki = 0）
    pub const fn pd(kp: f64, kd: f64) -> Self {
        PidGains { kp, ki: 0.0, kd }
    }

    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}
