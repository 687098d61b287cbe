//! 控制层错误类型定义
//!
//! 注意：`go_to` 的超时是 **结果**（`GoToOutcome::Failure`），不是错误；
//! 压力越界一律钳位，也不是错误。

use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 各自由度数组长度不一致
    #[error("Length mismatch for {what}: expected {expected} dofs, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// 时间步长非法（必须为有限正数）
    #[error("Invalid time step: {0} (must be finite and > 0)")]
    InvalidTimeStep(f64),

    /// 期望速度为 0，但位置误差非 0（会导致除零）
    #[error("Zero desired speed for dof {dof} while position error is {error}")]
    ZeroDesiredSpeed { dof: usize, error: f64 },

    /// 输入包含 NaN / Inf
    #[error("Non-finite value in {what} (dof {dof})")]
    NonFinite { what: &'static str, dof: usize },

    /// 压力边界非法（min > max）
    #[error("Invalid pressure bounds for dof {dof}: {reason}")]
    InvalidBounds { dof: usize, reason: String },

    /// 压力水平增益 ndp 不在 [0, 1]
    #[error("Invalid ndp for dof {dof}: {value} (must be in [0, 1])")]
    InvalidNdp { dof: usize, value: f64 },

    /// 其他配置错误
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 执行端（actuation sink）读写失败
    #[error("Actuation sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 配置文件 IO 错误
    #[error("Config IO error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// 配置文件解析错误
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置序列化错误
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl ControlError {
    /// 包装执行端错误
    pub fn sink<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ControlError::Sink(Box::new(err))
    }
}

/// 控制层 Result 别名
pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::ControlError;

    #[test]
    fn test_control_error_display() {
        let err = ControlError::LengthMismatch {
            what: "q_desired",
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            format!("{}", err),
            "Length mismatch for q_desired: expected 4 dofs, got 3"
        );

        let err = ControlError::ZeroDesiredSpeed { dof: 2, error: 1.5 };
        let msg = format!("{}", err);
        assert!(msg.contains("dof 2") && msg.contains("1.5"), "{}", msg);

        let err = ControlError::InvalidNdp { dof: 0, value: 1.5 };
        assert!(format!("{}", err).contains("[0, 1]"));
    }

    #[test]
    fn test_sink_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "segment gone");
        let err = ControlError::sink(io);
        let msg = format!("{}", err);
        assert!(msg.contains("segment gone"), "{}", msg);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ControlError = io.into();
        assert!(matches!(err, ControlError::ConfigIo(_)));
    }
}
