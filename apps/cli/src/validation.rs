//! 输入验证模块
//!
//! 解析并校验命令行传入的逐自由度数值。

use anyhow::{Context, Result};

/// 解析逗号分隔的数值列表，并展开到 `nb_dofs` 个自由度
///
/// 只给出一个值时，所有自由度使用同一个值。
pub fn parse_per_dof(name: &str, input: &str, nb_dofs: usize) -> Result<Vec<f64>> {
    let values: Vec<f64> = input
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("解析 {} 失败: {}", name, input))?;

    for (i, v) in values.iter().enumerate() {
        if !v.is_finite() {
            anyhow::bail!("{} 第 {} 个值无效: {}", name, i + 1, v);
        }
    }

    match values.len() {
        1 => Ok(vec![values[0]; nb_dofs]),
        n if n == nb_dofs => Ok(values),
        n => anyhow::bail!("{} 需要 1 个或 {} 个值，得到 {} 个", name, nb_dofs, n),
    }
}

/// 关节位置验证器
pub struct PositionValidator {
    /// 最小位置（弧度）
    min: f64,
    /// 最大位置（弧度）
    max: f64,
}

impl PositionValidator {
    /// 使用默认范围创建验证器（-π 到 π）
    pub fn default_range() -> Self {
        Self {
            min: -std::f64::consts::PI,
            max: std::f64::consts::PI,
        }
    }

    /// 验证所有关节位置
    pub fn validate(&self, positions: &[f64]) -> Result<()> {
        for (i, &pos) in positions.iter().enumerate() {
            if pos < self.min || pos > self.max {
                anyhow::bail!(
                    "自由度 {} 位置 {:.3} rad 超出范围 [{:.3}, {:.3}]",
                    i,
                    pos,
                    self.min,
                    self.max
                );
            }
        }
        Ok(())
    }
}

/// 速度、阈值等必须为正数
pub fn ensure_positive(name: &str, values: &[f64]) -> Result<()> {
    if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| **v <= 0.0) {
        anyhow::bail!("{} 第 {} 个值必须大于 0，得到 {}", name, i, v);
    }
    Ok(())
}
