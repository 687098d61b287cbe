//! 自由度数组
//!
//! 每个关节（自由度，dof）由一对气动肌肉驱动。自由度数量在控制器构造时确定，
//! 之后不再改变，因此这里使用定长（构造后）的 `Vec` 容器，而不是编译期定长数组。
//!
//! # 示例
//!
//! ```rust
//! use pam_control::types::DofArray;
//!
//! let q = DofArray::from(vec![0.1_f64, 0.2, 0.3, 0.4]);
//! let doubled = q.clone().map(|v| v * 2.0);
//! assert_eq!(doubled[3], 0.8);
//!
//! let error = DofArray::splat(4, 1.0).map_with(q, |d, c| d - c);
//! assert!((error[0] - 0.9).abs() < 1e-12);
//! ```

use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// 自由度数组
///
/// 支持索引、迭代和映射操作。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DofArray<T> {
    data: Vec<T>,
}

impl<T> DofArray<T> {
    /// 从 `Vec` 创建
    #[inline]
    pub fn new(data: Vec<T>) -> Self {
        DofArray { data }
    }

    /// 自由度数量
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// 获取内部 `Vec`（消耗 self）
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// 映射转换
    pub fn map<U, F>(self, f: F) -> DofArray<U>
    where
        F: FnMut(T) -> U,
    {
        DofArray::new(self.data.into_iter().map(f).collect())
    }

    /// 带索引的映射转换
    pub fn map_with_dof<U, F>(self, mut f: F) -> DofArray<U>
    where
        F: FnMut(usize, T) -> U,
    {
        DofArray::new(self.data.into_iter().enumerate().map(|(dof, v)| f(dof, v)).collect())
    }

    /// 按自由度和另一个数组的元素执行映射
    ///
    /// 长度以较短者为准；调用方应先用 [`DofArray::check_len`] 校验。
    pub fn map_with<U, V, F>(self, other: DofArray<U>, mut f: F) -> DofArray<V>
    where
        F: FnMut(T, U) -> V,
    {
        DofArray::new(self.data.into_iter().zip(other.data).map(|(a, b)| f(a, b)).collect())
    }

    /// 校验长度，不一致时返回 [`ControlError::LengthMismatch`]
    pub fn check_len(&self, what: &'static str, expected: usize) -> Result<()> {
        check_len(what, expected, self.len())
    }
}

impl<T: Clone> DofArray<T> {
    /// 创建所有元素相同的数组
    pub fn splat(nb_dofs: usize, value: T) -> Self {
        DofArray::new(vec![value; nb_dofs])
    }
}

/// 校验切片长度
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ControlError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

impl<T> Index<usize> for DofArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for DofArray<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<T> From<Vec<T>> for DofArray<T> {
    fn from(data: Vec<T>) -> Self {
        DofArray::new(data)
    }
}

impl<T: Clone> From<&[T]> for DofArray<T> {
    fn from(data: &[T]) -> Self {
        DofArray::new(data.to_vec())
    }
}

impl<T, const N: usize> From<[T; N]> for DofArray<T> {
    fn from(data: [T; N]) -> Self {
        DofArray::new(Vec::from(data))
    }
}

impl<T> FromIterator<T> for DofArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        DofArray::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for DofArray<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a DofArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splat_and_index() {
        let mut arr = DofArray::splat(4, 1.5);
        assert_eq!(arr.len(), 4);
        arr[2] = 3.0;
        assert_eq!(arr[2], 3.0);
        assert_eq!(arr[3], 1.5);
    }

    #[test]
    fn test_map_with_dof() {
        let arr = DofArray::from([10, 20, 30]);
        let shifted = arr.map_with_dof(|dof, v| v + dof as i32);
        assert_eq!(shifted.as_slice(), &[10, 21, 32]);
    }

    #[test]
    fn test_map_with() {
        let a = DofArray::from([1.0, 2.0]);
        let b = DofArray::from([0.5, 0.25]);
        let c = a.map_with(b, |x, y| x * y);
        assert_eq!(c.as_slice(), &[0.5, 0.5]);
    }

    #[test]
    fn test_check_len() {
        let arr = DofArray::from([1, 2, 3]);
        assert!(arr.check_len("q", 3).is_ok());
        match arr.check_len("q", 4) {
            Err(ControlError::LengthMismatch {
                what,
                expected,
                actual,
            }) => {
                assert_eq!(what, "q");
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            },
            other => panic!("Expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_collect() {
        let arr: DofArray<usize> = (0..4).collect();
        assert_eq!(arr.into_vec(), vec![0, 1, 2, 3]);
    }
}
