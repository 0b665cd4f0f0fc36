//! Dense and sparse vectors.

use crate::core::scalar::Scalar;
use crate::core::traits::{Indexing, Matrix1D};
use crate::error::KError;
use std::collections::BTreeMap;

/// Contiguous vector.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseVector<T> {
    data: Vec<T>,
}

impl<T: Scalar> DenseVector<T> {
    /// Zero vector of length `size`.
    pub fn zeros(size: usize) -> Self {
        Self { data: vec![T::zero(); size] }
    }

    pub fn from_fn(size: usize, f: impl FnMut(usize) -> T) -> Self {
        Self { data: (0..size).map(f).collect() }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> From<Vec<T>> for DenseVector<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> AsRef<[T]> for DenseVector<T> {
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}

impl<T> AsMut<[T]> for DenseVector<T> {
    fn as_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> std::ops::Index<usize> for DenseVector<T> {
    type Output = T;
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> std::ops::IndexMut<usize> for DenseVector<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T> Indexing for DenseVector<T> {
    fn size(&self) -> usize {
        self.data.len()
    }
}

impl<T: Scalar> Matrix1D<T> for DenseVector<T> {
    type Like = DenseVector<T>;

    #[inline]
    fn get_quick(&self, i: usize) -> T {
        self.data[i]
    }

    #[inline]
    fn set_quick(&mut self, i: usize, value: T) -> Result<(), KError> {
        self.data[i] = value;
        Ok(())
    }

    fn like(&self, size: usize) -> Self {
        Self::zeros(size)
    }

    fn as_slice(&self) -> Option<&[T]> {
        Some(&self.data)
    }

    fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        Some(&mut self.data)
    }

    fn copy(&self) -> Result<Self, KError> {
        Ok(self.clone())
    }
}

/// Sparse vector: ordered index→value map, zero everywhere else.
///
/// Writing zero removes the entry, so the map never stores explicit zeros.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector<T> {
    size: usize,
    entries: BTreeMap<usize, T>,
}

impl<T: Scalar> SparseVector<T> {
    pub fn new(size: usize) -> Self {
        Self { size, entries: BTreeMap::new() }
    }

    /// Stored `(index, value)` pairs in increasing index order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.entries.iter().map(|(&i, &v)| (i, v))
    }
}

impl<T> Indexing for SparseVector<T> {
    fn size(&self) -> usize {
        self.size
    }
}

impl<T: Scalar> Matrix1D<T> for SparseVector<T> {
    type Like = SparseVector<T>;

    fn get_quick(&self, i: usize) -> T {
        self.entries.get(&i).copied().unwrap_or_else(T::zero)
    }

    fn set_quick(&mut self, i: usize, value: T) -> Result<(), KError> {
        if value == T::zero() {
            self.entries.remove(&i);
        } else {
            self.entries.insert(i, value);
        }
        Ok(())
    }

    fn like(&self, size: usize) -> Self {
        Self::new(size)
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, T)) {
        for (&i, &v) in &self.entries {
            f(i, v);
        }
    }

    fn cardinality(&self) -> usize {
        self.entries.len()
    }

    fn copy(&self) -> Result<Self, KError> {
        Ok(self.clone())
    }

    fn assign(&mut self, value: T) -> Result<&mut Self, KError> {
        self.entries.clear();
        if value != T::zero() {
            self.entries.extend((0..self.size).map(|i| (i, value)));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::{div, minus_mult};

    #[test]
    fn dense_assign_chain() {
        let mut z = DenseVector::from(vec![4.0, 6.0]);
        let v = DenseVector::from(vec![1.0, 1.0]);
        z.assign_with(&v, minus_mult(2.0)).unwrap().assign_fn(div(2.0)).unwrap();
        assert_eq!(z.as_ref(), &[1.0, 2.0]);
    }

    #[test]
    fn dense_bounds() {
        let mut v = DenseVector::<i64>::zeros(3);
        assert!(v.set(3, 1).is_err());
        assert!(matches!(v.get(5), Err(KError::IndexOutOfBounds { .. })));
        v.set(2, 9).unwrap();
        assert_eq!(v.get(2).unwrap(), 9);
    }

    #[test]
    fn sparse_drops_zeros() {
        let mut s = SparseVector::<i32>::new(10);
        s.set(3, 5).unwrap();
        s.set(7, 1).unwrap();
        assert_eq!(s.cardinality(), 2);
        s.set(3, 0).unwrap();
        assert_eq!(s.cardinality(), 1);
        assert_eq!(s.get_quick(3), 0);
        assert_eq!(s.entries().collect::<Vec<_>>(), vec![(7, 1)]);
    }

    #[test]
    fn sparse_and_dense_compare_elementwise() {
        let mut s = SparseVector::<f32>::new(3);
        s.set(1, 2.5).unwrap();
        let d = s.to_dense();
        assert!(s.equals(&d));
        assert!(d.equals(&s.copy().unwrap()));
        let mut other = DenseVector::<f32>::zeros(4);
        assert!(other.assign_from(&d).is_err());
    }
}
