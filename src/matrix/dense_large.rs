//! Dense matrices too large for a single allocation.
//!
//! Elements are stored row-major across fixed-size blocks, so the element
//! count may exceed what one `Vec` can address on the target.

use crate::core::kernel::{check_mult_shapes, prepare_output};
use crate::core::scalar::Scalar;
use crate::core::traits::{MatShape, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::vector::DenseVector;
use crate::parallel::KernelConfig;

/// Default number of elements per block.
pub const DEFAULT_BLOCK_LEN: usize = 1 << 20;

#[derive(Clone, Debug)]
pub struct DenseLargeMatrix<T> {
    rows: usize,
    cols: usize,
    block_len: usize,
    blocks: Vec<Vec<T>>,
}

impl<T: Scalar> DenseLargeMatrix<T> {
    pub fn new(rows: usize, cols: usize) -> Result<Self, KError> {
        Self::with_block_len(rows, cols, DEFAULT_BLOCK_LEN)
    }

    /// Zero matrix whose blocks hold `block_len` elements each.
    pub fn with_block_len(rows: usize, cols: usize, block_len: usize) -> Result<Self, KError> {
        if block_len == 0 {
            return Err(KError::InvalidInput("block length must be positive".into()));
        }
        let total = rows
            .checked_mul(cols)
            .ok_or_else(|| KError::InvalidInput(format!("{}x{} elements overflow usize", rows, cols)))?;
        let mut blocks = Vec::with_capacity(total.div_ceil(block_len));
        let mut left = total;
        while left > 0 {
            let len = left.min(block_len);
            blocks.push(vec![T::zero(); len]);
            left -= len;
        }
        Ok(Self { rows, cols, block_len, blocks })
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    fn locate(&self, i: usize, j: usize) -> (usize, usize) {
        let k = i * self.cols + j;
        (k / self.block_len, k % self.block_len)
    }
}

impl<T> MatShape for DenseLargeMatrix<T> {
    fn nrows(&self) -> usize {
        self.rows
    }
    fn ncols(&self) -> usize {
        self.cols
    }
}

impl<T: Scalar> Matrix2D<T> for DenseLargeMatrix<T> {
    type Like = DenseLargeMatrix<T>;
    type Like1D = DenseVector<T>;

    #[inline]
    fn get_quick(&self, i: usize, j: usize) -> T {
        let (b, o) = self.locate(i, j);
        self.blocks[b][o]
    }

    #[inline]
    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        let (b, o) = self.locate(i, j);
        self.blocks[b][o] = value;
        Ok(())
    }

    /// # Panics
    /// If `rows * cols` overflows `usize`.
    fn like(&self, rows: usize, cols: usize) -> Self {
        match Self::with_block_len(rows, cols, self.block_len) {
            Ok(m) => m,
            Err(e) => panic!("{}", e),
        }
    }

    fn like_1d(&self, size: usize) -> DenseVector<T> {
        DenseVector::zeros(size)
    }

    fn copy(&self) -> Result<Self, KError> {
        Ok(self.clone())
    }

    fn assign(&mut self, value: T) -> Result<&mut Self, KError> {
        self.blocks.iter_mut().for_each(|b| b.fill(value));
        Ok(self)
    }

    fn z_mult<X, Y>(
        &self,
        cfg: &KernelConfig,
        x: &X,
        y: &mut Y,
        alpha: T,
        beta: T,
        transpose: bool,
    ) -> Result<(), KError>
    where
        X: Matrix1D<T>,
        Y: Matrix1D<T>,
    {
        let _ = cfg;
        let (m, _) = check_mult_shapes(self, x, y, transpose)?;
        let mut acc = vec![T::zero(); m];
        // Walk the blocks in storage order; each element knows its (i, j)
        // from the running linear index.
        let mut k = 0usize;
        for block in &self.blocks {
            for &a in block {
                if a != T::zero() {
                    let (i, j) = (k / self.cols, k % self.cols);
                    if transpose {
                        acc[j] = acc[j] + a * x.get_quick(i);
                    } else {
                        acc[i] = acc[i] + a * x.get_quick(j);
                    }
                }
                k += 1;
            }
        }
        prepare_output(y, beta)?;
        for (r, s) in acc.into_iter().enumerate() {
            let cur = y.get_quick(r);
            y.set_quick(r, cur + alpha * s)?;
        }
        Ok(())
    }
}
