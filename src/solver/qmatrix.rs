//! Q matrices seen by the decomposition solver
//!
//! `Q_ij = s_i s_j K(x_i, x_j)` plus an optional diagonal shift for the
//! squared-slack formulations. ε-SVR and ν-SVR double every example into a
//! positive and a negative variable that share one kernel row.

use crate::cache::{KernelCache, Qfloat};
use crate::kernel::KernelMatrix;

/// Row access to the Q matrix, addressed by the solver's current positions
pub trait QMatrix {
    /// Row `i` over columns `0..len`
    fn get_q(&mut self, i: usize, len: usize) -> &[Qfloat];

    /// Diagonal `Q_ii`
    fn get_qd(&self) -> &[f64];

    /// Exchange positions `i` and `j`
    fn swap_index(&mut self, i: usize, j: usize);

    /// Row cache backing `get_q`
    fn cache(&self) -> &KernelCache;
}

/// Q for classification, one-class and domain description.
///
/// `signs` are ±1 labels for classification and all `+1` otherwise.
pub struct KernelQ<'a> {
    kernel: KernelMatrix<'a>,
    cache: KernelCache,
    signs: Vec<i8>,
    diag_shift: Vec<f64>,
    qd: Vec<f64>,
}

impl<'a> KernelQ<'a> {
    pub fn new(
        kernel: KernelMatrix<'a>,
        signs: Vec<i8>,
        diag_shift: Vec<f64>,
        cache_bytes: usize,
    ) -> Self {
        debug_assert_eq!(kernel.len(), signs.len());
        debug_assert_eq!(kernel.len(), diag_shift.len());
        let qd = (0..kernel.len())
            .map(|i| kernel.eval(i, i) + diag_shift[i])
            .collect();
        Self {
            kernel,
            cache: KernelCache::with_memory_limit(cache_bytes),
            signs,
            diag_shift,
            qd,
        }
    }
}

impl QMatrix for KernelQ<'_> {
    fn get_q(&mut self, i: usize, len: usize) -> &[Qfloat] {
        let kernel = &self.kernel;
        let signs = &self.signs;
        let shift = self.diag_shift[i];
        let (row, _) = self.cache.get_row(i, len, |start, tail| {
            let s_i = f64::from(signs[i]);
            for (offset, value) in tail.iter_mut().enumerate() {
                let j = start + offset;
                let mut q = s_i * f64::from(signs[j]) * kernel.eval(i, j);
                if j == i {
                    q += shift;
                }
                *value = q;
            }
        });
        row
    }

    fn get_qd(&self) -> &[f64] {
        &self.qd
    }

    fn swap_index(&mut self, i: usize, j: usize) {
        self.cache.swap_index(i, j);
        self.kernel.swap_index(i, j);
        self.signs.swap(i, j);
        self.diag_shift.swap(i, j);
        self.qd.swap(i, j);
    }

    fn cache(&self) -> &KernelCache {
        &self.cache
    }
}

/// Q for the doubled regression variables.
///
/// Variable `k < l` is `α⁺_k` and `k + l` is `α⁻_k`. The cache holds plain
/// kernel rows by example; signed rows are assembled into one of two
/// buffers so the solver can keep the previous row while fetching the next.
pub struct SvrQ<'a> {
    kernel: KernelMatrix<'a>,
    cache: KernelCache,
    l: usize,
    signs: Vec<i8>,
    index: Vec<usize>,
    qd: Vec<f64>,
    buffers: [Vec<Qfloat>; 2],
    next_buffer: usize,
}

impl<'a> SvrQ<'a> {
    pub fn new(kernel: KernelMatrix<'a>, cache_bytes: usize) -> Self {
        let l = kernel.len();
        let mut signs = Vec::with_capacity(2 * l);
        let mut index = Vec::with_capacity(2 * l);
        signs.extend(std::iter::repeat(1i8).take(l));
        signs.extend(std::iter::repeat(-1i8).take(l));
        index.extend(0..l);
        index.extend(0..l);

        let diagonal: Vec<f64> = (0..l).map(|k| kernel.eval(k, k)).collect();
        let qd = diagonal.iter().chain(diagonal.iter()).copied().collect();

        Self {
            kernel,
            cache: KernelCache::with_memory_limit(cache_bytes),
            l,
            signs,
            index,
            qd,
            buffers: [vec![0.0; 2 * l], vec![0.0; 2 * l]],
            next_buffer: 0,
        }
    }
}

impl QMatrix for SvrQ<'_> {
    fn get_q(&mut self, i: usize, len: usize) -> &[Qfloat] {
        let real_i = self.index[i];
        let kernel = &self.kernel;
        let (row, _) = self.cache.get_row(real_i, self.l, |start, tail| {
            for (offset, value) in tail.iter_mut().enumerate() {
                *value = kernel.eval(real_i, start + offset);
            }
        });

        let buffer = &mut self.buffers[self.next_buffer];
        self.next_buffer = 1 - self.next_buffer;
        let s_i = f64::from(self.signs[i]);
        for (j, value) in buffer.iter_mut().take(len).enumerate() {
            *value = s_i * f64::from(self.signs[j]) * row[self.index[j]];
        }
        &buffer[..len]
    }

    fn get_qd(&self) -> &[f64] {
        &self.qd
    }

    fn swap_index(&mut self, i: usize, j: usize) {
        self.signs.swap(i, j);
        self.index.swap(i, j);
        self.qd.swap(i, j);
    }

    fn cache(&self) -> &KernelCache {
        &self.cache
    }
}
