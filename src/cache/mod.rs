//! Kernel row cache
//!
//! Stores rows of the Q matrix keyed by example position, under a hard
//! byte budget. Rows grow on demand: a request for more columns than are
//! resident computes only the missing tail. Eviction is least-recently-used
//! and always removes whole rows.

use lru::LruCache;
use std::mem;

/// Element type of cached Q rows
pub type Qfloat = f64;

/// LRU cache of Q matrix rows with a byte budget
pub struct KernelCache {
    rows: LruCache<usize, Vec<Qfloat>>,
    /// Budget in `Qfloat` entries
    capacity: usize,
    /// Entries currently resident
    used: usize,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `budget_bytes` of row data.
    ///
    /// A budget smaller than one row still works: the requested row is kept
    /// until the next request and every access recomputes.
    pub fn with_memory_limit(budget_bytes: usize) -> Self {
        Self {
            rows: LruCache::unbounded(),
            capacity: budget_bytes / mem::size_of::<Qfloat>(),
            used: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Return row `index` covering columns `0..len`.
    ///
    /// `fill(start, tail)` is called to compute columns `start..len` when
    /// they are not resident. Returns the row and the number of leading
    /// entries that were already cached.
    pub fn get_row<F>(&mut self, index: usize, len: usize, fill: F) -> (&[Qfloat], usize)
    where
        F: FnOnce(usize, &mut [Qfloat]),
    {
        let mut row = match self.rows.pop(&index) {
            Some(row) => {
                self.used -= row.len();
                row
            }
            None => Vec::new(),
        };

        let start = row.len().min(len);
        if start < len {
            self.misses += 1;
            row.resize(len, 0.0);
            fill(start, &mut row[start..len]);
        } else {
            self.hits += 1;
        }

        while self.used + row.len() > self.capacity {
            match self.rows.pop_lru() {
                Some((evicted, data)) => {
                    log::trace!("cache evicted row {} ({} entries)", evicted, data.len());
                    self.used -= data.len();
                }
                None => break,
            }
        }

        self.used += row.len();
        let row = self.rows.get_or_insert_mut(index, || row);
        (&row[..len], start)
    }

    /// Exchange positions `i` and `j` in every resident row and key.
    ///
    /// Rows that reach column `min(i, j)` but not `max(i, j)` would end up
    /// with a hole, so they are dropped instead.
    pub fn swap_index(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };

        let row_lo = self.rows.pop(&lo);
        let row_hi = self.rows.pop(&hi);
        if let Some(row) = row_lo {
            self.rows.put(hi, row);
        }
        if let Some(row) = row_hi {
            self.rows.put(lo, row);
        }

        let mut partial = Vec::new();
        for (&key, row) in self.rows.iter_mut() {
            if row.len() > hi {
                row.swap(lo, hi);
            } else if row.len() > lo {
                partial.push(key);
            }
        }
        for key in partial {
            if let Some(row) = self.rows.pop(&key) {
                self.used -= row.len();
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.capacity,
            used: self.used,
            rows: self.rows.len(),
        }
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Budget in entries
    pub capacity: usize,
    /// Entries resident
    pub used: usize,
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_with(row: usize) -> impl FnOnce(usize, &mut [Qfloat]) {
        move |start, tail| {
            for (offset, value) in tail.iter_mut().enumerate() {
                *value = (row * 100 + start + offset) as Qfloat;
            }
        }
    }

    #[test]
    fn test_row_is_filled_then_hit() {
        let mut cache = KernelCache::with_memory_limit(1024);

        let (row, start) = cache.get_row(3, 4, fill_with(3));
        assert_eq!(start, 0);
        assert_eq!(row, &[300.0, 301.0, 302.0, 303.0]);

        let (row, start) = cache.get_row(3, 4, |_, _| panic!("row should be cached"));
        assert_eq!(start, 4);
        assert_eq!(row[2], 302.0);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_row_extension_computes_only_tail() {
        let mut cache = KernelCache::with_memory_limit(1024);
        cache.get_row(0, 2, fill_with(0));

        let (row, start) = cache.get_row(0, 5, |start, tail| {
            assert_eq!(start, 2);
            assert_eq!(tail.len(), 3);
            tail.fill(-1.0);
        });
        assert_eq!(start, 2);
        assert_eq!(row, &[0.0, 1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_lru_eviction_respects_budget() {
        // Room for two rows of four entries
        let mut cache = KernelCache::with_memory_limit(8 * mem::size_of::<Qfloat>());

        cache.get_row(0, 4, fill_with(0));
        cache.get_row(1, 4, fill_with(1));
        cache.get_row(0, 4, fill_with(0));
        cache.get_row(2, 4, fill_with(2));

        let stats = cache.stats();
        assert_eq!(stats.rows, 2);
        assert!(stats.used <= stats.capacity);

        // Row 1 was least recently used
        let (_, start) = cache.get_row(1, 4, fill_with(1));
        assert_eq!(start, 0);
    }

    #[test]
    fn test_zero_budget_still_returns_rows() {
        let mut cache = KernelCache::with_memory_limit(0);

        let (row, _) = cache.get_row(0, 3, fill_with(0));
        assert_eq!(row, &[0.0, 1.0, 2.0]);
        let (row, start) = cache.get_row(1, 3, fill_with(1));
        assert_eq!(start, 0);
        assert_eq!(row, &[100.0, 101.0, 102.0]);
        assert_eq!(cache.stats().rows, 1);
    }

    #[test]
    fn test_swap_index_moves_rows_and_columns() {
        let mut cache = KernelCache::with_memory_limit(1024);
        cache.get_row(0, 4, fill_with(0));
        cache.get_row(2, 4, fill_with(2));
        cache.get_row(3, 2, fill_with(3));

        cache.swap_index(1, 2);

        let (row, start) = cache.get_row(1, 4, |_, _| panic!("row should be cached"));
        assert_eq!(start, 4);
        assert_eq!(row, &[200.0, 202.0, 201.0, 203.0]);

        let (row, _) = cache.get_row(0, 4, |_, _| panic!("row should be cached"));
        assert_eq!(row, &[0.0, 2.0, 1.0, 3.0]);

        // Row 3 only covered column 1, so it was dropped
        let (_, start) = cache.get_row(3, 2, fill_with(3));
        assert_eq!(start, 0);
    }
}
