//! Host-side DAXPY (`y = a * x + y`) split into contiguous chunks, one per worker.
//!
//! Workers are tasks in a rayon scope over disjoint `&mut` chunks of `y`, so no locking is
//! needed. More workers than hardware threads simply queue on the pool.

use crate::error::{Error, Result};
use std::ops::Range;

/// Splits `[0, n)` into `workers` contiguous ranges of `n / workers` elements; the last range
/// absorbs the remainder. Ranges may be empty when `workers > n`.
pub fn chunk_ranges(n: usize, workers: usize) -> Result<Vec<Range<usize>>> {
    if workers == 0 {
        return Err(Error::InvalidConfiguration(
            "worker count must be at least 1".to_string(),
        ));
    }
    let chunk_size = n / workers;
    Ok((0..workers)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == workers - 1 { n } else { start + chunk_size };
            start..end
        })
        .collect())
}

/// Sequential kernel over one chunk.
pub fn daxpy(a: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi = a * xi + *yi;
    }
}

/// `y[i] = scalar * x[i] + y[i]` for every `i`, computed by `workers` parallel workers.
/// Returns once all workers finished.
pub fn compute_scaled_sum(scalar: f64, x: &[f64], y: &mut [f64], workers: usize) -> Result<()> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    let ranges = chunk_ranges(x.len(), workers)?;

    let mut chunks = Vec::with_capacity(ranges.len());
    let mut rest = y;
    for range in &ranges {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        chunks.push((range.clone(), head));
        rest = tail;
    }
    debug_assert!(rest.is_empty());

    rayon::scope(|scope| {
        for (range, y_chunk) in chunks {
            let x_chunk = &x[range];
            scope.spawn(move |_| daxpy(scalar, x_chunk, y_chunk));
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_workers_small_example() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut y = [0.0; 4];
        compute_scaled_sum(2.0, &x, &mut y, 2).unwrap();
        assert_eq!(y, [2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn last_chunk_absorbs_remainder() {
        assert_eq!(chunk_ranges(4, 3).unwrap(), vec![0..1, 1..2, 2..4]);
        assert_eq!(chunk_ranges(10, 4).unwrap(), vec![0..2, 2..4, 4..6, 6..10]);
        assert_eq!(chunk_ranges(5, 1).unwrap(), vec![0..5]);
    }

    #[test]
    fn chunks_cover_every_index_once() {
        for n in 0..20 {
            for workers in 1..=25 {
                let ranges = chunk_ranges(n, workers).unwrap();
                assert_eq!(ranges.len(), workers);
                let mut seen = vec![0u32; n];
                for range in ranges {
                    assert!(range.start <= range.end);
                    for i in range {
                        seen[i] += 1;
                    }
                }
                assert!(seen.iter().all(|&count| count == 1), "n={n} workers={workers}");
            }
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let n = 37;
        let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.5 - 3.0).collect();
        let y0: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let mut expected = y0.clone();
        daxpy(1.75, &x, &mut expected);
        for workers in 1..=n {
            let mut y = y0.clone();
            compute_scaled_sum(1.75, &x, &mut y, workers).unwrap();
            assert_eq!(y, expected, "workers={workers}");
        }
    }

    #[test]
    fn more_workers_than_elements() {
        let x = [1.0, 1.0, 1.0];
        let mut y = [1.0, 2.0, 3.0];
        compute_scaled_sum(3.0, &x, &mut y, 8).unwrap();
        assert_eq!(y, [4.0, 5.0, 6.0]);

        let mut empty: [f64; 0] = [];
        compute_scaled_sum(3.0, &[], &mut empty, 4).unwrap();
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut y = [0.0; 3];
        let err = compute_scaled_sum(1.0, &[1.0, 2.0], &mut y, 2).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { x_len: 2, y_len: 3 }));
        assert_eq!(y, [0.0; 3]);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut y = [0.0; 2];
        assert!(matches!(
            compute_scaled_sum(1.0, &[1.0, 2.0], &mut y, 0),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
