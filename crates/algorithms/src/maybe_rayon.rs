//! Row loops that run on rayon with the `parallel` feature and on
//! `std::iter` without it. Output order is the same either way.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// `into_par_iter()` resolving to `into_iter()`, so the chain below
    /// compiles against `Iterator`
    pub trait IntoParallelIterator {
        type Iter;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
use sequential::IntoParallelIterator;

/// Row-major buffer of `rows` rows, each produced by `row_fn(row)`
pub(crate) fn collect_rows<T, F>(rows: usize, row_fn: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    (0..rows).into_par_iter().flat_map(row_fn).collect()
}
