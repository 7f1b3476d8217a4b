//! Thread-distribution capability used to split regions per worker.

/// Tells the mesh how many workers share a region and which one is asking.
pub trait ThreadDistribution: Send + Sync + std::fmt::Debug + 'static {
    fn num_threads(&self) -> usize;
    /// Index of the calling worker, in `0..num_threads()`.
    fn current_thread(&self) -> usize;
}

/// Everything runs on one worker.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleThread;

impl ThreadDistribution for SingleThread {
    fn num_threads(&self) -> usize {
        1
    }
    fn current_thread(&self) -> usize {
        0
    }
}

/// A fixed worker count; the calling thread is always reported as worker 0.
#[derive(Clone, Copy, Debug)]
pub struct FixedThreads(pub usize);

impl ThreadDistribution for FixedThreads {
    fn num_threads(&self) -> usize {
        self.0.max(1)
    }
    fn current_thread(&self) -> usize {
        0
    }
}

/// Workers of the current rayon pool.
#[cfg(feature = "rayon")]
#[derive(Clone, Copy, Debug, Default)]
pub struct RayonThreads;

#[cfg(feature = "rayon")]
impl ThreadDistribution for RayonThreads {
    fn num_threads(&self) -> usize {
        rayon::current_num_threads()
    }
    fn current_thread(&self) -> usize {
        rayon::current_thread_index().unwrap_or(0)
    }
}

/// Bounds of chunk `k` when `len` items are split into `n` contiguous chunks
/// whose sizes differ by at most one.
pub fn chunk_bounds(len: usize, n: usize, k: usize) -> std::ops::Range<usize> {
    let n = n.max(1);
    (k * len / n)..((k + 1) * len / n)
}
