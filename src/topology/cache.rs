//! Cache invalidation utilities shared by the mesh's derived structures.

use once_cell::sync::OnceCell;

/// Anything that caches data derived from mesh topology (orderings,
/// partitions, …) should implement this.
pub trait InvalidateCache {
    /// Invalidate *all* internal caches so future queries recompute correctly.
    fn invalidate_cache(&mut self);
}

// Blanket impl for Box<T>
impl<T: InvalidateCache + ?Sized> InvalidateCache for Box<T> {
    #[inline]
    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache();
    }
}

/// A lazily computed value with a validity flag.
///
/// Concurrent readers racing on an invalid entry run the initializer once;
/// the others block until it is stored. Invalidation needs `&mut self`, so it
/// can never overlap a read.
#[derive(Debug)]
pub struct Cached<T> {
    cell: OnceCell<T>,
    name: &'static str,
}

impl<T> Cached<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            cell: OnceCell::new(),
            name,
        }
    }

    /// Whether a value is currently stored.
    pub fn is_valid(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn get_or_init(&self, f: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(|| {
            log::debug!("recomputing {}", self.name);
            f()
        })
    }

    pub fn get_or_try_init<E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        self.cell.get_or_try_init(|| {
            log::debug!("recomputing {}", self.name);
            f()
        })
    }
}

impl<T> InvalidateCache for Cached<T> {
    fn invalidate_cache(&mut self) {
        self.cell.take();
    }
}
