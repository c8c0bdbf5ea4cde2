//! Lock-free `f64` storage shared between training workers.
//!
//! Values are kept as raw bits in an [`AtomicU64`] and accessed with relaxed
//! loads and stores only. A read-modify-write is therefore two independent
//! operations, so concurrent writers can overwrite each other's updates. The
//! parallel training mode depends on exactly this behavior.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct SharedF64(AtomicU64);

impl SharedF64 {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl fmt::Debug for SharedF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(), f)
    }
}

/// Allocates a boxed slice of cells holding `values`.
pub(crate) fn cells(values: impl IntoIterator<Item = f64>) -> Box<[SharedF64]> {
    values.into_iter().map(SharedF64::new).collect()
}

/// Copies the current contents of `cells` into a plain vector.
pub(crate) fn snapshot(cells: &[SharedF64]) -> Vec<f64> {
    cells.iter().map(SharedF64::load).collect()
}
