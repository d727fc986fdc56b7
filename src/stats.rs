//! Injectable probe instrumentation.
//!
//! A table records into the [`ProbeStats`] it was built with. Share one
//! instance between a table and a driver with `Rc` to read the counters while
//! the table stays borrowed elsewhere.

use core::cell::Cell;
use core::marker::PhantomData;

/// Counts lookups, slot probes, and key comparisons.
#[derive(Debug, Default)]
pub struct ProbeStats {
    lookups: Cell<u64>,
    probes: Cell<u64>,
    comparisons: Cell<u64>,
    // Counters are plain Cells; keep the type !Sync.
    _nosync: PhantomData<*mut ()>,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_lookup(&self) {
        self.lookups.set(self.lookups.get() + 1);
    }

    #[inline]
    pub(crate) fn record_probe(&self) {
        self.probes.set(self.probes.get() + 1);
    }

    /// Counted equality.
    #[inline]
    pub fn compare<A, B>(&self, a: &A, b: &B) -> bool
    where
        A: ?Sized + PartialEq<B>,
        B: ?Sized,
    {
        self.comparisons.set(self.comparisons.get() + 1);
        a == b
    }

    pub fn lookups(&self) -> u64 {
        self.lookups.get()
    }

    pub fn probes(&self) -> u64 {
        self.probes.get()
    }

    pub fn comparisons(&self) -> u64 {
        self.comparisons.get()
    }

    /// Mean comparisons per lookup; `0.0` before the first lookup.
    pub fn average_comparisons(&self) -> f64 {
        match self.lookups.get() {
            0 => 0.0,
            n => self.comparisons.get() as f64 / n as f64,
        }
    }

    pub fn reset(&self) {
        self.lookups.set(0);
        self.probes.set(0);
        self.comparisons.set(0);
    }
}
