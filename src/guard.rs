//! Debug-only reentry detection.
//!
//! The map and list run caller code (finalizers, payload `Drop`) from
//! inside mutating operations. Rust's borrow rules already stop safe
//! reentry, but a finalizer can reach the same container again through
//! thread-local or raw-pointer back doors; in debug builds this check
//! turns that into an immediate panic instead of silent link corruption.
//! Release builds compile it to nothing.

use core::cell::Cell;
use core::marker::PhantomData;

pub(crate) struct ReentryCheck {
    #[cfg(debug_assertions)]
    active: Cell<bool>,
    // Keep !Send + !Sync in line with the single-threaded containers.
    _nosend: PhantomData<*mut ()>,
}

impl ReentryCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Mark a mutating section. Panics in debug builds if the section is
    /// already active on this container.
    #[inline]
    pub(crate) fn enter(&self) -> ReentryGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "container re-entered while mutating (finalizer called back in?)"
            );
            return ReentryGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            ReentryGuard { _lt: PhantomData }
        }
    }
}

pub(crate) struct ReentryGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ReentryCheck,
    #[cfg(not(debug_assertions))]
    _lt: PhantomData<&'a ()>,
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::ReentryCheck;

    #[test]
    fn sequential_sections_are_fine() {
        let c = ReentryCheck::new();
        drop(c.enter());
        drop(c.enter());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let c = ReentryCheck::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = c.enter();
            let _inner = c.enter();
        }));
        assert!(res.is_err(), "nested entry must panic in debug builds");
    }
}
