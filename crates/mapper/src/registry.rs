//! Default data-adapter slot.
//!
//! Prefer building one [`AdapterRegistry`] at startup and passing it to mapper
//! construction. [`AdapterRegistry::global`] exists for code that expects a
//! process-wide default; it is a single slot shared by every mapper type.
//! Swaps are atomic, but a `set_default_adapter` racing with construction on
//! another thread gives no ordering guarantee: register before building
//! mappers.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::adapter::SharedAdapter;

static GLOBAL: Lazy<AdapterRegistry> = Lazy::new(AdapterRegistry::new);

#[derive(Default)]
pub struct AdapterRegistry {
    // `ArcSwap` needs a sized pointee, hence the extra Arc around the trait object.
    slot: ArcSwapOption<SharedAdapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self { Self { slot: ArcSwapOption::empty() } }

    /// Registry pre-loaded with `adapter` as the default.
    pub fn with_default(adapter: SharedAdapter) -> Self {
        let reg = Self::new();
        reg.set_default(adapter);
        reg
    }

    pub fn global() -> &'static AdapterRegistry { &GLOBAL }

    /// Replace the default adapter unconditionally.
    pub fn set_default(&self, adapter: SharedAdapter) {
        info!(adapter = adapter.name(), "default data adapter registered");
        self.slot.store(Some(Arc::new(adapter)));
    }

    pub fn default_adapter(&self) -> Option<SharedAdapter> {
        self.slot.load_full().map(|a| Arc::clone(&*a))
    }

    pub fn clear(&self) {
        debug!("default data adapter cleared");
        self.slot.store(None);
    }
}

/// Register `adapter` as the process-wide default.
pub fn set_default_adapter(adapter: SharedAdapter) {
    AdapterRegistry::global().set_default(adapter);
}

/// Current process-wide default, if any.
pub fn default_adapter() -> Option<SharedAdapter> {
    AdapterRegistry::global().default_adapter()
}
