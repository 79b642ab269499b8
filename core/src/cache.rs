use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::settings::Settings;
use crate::store::SnapshotStore;

/// Holds the current settings snapshot behind an atomic pointer swap.
///
/// Readers never block and never observe a partially updated snapshot;
/// `replace` is independent of in-flight evaluations. When a store is
/// attached, every replace is mirrored to disk and process start reloads
/// the last-known-good snapshot.
pub struct SettingsCache {
    current: ArcSwap<Settings>,
    store: Option<SnapshotStore>,
}

impl SettingsCache {
    /// In-memory cache starting from the safe defaults.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Settings::disabled()),
            store: None,
        }
    }

    /// Cache backed by a snapshot store. A corrupt or unreadable persisted
    /// snapshot is logged and treated as "no snapshot".
    pub fn with_store(store: SnapshotStore) -> Self {
        let initial = match store.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::disabled(),
            Err(error) => {
                tracing::warn!(%error, "discarding persisted settings snapshot");
                Settings::disabled()
            }
        };
        Self {
            current: ArcSwap::from_pointee(initial),
            store: Some(store),
        }
    }

    /// Current snapshot. Never touches the network or the disk.
    pub fn get(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    /// Atomically swaps in a new snapshot and mirrors it to the store.
    /// A persist failure is logged; the in-memory swap always happens.
    pub fn replace(&self, settings: Settings) {
        if let Some(store) = &self.store {
            if let Err(error) = store.save(&settings) {
                tracing::warn!(%error, "failed to persist settings snapshot");
            }
        }
        self.current.store(Arc::new(settings));
    }
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new()
    }
}
