use crate::theme::ThemeMode;
use tracing::{debug, warn};

pub mod store;

use store::{KeyValueStore, StoreError};

/// The only key the application persists.
pub const THEME_KEY: &str = "theme";

pub fn load_theme(store: &dyn KeyValueStore) -> ThemeMode {
    match store.get(THEME_KEY) {
        None => ThemeMode::default(),
        Some(raw) => raw.parse().unwrap_or_else(|err: String| {
            warn!(value = %raw, "ignoring stored theme: {err}");
            ThemeMode::default()
        }),
    }
}

/// Flips `current`, writes the new value and returns it.
pub fn toggle_theme(
    store: &mut dyn KeyValueStore,
    current: ThemeMode,
) -> Result<ThemeMode, StoreError> {
    let next = current.toggled();
    store.set(THEME_KEY, next.as_str())?;
    debug!(theme = %next, "theme preference saved");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::store::MemoryStore;
    use super::*;

    #[test]
    fn missing_or_unknown_value_defaults_to_dark() {
        let mut store = MemoryStore::default();
        assert_eq!(load_theme(&store), ThemeMode::Dark);

        store.set(THEME_KEY, "neon").expect("memory store never fails");
        assert_eq!(load_theme(&store), ThemeMode::Dark);
    }

    #[test]
    fn toggling_twice_restores_original_and_storage_tracks_each_step() {
        let mut store = MemoryStore::default();
        store.set(THEME_KEY, "light").expect("memory store never fails");
        let original = load_theme(&store);
        assert_eq!(original, ThemeMode::Light);

        let first = toggle_theme(&mut store, original).expect("toggle should persist");
        assert_eq!(first, ThemeMode::Dark);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));

        let second = toggle_theme(&mut store, first).expect("toggle should persist");
        assert_eq!(second, original);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("light"));
    }

    #[test]
    fn file_store_reflects_toggle_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let (mut store, _) = store::FileStore::open(dir.path());
        let next = toggle_theme(&mut store, ThemeMode::Dark).expect("toggle should persist");

        let (reopened, _) = store::FileStore::open(dir.path());
        assert_eq!(load_theme(&reopened), next);
    }
}
