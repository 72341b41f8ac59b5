use crate::error::FeedError;
use crate::storage::{KeyValueStore, MUTED_KEY, PLAYER_SIZE_KEY, TEXT_LAYOUT_KEY};
use crate::types::{PlayerSize, TextLayout};

/// Persisted viewer preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub muted: bool,
    pub player_size: PlayerSize,
    pub text_layout: TextLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            muted: true,
            player_size: PlayerSize::default(),
            text_layout: TextLayout::default(),
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults for unset or unknown values.
    /// An unset mute flag means muted.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let muted = store
            .get(MUTED_KEY)
            .map(|value| value != "false")
            .unwrap_or(true);
        let player_size = store
            .get(PLAYER_SIZE_KEY)
            .and_then(|value| PlayerSize::parse(&value))
            .unwrap_or_default();
        let text_layout = store
            .get(TEXT_LAYOUT_KEY)
            .and_then(|value| TextLayout::parse(&value))
            .unwrap_or_default();

        Self {
            muted,
            player_size,
            text_layout,
        }
    }

    pub fn set_muted(&mut self, muted: bool, store: &mut dyn KeyValueStore) -> Result<(), FeedError> {
        self.muted = muted;
        store.set(MUTED_KEY, if muted { "true" } else { "false" })
    }

    pub fn set_player_size(
        &mut self,
        size: PlayerSize,
        store: &mut dyn KeyValueStore,
    ) -> Result<(), FeedError> {
        self.player_size = size;
        store.set(PLAYER_SIZE_KEY, size.as_str())
    }

    pub fn set_text_layout(
        &mut self,
        layout: TextLayout,
        store: &mut dyn KeyValueStore,
    ) -> Result<(), FeedError> {
        self.text_layout = layout;
        store.set(TEXT_LAYOUT_KEY, layout.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_unset_mute_means_muted() {
        let store = MemoryStore::new();
        let settings = Settings::load(&store);
        assert!(settings.muted);
        assert_eq!(settings.player_size, PlayerSize::Large);
        assert_eq!(settings.text_layout, TextLayout::Overlay);
    }

    #[test]
    fn test_load_persisted_values() {
        let store = MemoryStore::new()
            .with_entry(MUTED_KEY, "false")
            .with_entry(PLAYER_SIZE_KEY, "small")
            .with_entry(TEXT_LAYOUT_KEY, "nonsense");

        let settings = Settings::load(&store);
        assert!(!settings.muted);
        assert_eq!(settings.player_size, PlayerSize::Small);
        assert_eq!(settings.text_layout, TextLayout::Overlay);
    }

    #[test]
    fn test_setters_persist() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();

        settings.set_muted(false, &mut store).unwrap();
        settings.set_player_size(PlayerSize::Full, &mut store).unwrap();

        assert_eq!(store.get(MUTED_KEY).as_deref(), Some("false"));
        assert_eq!(store.get(PLAYER_SIZE_KEY).as_deref(), Some("full"));
        assert_eq!(Settings::load(&store), settings);
    }
}
