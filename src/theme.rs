use std::collections::HashMap;

pub const STORAGE_KEY: &str = "theme";
pub const TOGGLE_ID: &str = "themeToggle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Unknown values are treated as absent.
    pub fn parse(value: &str) -> Option<Theme> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// The toggle shows what clicking it switches to.
    pub fn glyph(self) -> &'static str {
        match self {
            Theme::Dark => "\u{2600}\u{fe0f}",
            Theme::Light => "\u{1f319}",
        }
    }
}

/// Key-value storage that survives page loads (browser local storage).
pub trait ThemeStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryThemeStore {
    values: HashMap<String, String>,
}

impl ThemeStore for MemoryThemeStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// DOM state to apply: the `data-theme` attribute and the toggle's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeView {
    pub attribute: &'static str,
    pub glyph: &'static str,
}

impl From<Theme> for ThemeView {
    fn from(theme: Theme) -> Self {
        Self {
            attribute: theme.as_str(),
            glyph: theme.glyph(),
        }
    }
}

pub struct ThemeController<S> {
    store: S,
    current: Theme,
}

impl<S: ThemeStore> ThemeController<S> {
    pub fn load(store: S) -> (Self, ThemeView) {
        let current = store
            .get(STORAGE_KEY)
            .and_then(|value| Theme::parse(&value))
            .unwrap_or_default();
        (Self { store, current }, current.into())
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn toggle(&mut self) -> ThemeView {
        self.current = self.current.toggled();
        self.store.set(STORAGE_KEY, self.current.as_str());
        self.current.into()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_light_when_unset_or_garbage() {
        let (controller, view) = ThemeController::load(MemoryThemeStore::default());
        assert_eq!(controller.current(), Theme::Light);
        assert_eq!(view.attribute, "light");
        assert_eq!(view.glyph, Theme::Light.glyph());

        let mut store = MemoryThemeStore::default();
        store.set(STORAGE_KEY, "solarized");
        let (controller, _) = ThemeController::load(store);
        assert_eq!(controller.current(), Theme::Light);
    }

    #[test]
    fn loads_stored_theme() {
        let mut store = MemoryThemeStore::default();
        store.set(STORAGE_KEY, "dark");
        let (_, view) = ThemeController::load(store);
        assert_eq!(view, ThemeView::from(Theme::Dark));
    }

    #[test]
    fn toggle_writes_back_immediately() {
        let (mut controller, _) = ThemeController::load(MemoryThemeStore::default());
        let view = controller.toggle();
        assert_eq!(view.attribute, "dark");
        assert_eq!(view.glyph, "\u{2600}\u{fe0f}");
        assert_eq!(controller.store().get(STORAGE_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn toggling_twice_round_trips() {
        for start in [Theme::Light, Theme::Dark] {
            let mut store = MemoryThemeStore::default();
            store.set(STORAGE_KEY, start.as_str());
            let (mut controller, initial) = ThemeController::load(store);
            controller.toggle();
            let view = controller.toggle();
            assert_eq!(view, initial);
            assert_eq!(controller.store().get(STORAGE_KEY).as_deref(), Some(start.as_str()));
        }
    }
}
