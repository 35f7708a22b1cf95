//! Keyboard shortcut routing.
//!
//! Turns a raw key name into a normalized token and decides what the token
//! does: navigate, undo, classify into a category, or nothing.

use crate::category_store::Category;
use crate::config::KeyBindings;

/// What a key press asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction<'a> {
    Prev,
    Next,
    Undo,
    Classify(&'a Category),
    Unbound,
}

/// Normalizes a raw key name into the token stored as a shortcut.
///
/// Modifier names collapse to `Shift`, `Ctrl`, `Alt` and `Windows`; a single
/// uppercase ASCII letter becomes lowercase. Everything else is kept as typed.
/// Blank input yields `None`.
///
/// # Examples
///
/// ```
/// use imgtriage::shortcut::normalize_key;
///
/// assert_eq!(normalize_key("Q").as_deref(), Some("q"));
/// assert_eq!(normalize_key("control").as_deref(), Some("Ctrl"));
/// assert_eq!(normalize_key("  "), None);
/// ```
pub fn normalize_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let token = match raw.to_ascii_lowercase().as_str() {
        "shift" => "Shift".to_string(),
        "ctrl" | "control" => "Ctrl".to_string(),
        "alt" | "option" => "Alt".to_string(),
        "meta" | "super" | "win" | "windows" | "cmd" | "command" => "Windows".to_string(),
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_uppercase() => c.to_ascii_lowercase().to_string(),
                _ => raw.to_string(),
            }
        }
    };

    Some(token)
}

/// Finds the first category whose shortcut equals `key_token`.
///
/// The comparison is case-sensitive. When several categories share a
/// shortcut the earliest one in store order wins.
pub fn resolve<'a>(key_token: &str, categories: &'a [Category]) -> Option<&'a Category> {
    categories.iter().find(|c| c.shortcut == key_token)
}

/// Routes key tokens, giving the reserved navigation keys priority.
#[derive(Debug, Clone)]
pub struct ShortcutRouter {
    bindings: KeyBindings,
}

impl ShortcutRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Returns true if `key_token` is one of the navigation keys.
    pub fn is_reserved(&self, key_token: &str) -> bool {
        [&self.bindings.prev, &self.bindings.next, &self.bindings.undo]
            .iter()
            .any(|k| k.as_str() == key_token)
    }

    pub fn route<'a>(&self, key_token: &str, categories: &'a [Category]) -> KeyAction<'a> {
        if key_token == self.bindings.prev {
            KeyAction::Prev
        } else if key_token == self.bindings.next {
            KeyAction::Next
        } else if key_token == self.bindings.undo {
            KeyAction::Undo
        } else {
            resolve(key_token, categories)
                .map(KeyAction::Classify)
                .unwrap_or(KeyAction::Unbound)
        }
    }
}

impl Default for ShortcutRouter {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}
