//! Key bindings, loaded from `shortcut.toml`.

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every screen's bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub main: MainShortcuts,
    pub confirm: ConfirmShortcuts,
    pub preview: PreviewShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// Upload/report screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MainShortcuts {
    pub quit: Vec<String>,
    /// Edit the GSTIN field.
    pub gstin: Vec<String>,
    pub next_category: Vec<String>,
    pub prev_category: Vec<String>,
    /// Pick files by path.
    pub add_files: Vec<String>,
    pub clear_files: Vec<String>,
    pub upload: Vec<String>,
    pub generate: Vec<String>,
    pub refresh: Vec<String>,
    /// Switch between the uploaded-files and reports panes.
    pub switch_pane: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
    pub delete: Vec<String>,
    pub preview: Vec<String>,
    pub toggle_log: Vec<String>,
    pub dismiss: Vec<String>,
}

/// Confirmation dialog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmShortcuts {
    pub accept: Vec<String>,
    pub cancel: Vec<String>,
}

/// Spreadsheet preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewShortcuts {
    pub close: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
    pub page_down: Vec<String>,
    pub page_up: Vec<String>,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub next_sheet: Vec<String>,
    pub prev_sheet: Vec<String>,
}

/// InputBox editing keys. Plain letters are left out so they can be typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// Read from TOML, falling back to the defaults when the file is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let shortcuts: Shortcuts = toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(shortcuts)
        } else {
            Ok(Self::default())
        }
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for MainShortcuts {
    fn default() -> Self {
        Self {
            quit: keys(&["q"]),
            gstin: keys(&["g"]),
            next_category: keys(&["c", "]"]),
            prev_category: keys(&["["]),
            add_files: keys(&["a"]),
            clear_files: keys(&["x"]),
            upload: keys(&["u"]),
            generate: keys(&["p"]),
            refresh: keys(&["r"]),
            switch_pane: keys(&["Tab"]),
            down: keys(&["Down", "j"]),
            up: keys(&["Up", "k"]),
            delete: keys(&["d", "Delete"]),
            preview: keys(&["Enter", "v"]),
            toggle_log: keys(&["l"]),
            dismiss: keys(&["Esc"]),
        }
    }
}

impl Default for ConfirmShortcuts {
    fn default() -> Self {
        Self {
            accept: keys(&["Enter", "y"]),
            cancel: keys(&["Esc", "n"]),
        }
    }
}

impl Default for PreviewShortcuts {
    fn default() -> Self {
        Self {
            close: keys(&["Esc", "q"]),
            down: keys(&["Down", "j"]),
            up: keys(&["Up", "k"]),
            page_down: keys(&["PageDown", "Space"]),
            page_up: keys(&["PageUp", "b"]),
            top: keys(&["Home", "g"]),
            bottom: keys(&["End", "e"]),
            left: keys(&["Left", "h"]),
            right: keys(&["Right", "l"]),
            next_sheet: keys(&["Tab", "]"]),
            prev_sheet: keys(&["["]),
        }
    }
}

impl Default for InputBoxShortcuts {
    fn default() -> Self {
        Self {
            confirm: keys(&["Enter"]),
            cancel: keys(&["Esc"]),
            backspace: keys(&["Backspace"]),
            delete: keys(&["Delete"]),
            left: keys(&["Left"]),
            right: keys(&["Right"]),
            home: keys(&["Home"]),
            end: keys(&["End"]),
            clear_line: keys(&["Ctrl+u"]),
        }
    }
}

/// Whether `key` matches any of the binding strings.
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// Whether `key` matches one binding string such as "Ctrl+u", "a" or "Enter".
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    // A lone "+" is the plus key, not a separator.
    let (mods, name) = match shortcut.rsplit_once('+') {
        Some((mods, name)) if !name.is_empty() => (mods, name),
        _ => ("", shortcut),
    };

    let mut wanted = KeyModifiers::empty();
    for m in mods.split('+').filter(|m| !m.is_empty()) {
        wanted |= match m.to_ascii_lowercase().as_str() {
            "ctrl" => KeyModifiers::CONTROL,
            "alt" => KeyModifiers::ALT,
            "shift" => KeyModifiers::SHIFT,
            _ => return false,
        };
    }
    if key.modifiers != wanted {
        return false;
    }

    match named_key(name) {
        Some(code) => key.code == code,
        None => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => key.code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}

/// Key codes for the named keys a binding file may use.
fn named_key(name: &str) -> Option<KeyCode> {
    const NAMED: &[(&str, KeyCode)] = &[
        ("enter", KeyCode::Enter),
        ("esc", KeyCode::Esc),
        ("tab", KeyCode::Tab),
        ("backspace", KeyCode::Backspace),
        ("delete", KeyCode::Delete),
        ("up", KeyCode::Up),
        ("down", KeyCode::Down),
        ("left", KeyCode::Left),
        ("right", KeyCode::Right),
        ("home", KeyCode::Home),
        ("end", KeyCode::End),
        ("pageup", KeyCode::PageUp),
        ("pagedown", KeyCode::PageDown),
        ("space", KeyCode::Char(' ')),
    ];
    // Single characters stay case-sensitive.
    if name.chars().count() < 2 {
        return None;
    }
    NAMED
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Bindings joined for the help bar.
pub fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}
