//! Key bindings: arrows or vim-style hjkl move the cursor, Enter or Space taps.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Tap the cell under the cursor: select, swap with the selection, or spend a mode.
    Tap,
    Hint,
    Recruit,
    Autoplay,
    Settle,
    Reset,
    Quit,
    None,
}

/// Map key event to driver action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Tap,
        KeyCode::Char('?' | 'i') => Action::Hint,
        KeyCode::Char('b') => Action::Recruit,
        KeyCode::Char('a') => Action::Autoplay,
        KeyCode::Char('s') => Action::Settle,
        KeyCode::Char('r') => Action::Reset,
        _ => Action::None,
    }
}
