use serde::{Deserialize, Serialize};
use std::fmt;

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

impl KeyCode {
    #[allow(dead_code)]
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

// Биты маски модификаторов в протоколе оболочки
const MOD_CTRL: u32 = 1 << 0;
const MOD_ALT: u32 = 1 << 1;
const MOD_SHIFT: u32 = 1 << 2;
const MOD_SUPER: u32 = 1 << 3;

/// Модификаторы клавиш
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn with_ctrl(mut self, ctrl: bool) -> Self {
        self.ctrl = ctrl;
        self
    }

    #[allow(dead_code)]
    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    #[allow(dead_code)]
    pub fn with_super(mut self, super_key: bool) -> Self {
        self.super_key = super_key;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.super_key
    }

    pub fn to_vec(&self) -> Vec<String> {
        let mut result = Vec::new();
        if self.ctrl { result.push("ctrl".to_string()); }
        if self.alt { result.push("alt".to_string()); }
        if self.shift { result.push("shift".to_string()); }
        if self.super_key { result.push("super".to_string()); }
        result
    }

    pub fn from_vec(modifiers: &[String]) -> Self {
        let mut result = Self::new();
        for modifier in modifiers {
            match modifier.as_str() {
                "ctrl" => result.ctrl = true,
                "alt" => result.alt = true,
                "shift" => result.shift = true,
                "super" => result.super_key = true,
                _ => {}
            }
        }
        result
    }

    /// Маска модификаторов в том виде, в котором её ждёт композитор
    pub fn mask(&self) -> u32 {
        let mut mask = 0;
        if self.ctrl { mask |= MOD_CTRL; }
        if self.alt { mask |= MOD_ALT; }
        if self.shift { mask |= MOD_SHIFT; }
        if self.super_key { mask |= MOD_SUPER; }
        mask
    }

    #[allow(dead_code)]
    pub fn from_mask(mask: u32) -> Self {
        Self {
            ctrl: mask & MOD_CTRL != 0,
            alt: mask & MOD_ALT != 0,
            shift: mask & MOD_SHIFT != 0,
            super_key: mask & MOD_SUPER != 0,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.to_vec();
        if modifiers.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", modifiers.join("+"))
        }
    }
}

/// Глобальная привязка клавиш, зарегистрированная в композиторе.
///
/// Снятия привязки нет: привязки живут столько же, сколько сессия.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub id: u32,
    pub key_code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyBinding {
    pub fn new(id: u32, key_code: KeyCode, modifiers: Modifiers) -> Self {
        Self { id, key_code, modifiers }
    }

    /// Человекочитаемое имя сочетания, например "super+KEY_32"
    pub fn combination_id(&self) -> String {
        if self.modifiers.is_empty() {
            format!("{}", self.key_code)
        } else {
            format!("{}+{}", self.modifiers, self.key_code)
        }
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.combination_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_creation() {
        let modifiers = Modifiers::new()
            .with_ctrl(true)
            .with_shift(true);

        assert!(modifiers.ctrl);
        assert!(modifiers.shift);
        assert!(!modifiers.alt);
        assert!(!modifiers.super_key);
        assert!(!modifiers.is_empty());
    }

    #[test]
    fn test_modifiers_mask() {
        let modifiers = Modifiers::new().with_super(true).with_shift(true);
        assert_eq!(modifiers.mask(), MOD_SUPER | MOD_SHIFT);
        assert_eq!(Modifiers::from_mask(modifiers.mask()), modifiers);
        assert_eq!(Modifiers::new().mask(), 0);
    }

    #[test]
    fn test_key_binding_combination_id() {
        let plain = KeyBinding::new(1, KeyCode::new(42), Modifiers::new());
        let chord = KeyBinding::new(2, KeyCode::new(42), Modifiers::new().with_ctrl(true));

        assert_eq!(plain.combination_id(), "KEY_42");
        assert_eq!(chord.combination_id(), "ctrl+KEY_42");
    }
}
