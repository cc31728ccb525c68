use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Имена клавиш для глобальных привязок и их evdev коды
pub struct KeycodeMap;

// Буквы в порядке алфавита и их коды (KEY_A..KEY_Z разбросаны по раскладке)
const LETTERS: [(&str, u16); 26] = [
    ("a", 30), ("b", 48), ("c", 46), ("d", 32), ("e", 18), ("f", 33), ("g", 34),
    ("h", 35), ("i", 23), ("j", 36), ("k", 37), ("l", 38), ("m", 50), ("n", 49),
    ("o", 24), ("p", 25), ("q", 16), ("r", 19), ("s", 31), ("t", 20), ("u", 22),
    ("v", 47), ("w", 17), ("x", 45), ("y", 21), ("z", 44),
];

static KEY_NAME_TO_CODE: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, u16> = LETTERS.iter().copied().collect();

    // KEY_1..KEY_9 идут подряд с кода 2, KEY_0 после них
    for (offset, name) in ["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"].iter().enumerate() {
        map.insert(*name, 2 + offset as u16);
    }

    // KEY_F1..KEY_F10 подряд с 59, F11/F12 отдельно
    for (offset, name) in ["f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10"].iter().enumerate() {
        map.insert(*name, 59 + offset as u16);
    }
    map.insert("f11", 87);
    map.insert("f12", 88);

    map.insert("escape", 1);
    map.insert("backspace", 14);
    map.insert("tab", 15);
    map.insert("enter", 28);
    map.insert("space", 57);
    map.insert("print", 99);
    map.insert("home", 102);
    map.insert("end", 107);
    map.insert("pageup", 104);
    map.insert("pagedown", 109);
    map.insert("delete", 111);

    map.insert("up", 103);
    map.insert("down", 108);
    map.insert("left", 105);
    map.insert("right", 106);

    map
});

static CODE_TO_KEY_NAME: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    KEY_NAME_TO_CODE.iter().map(|(&name, &code)| (code, name)).collect()
});

impl KeycodeMap {
    /// Получить код клавиши по её имени (регистр не важен)
    pub fn get_key_code(key_name: &str) -> Option<u16> {
        let normalized = key_name.to_lowercase();
        KEY_NAME_TO_CODE.get(normalized.as_str()).copied()
    }

    /// Получить имя клавиши по её коду
    pub fn get_key_name(keycode: u16) -> Option<&'static str> {
        CODE_TO_KEY_NAME.get(&keycode).copied()
    }
}
