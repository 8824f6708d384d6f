//! One-key-one-symbol layouts.
//!
//! Each layout is a 41-byte key string in canonical symbol order: the 21
//! initials, 3 medials and 13 rimes, followed by the four tone marks in
//! ˙ˊˇˋ order. Space always finalises with tone 1.

use crate::syllable::{Bopomofo, BopomofoKind, Syllable};

use super::KeyBehavior;

/// Symbols in key-string order.
#[rustfmt::skip]
const SYMBOLS: [Bopomofo; 41] = {
    use crate::syllable::Bopomofo::*;
    [
        B, P, M, F, D, T, N, L, G, K, H, J, Q, X, ZH, CH, SH, R, Z, C, S,
        I, U, IU,
        A, O, E, EH, AI, EI, AU, OU, AN, EN, ANG, ENG, ER,
        TONE5, TONE2, TONE3, TONE4,
    ]
};

/// Dachen, as printed on stock keyboards.
pub const DEFAULT_KEYS: &[u8; 41] = b"1qaz2wsxedcrfv5tgbyhnujm8ik,9ol.0p;/-7634";

/// IBM lays the symbols out in dictionary order across the rows.
pub const IBM_KEYS: &[u8; 41] = b"1234567890-qwertyuiopasdfghjkl;zxcvbnm,./";

/// Gin-Yieh shifts the Dachen arrangement one column right and keeps the
/// tones on the left edge.
pub const GIN_YIEH_KEYS: &[u8; 41] = b"2wsx3edcrfvtgb6yhnujm8ik,9ol.0p;/-['=1qaz";

/// ET (Eten) favours pinyin-mnemonic letters for the initials.
pub const ET_KEYS: &[u8; 41] = b"bpmfdtnlvkhg7c,./j;'sexuaorwiqzy890-=1234";

/// Editor for the table family. Dvorak and Carpalx reuse this with the
/// Dachen table behind a positional remap applied by the caller.
#[derive(Debug, Clone)]
pub struct TableEditor {
    keys: &'static [u8; 41],
    syllable: Syllable,
}

impl TableEditor {
    pub fn new(keys: &'static [u8; 41]) -> TableEditor {
        TableEditor {
            keys,
            syllable: Syllable::new(),
        }
    }

    pub fn key_press(&mut self, key: u8) -> KeyBehavior {
        if key == b' ' {
            if self.syllable.is_empty() {
                return KeyBehavior::KeyError;
            }
            self.syllable.update(Bopomofo::TONE1);
            return KeyBehavior::Commit;
        }
        let symbol = match self.keys.iter().position(|&k| k == key) {
            Some(i) => SYMBOLS[i],
            None => return KeyBehavior::KeyError,
        };
        if symbol.kind() == BopomofoKind::Tone {
            if self.syllable.is_empty() {
                return KeyBehavior::KeyError;
            }
            self.syllable.update(symbol);
            return KeyBehavior::Commit;
        }
        // Editing after a tone was typed restarts tone entry.
        self.syllable.take_tone();
        self.syllable.update(symbol);
        KeyBehavior::Absorb
    }

    pub fn is_entering(&self) -> bool {
        !self.syllable.is_empty()
    }

    pub fn pop(&mut self) -> Option<Bopomofo> {
        self.syllable.pop()
    }

    pub fn clear(&mut self) {
        self.syllable.clear();
    }

    pub fn read(&self) -> Syllable {
        self.syllable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syl;
    use crate::syllable::Bopomofo::*;

    fn type_str(editor: &mut TableEditor, keys: &str) -> Vec<KeyBehavior> {
        keys.bytes().map(|k| editor.key_press(k)).collect()
    }

    #[test]
    fn dachen_ce4() {
        let mut editor = TableEditor::new(DEFAULT_KEYS);
        let behaviors = type_str(&mut editor, "hk4");
        assert_eq!(
            vec![KeyBehavior::Absorb, KeyBehavior::Absorb, KeyBehavior::Commit],
            behaviors
        );
        assert_eq!(syl![C, E, TONE4], editor.read());
    }

    #[test]
    fn dachen_space_is_tone1() {
        let mut editor = TableEditor::new(DEFAULT_KEYS);
        type_str(&mut editor, "5j/");
        assert_eq!(KeyBehavior::Commit, editor.key_press(b' '));
        assert_eq!(syl![ZH, U, ENG, TONE1], editor.read());
    }

    #[test]
    fn dachen_tone_keys() {
        for (key, tone) in [(b'6', TONE2), (b'3', TONE3), (b'4', TONE4), (b'7', TONE5)] {
            let mut editor = TableEditor::new(DEFAULT_KEYS);
            type_str(&mut editor, "su");
            assert_eq!(KeyBehavior::Commit, editor.key_press(key));
            assert_eq!(syl![N, I, tone], editor.read());
        }
    }

    #[test]
    fn tone_on_empty_buffer_is_an_error() {
        let mut editor = TableEditor::new(DEFAULT_KEYS);
        assert_eq!(KeyBehavior::KeyError, editor.key_press(b'6'));
        assert_eq!(KeyBehavior::KeyError, editor.key_press(b' '));
        assert!(!editor.is_entering());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let mut editor = TableEditor::new(DEFAULT_KEYS);
        assert_eq!(KeyBehavior::KeyError, editor.key_press(b'*'));
    }

    #[test]
    fn later_symbol_replaces_slot() {
        let mut editor = TableEditor::new(DEFAULT_KEYS);
        // two initials in a row: the second wins
        type_str(&mut editor, "1q");
        assert_eq!(syl![P], editor.read());
    }

    #[test]
    fn pop_is_inverse_of_absorb() {
        let mut editor = TableEditor::new(DEFAULT_KEYS);
        editor.key_press(b's');
        let before = editor.read();
        editor.key_press(b'u');
        editor.pop();
        assert_eq!(before, editor.read());
    }

    #[test]
    fn ibm_row_order() {
        let mut editor = TableEditor::new(IBM_KEYS);
        // ㄋ is the seventh initial, ㄧ the first medial, ˇ on '.'
        type_str(&mut editor, "7a");
        assert_eq!(KeyBehavior::Commit, editor.key_press(b'.'));
        assert_eq!(syl![N, I, TONE3], editor.read());
    }

    #[test]
    fn gin_yieh_tones_on_left_edge() {
        let mut editor = TableEditor::new(GIN_YIEH_KEYS);
        type_str(&mut editor, "d8");
        assert_eq!(KeyBehavior::Commit, editor.key_press(b'a'));
        assert_eq!(syl![N, I, TONE3], editor.read());
    }

    #[test]
    fn et_mnemonic_initials() {
        let mut editor = TableEditor::new(ET_KEYS);
        type_str(&mut editor, "ne");
        assert_eq!(KeyBehavior::Commit, editor.key_press(b'3'));
        assert_eq!(syl![N, I, TONE3], editor.read());
    }
}
