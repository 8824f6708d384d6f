//! The phonetic editor: one in-progress syllable behind a layout.
//!
//! This is the layer the session feeds printable keys into. It owns the
//! family editor selected by the configured [`KeyboardLayout`], applies the
//! positional remap for the Dvorak and Carpalx boards, and exposes the
//! completed syllable (plus the alternative completion some layouts
//! produce) after a [`KeyBehavior::Commit`].

use crate::layout::dc26::DaChien26;
use crate::layout::et26::Et26;
use crate::layout::hsu::Hsu;
use crate::layout::pinyin::{Pinyin, PinyinVariant};
use crate::layout::table::{TableEditor, DEFAULT_KEYS, ET_KEYS, GIN_YIEH_KEYS, IBM_KEYS};
use crate::layout::{dvorak_to_qwerty, qgmlwy_to_qwerty, KeyBehavior, KeyboardLayout};
use crate::syllable::{Bopomofo, Syllable};

/// Positional remap applied before the family editor sees the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Remap {
    None,
    Dvorak,
    Qgmlwy,
}

impl Remap {
    fn apply(self, key: u8) -> u8 {
        match self {
            Remap::None => key,
            Remap::Dvorak => dvorak_to_qwerty(key),
            Remap::Qgmlwy => qgmlwy_to_qwerty(key),
        }
    }
}

/// The family editors as a tagged type; auxiliary state (Pinyin letter
/// buffer, toggle state) lives inside the variant that needs it.
#[derive(Debug, Clone)]
enum LayoutEngine {
    Table(TableEditor),
    Hsu(Hsu),
    Et26(Et26),
    DaChien26(DaChien26),
    Pinyin(Pinyin),
}

#[derive(Debug, Clone)]
pub struct PhoneticEditor {
    layout: KeyboardLayout,
    remap: Remap,
    engine: LayoutEngine,
}

impl PhoneticEditor {
    pub fn new(layout: KeyboardLayout) -> PhoneticEditor {
        use crate::layout::KeyboardLayout::*;
        let (remap, engine) = match layout {
            Default => (
                Remap::None,
                LayoutEngine::Table(TableEditor::new(DEFAULT_KEYS)),
            ),
            Ibm => (Remap::None, LayoutEngine::Table(TableEditor::new(IBM_KEYS))),
            GinYieh => (
                Remap::None,
                LayoutEngine::Table(TableEditor::new(GIN_YIEH_KEYS)),
            ),
            Et => (Remap::None, LayoutEngine::Table(TableEditor::new(ET_KEYS))),
            Dvorak => (
                Remap::Dvorak,
                LayoutEngine::Table(TableEditor::new(DEFAULT_KEYS)),
            ),
            Carpalx => (
                Remap::Qgmlwy,
                LayoutEngine::Table(TableEditor::new(DEFAULT_KEYS)),
            ),
            Hsu => (Remap::None, LayoutEngine::Hsu(self::Hsu::new())),
            DvorakHsu => (Remap::Dvorak, LayoutEngine::Hsu(self::Hsu::new())),
            Et26 => (Remap::None, LayoutEngine::Et26(self::Et26::new())),
            DachenCp26 => (Remap::None, LayoutEngine::DaChien26(DaChien26::new())),
            HanyuPinyin => (
                Remap::None,
                LayoutEngine::Pinyin(Pinyin::new(PinyinVariant::Hanyu)),
            ),
            ThlPinyin => (
                Remap::None,
                LayoutEngine::Pinyin(Pinyin::new(PinyinVariant::Thl)),
            ),
            Mps2Pinyin => (
                Remap::None,
                LayoutEngine::Pinyin(Pinyin::new(PinyinVariant::Mps2)),
            ),
        };
        PhoneticEditor {
            layout,
            remap,
            engine,
        }
    }

    /// Feed one printable key. Uppercase letters are treated as their
    /// lowercase position.
    pub fn key_press(&mut self, key: u8) -> KeyBehavior {
        let key = self.remap.apply(key.to_ascii_lowercase());
        match &mut self.engine {
            LayoutEngine::Table(e) => e.key_press(key),
            LayoutEngine::Hsu(e) => e.key_press(key),
            LayoutEngine::Et26(e) => e.key_press(key),
            LayoutEngine::DaChien26(e) => e.key_press(key),
            LayoutEngine::Pinyin(e) => e.key_press(key),
        }
    }

    /// The finished syllable. Meaningful immediately after
    /// [`KeyBehavior::Commit`]; the caller drains it and calls
    /// [`PhoneticEditor::remove_all`] before the next composition.
    pub fn syllable(&self) -> Syllable {
        match &self.engine {
            LayoutEngine::Table(e) => e.read(),
            LayoutEngine::Hsu(e) => e.read(),
            LayoutEngine::Et26(e) => e.read(),
            LayoutEngine::DaChien26(e) => e.read(),
            LayoutEngine::Pinyin(e) => e.read(),
        }
    }

    /// The alternative completion, when the layout is ambiguous enough to
    /// produce one. Used to widen the dictionary lookup.
    pub fn alt_syllable(&self) -> Option<Syllable> {
        match &self.engine {
            LayoutEngine::Hsu(e) => e.alt(),
            LayoutEngine::Et26(e) => e.alt(),
            LayoutEngine::Pinyin(e) => e.alt(),
            _ => None,
        }
        .filter(|alt| *alt != self.syllable())
    }

    /// Undo the most recent keystroke: Pinyin layouts pop a letter, Zhuyin
    /// layouts clear the most recently filled slot.
    pub fn remove_last(&mut self) -> Option<Bopomofo> {
        match &mut self.engine {
            LayoutEngine::Table(e) => e.pop(),
            LayoutEngine::Hsu(e) => e.pop(),
            LayoutEngine::Et26(e) => e.pop(),
            LayoutEngine::DaChien26(e) => e.pop(),
            LayoutEngine::Pinyin(e) => e.pop(),
        }
    }

    pub fn remove_all(&mut self) {
        match &mut self.engine {
            LayoutEngine::Table(e) => e.clear(),
            LayoutEngine::Hsu(e) => e.clear(),
            LayoutEngine::Et26(e) => e.clear(),
            LayoutEngine::DaChien26(e) => e.clear(),
            LayoutEngine::Pinyin(e) => e.clear(),
        }
    }

    pub fn is_entering(&self) -> bool {
        match &self.engine {
            LayoutEngine::Table(e) => e.is_entering(),
            LayoutEngine::Hsu(e) => e.is_entering(),
            LayoutEngine::Et26(e) => e.is_entering(),
            LayoutEngine::DaChien26(e) => e.is_entering(),
            LayoutEngine::Pinyin(e) => e.is_entering(),
        }
    }

    pub fn kb_type(&self) -> KeyboardLayout {
        self.layout
    }

    /// The raw letter buffer, for layouts that keep one (Pinyin).
    pub fn key_seq(&self) -> Option<&str> {
        match &self.engine {
            LayoutEngine::Pinyin(e) => Some(e.key_seq()),
            _ => None,
        }
    }

    /// Renders the in-progress state for the preedit display.
    pub fn preedit(&self) -> String {
        if let Some(seq) = self.key_seq() {
            return seq.to_string();
        }
        let syllable = self.syllable();
        let mut out = String::new();
        for bopomofo in [syllable.initial, syllable.medial, syllable.rime] {
            if let Some(b) = bopomofo {
                out.push(b.into());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syl;
    use crate::syllable::Bopomofo::*;

    fn type_all(editor: &mut PhoneticEditor, keys: &str) -> KeyBehavior {
        let mut last = KeyBehavior::Ignore;
        for k in keys.bytes() {
            last = editor.key_press(k);
        }
        last
    }

    #[test]
    fn every_layout_constructs() {
        for id in 0..13 {
            let layout = KeyboardLayout::from_id(id).unwrap();
            let editor = PhoneticEditor::new(layout);
            assert_eq!(layout, editor.kb_type());
            assert!(!editor.is_entering());
        }
    }

    #[test]
    fn dachen_through_facade() {
        let mut editor = PhoneticEditor::new(KeyboardLayout::Default);
        assert_eq!(KeyBehavior::Commit, type_all(&mut editor, "hk4"));
        assert_eq!(syl![C, E, TONE4], editor.syllable());
        assert_eq!(None, editor.alt_syllable());
    }

    #[test]
    fn dvorak_positions_reach_the_dachen_table() {
        // On Dvorak the physical keys that QWERTY labels "su3" (ㄋㄧˇ)
        // produce the characters "og3".
        let mut editor = PhoneticEditor::new(KeyboardLayout::Dvorak);
        assert_eq!(KeyBehavior::Commit, type_all(&mut editor, "og3"));
        assert_eq!(syl![N, I, TONE3], editor.syllable());
    }

    #[test]
    fn carpalx_positions_reach_the_dachen_table() {
        // Carpalx prints 's' on the QWERTY-s key and 'f' on the QWERTY-u key.
        let mut editor = PhoneticEditor::new(KeyboardLayout::Carpalx);
        assert_eq!(KeyBehavior::Commit, type_all(&mut editor, "sf3"));
        assert_eq!(syl![N, I, TONE3], editor.syllable());
    }

    #[test]
    fn dvorak_hsu_composes() {
        // QWERTY Hsu "cen " spells ㄒㄧㄣ; those positions type "j.b " on
        // Dvorak.
        let mut editor = PhoneticEditor::new(KeyboardLayout::DvorakHsu);
        assert_eq!(KeyBehavior::Commit, type_all(&mut editor, "j.b "));
        assert_eq!(syl![X, I, EN, TONE1], editor.syllable());
    }

    #[test]
    fn uppercase_folds_to_lowercase() {
        let mut editor = PhoneticEditor::new(KeyboardLayout::Default);
        assert_eq!(KeyBehavior::Commit, type_all(&mut editor, "HK4"));
        assert_eq!(syl![C, E, TONE4], editor.syllable());
    }

    #[test]
    fn remove_last_then_remove_all() {
        let mut editor = PhoneticEditor::new(KeyboardLayout::Default);
        type_all(&mut editor, "5j");
        assert_eq!(Some(U), editor.remove_last());
        assert!(editor.is_entering());
        editor.remove_all();
        assert!(!editor.is_entering());
    }

    #[test]
    fn pinyin_preedit_shows_letters() {
        let mut editor = PhoneticEditor::new(KeyboardLayout::HanyuPinyin);
        type_all(&mut editor, "zho");
        assert_eq!("zho", editor.preedit());
    }

    #[test]
    fn zhuyin_preedit_shows_symbols() {
        let mut editor = PhoneticEditor::new(KeyboardLayout::Default);
        type_all(&mut editor, "5j");
        assert_eq!("ㄓㄨ", editor.preedit());
    }
}
