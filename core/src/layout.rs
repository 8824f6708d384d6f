//! Keyboard layouts and keystroke-to-syllable composition.
//!
//! Keyboards sold in Zhuyin-speaking regions print the phonetic symbols next
//! to the Latin letters, but not always in the same arrangement. The engine
//! supports thirteen layouts falling into a handful of *families*:
//!
//! * table layouts — one key, one symbol (Default/Dachen, IBM, Gin-Yieh, ET),
//!   plus the Dvorak and Carpalx variants which are the Default table behind
//!   a positional remap;
//! * Hsu and Dvorak-Hsu — 26-key layouts where several keys change meaning
//!   once an initial or medial is present;
//! * ET26 — the 26-key compression of ET with its own contextual keys;
//! * Dachen-CP26 — the Dachen table folded onto 26 keys with two-stroke
//!   toggles;
//! * Pinyin — Hanyu, THL and MPS2 romanisations typed as ASCII letters and
//!   translated on tone entry.
//!
//! Every family editor exposes the same small contract: feed one ASCII key,
//! observe a [`KeyBehavior`], and read the finished syllable after a
//! [`KeyBehavior::Commit`].

use serde::{Deserialize, Serialize};

pub(crate) mod dc26;
pub(crate) mod et26;
pub(crate) mod hsu;
pub(crate) mod pinyin;
pub(crate) mod table;

/// The supported keyboard layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardLayout {
    /// Dachen, the layout printed on almost every keyboard.
    #[default]
    Default,
    Hsu,
    Ibm,
    GinYieh,
    Et,
    Et26,
    Dvorak,
    DvorakHsu,
    DachenCp26,
    HanyuPinyin,
    ThlPinyin,
    Mps2Pinyin,
    Carpalx,
}

impl KeyboardLayout {
    /// Stable numeric id used by hosts that configure the engine over a
    /// narrow interface.
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn from_id(id: u8) -> Option<KeyboardLayout> {
        use crate::layout::KeyboardLayout::*;
        Some(match id {
            0 => Default,
            1 => Hsu,
            2 => Ibm,
            3 => GinYieh,
            4 => Et,
            5 => Et26,
            6 => Dvorak,
            7 => DvorakHsu,
            8 => DachenCp26,
            9 => HanyuPinyin,
            10 => ThlPinyin,
            11 => Mps2Pinyin,
            12 => Carpalx,
            _ => return None,
        })
    }
}

/// Outcome of feeding one key to a phonetic editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBehavior {
    /// The key is not for us; the host should handle it.
    Ignore,
    /// The key changed the in-progress syllable.
    Absorb,
    /// The key finalised a syllable; drain it before the next key.
    Commit,
    /// The key cannot occupy any slot right now; state unchanged.
    KeyError,
    /// Internal inconsistency; state was reset.
    Error,
    /// The finished syllable has no dictionary entry of its own.
    NoWord,
    /// The key asks for the symbol table instead of phonetic input.
    OpenSymbolTable,
}

/// Translate a key typed on a Dvorak keyboard to the character printed on
/// the same physical key of a QWERTY keyboard.
pub(crate) fn dvorak_to_qwerty(key: u8) -> u8 {
    const QWERTY: &[u8; 35] = b"-=qwertyuiop[]asdfghjkl;'zxcvbnm,./";
    const DVORAK: &[u8; 35] = b"[]',.pyfgcrl/=aoeuidhtns-;qjkxbmwvz";
    match DVORAK.iter().position(|&c| c == key) {
        Some(i) => QWERTY[i],
        None => key,
    }
}

/// Translate a key typed on a Carpalx QGMLWY keyboard to its QWERTY
/// position.
pub(crate) fn qgmlwy_to_qwerty(key: u8) -> u8 {
    const QWERTY: &[u8; 27] = b"qwertyuiopasdfghjkl;zxcvbnm";
    const QGMLWY: &[u8; 27] = b"qgmlwyfub;dstnriaeohzxcvjkp";
    match QGMLWY.iter().position(|&c| c == key) {
        Some(i) => QWERTY[i],
        None => key,
    }
}
