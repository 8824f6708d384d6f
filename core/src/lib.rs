//! zhuyin-core
//!
//! The conversion engine of a Zhuyin (Bopomofo) input method: keystrokes go
//! in on one of thirteen keyboard layouts, converted Chinese text comes out.
//!
//! The pipeline, bottom up:
//!
//! * [`syllable`] — the packed phoneme/syllable representation;
//! * [`layout`] and [`editor`] — per-layout keystroke-to-syllable state
//!   machines behind one phonetic editor;
//! * [`dictionary`] — the memory-mapped phrase tree plus arena, and the
//!   merged system∪user lookup;
//! * [`userdict`] — the append-only user phrase store with frequency aging;
//! * [`preedit`] — the bounded symbol buffer under composition;
//! * [`conversion`] — the dynamic-programming phrase chooser;
//! * [`session`] — the façade a host application drives key by key.
//!
//! Dictionary handles are plain `Arc`s: sessions share one mapped
//! dictionary freely, and there is no process-wide state to initialise or
//! tear down.

pub mod config;
pub mod conversion;
pub mod dictionary;
pub mod editor;
pub mod error;
pub mod layout;
pub mod preedit;
pub mod session;
pub mod symbols;
pub mod syllable;
pub mod userdict;

pub use config::{AddPhraseDirection, Config};
pub use conversion::{ConversionInput, Interval, PhraseChooser};
pub use dictionary::{Dictionary, Phrase, TrieBuilder, TrieDictionary};
pub use editor::PhoneticEditor;
pub use error::{LoadError, UserStoreError};
pub use layout::{KeyBehavior, KeyboardLayout};
pub use session::{KeyEvent, Session};
pub use syllable::{Bopomofo, Syllable};
pub use userdict::UserDict;

/// Utility helpers.
pub mod utils {
    /// Convert ASCII characters to their fullwidth equivalents; non-ASCII
    /// passes through unchanged.
    pub fn to_fullwidth(s: &str) -> String {
        s.chars().map(crate::symbols::fullwidth_char).collect()
    }

    /// Convert fullwidth characters back to ASCII.
    pub fn to_halfwidth(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                '\u{3000}' => ' ',
                '\u{FF01}'..='\u{FF5E}' => {
                    char::from_u32(ch as u32 - 0xFF01 + 0x21).unwrap_or(ch)
                }
                _ => ch,
            })
            .collect()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn fullwidth_roundtrip() {
            let text = "Hello, 世界! 123";
            let wide = to_fullwidth(text);
            assert_eq!("Ｈｅｌｌｏ，\u{3000}世界！\u{3000}１２３", wide);
            assert_eq!(text, to_halfwidth(&wide));
        }
    }
}
