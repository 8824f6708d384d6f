//! Engine configuration.
//!
//! All options a host can set on a session. The struct round-trips through
//! TOML so front ends can persist user preferences next to the user phrase
//! log.

use serde::{Deserialize, Serialize};

use crate::layout::KeyboardLayout;

/// Hard ceiling on the preedit symbol count; `max_chi_symbol_len` is clamped
/// to this regardless of what the host asks for.
pub const MAX_PREEDIT_LEN: usize = 39;

/// Where a freshly learned user phrase is inserted relative to existing
/// candidates with the same syllables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddPhraseDirection {
    #[default]
    Head,
    Tail,
}

/// Which side of the cursor the candidate window collects phrases from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseChoiceDirection {
    /// Phrases starting at the cursor.
    #[default]
    Forward,
    /// Phrases ending at the cursor.
    Rearward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Keyboard layout driving the phonetic editor.
    pub keyboard_layout: KeyboardLayout,

    /// Preedit capacity in symbols, 1..=39. Further phonetic input is
    /// rejected once the buffer is full.
    pub max_chi_symbol_len: usize,

    /// Candidate window page size.
    pub candidates_per_page: usize,

    /// Insertion order when learning a user phrase.
    pub add_phrase_direction: AddPhraseDirection,

    /// Space opens the candidate window instead of entering tone 1.
    pub space_as_selection: bool,

    /// Remap ASCII punctuation to its fullwidth symbol while typing.
    pub easy_symbol_mode: bool,

    /// Emit fullwidth forms for ASCII typed outside phonetic composition.
    pub fullshape_mode: bool,

    /// Candidate search direction relative to the cursor.
    pub phrase_choice_rearward: bool,

    /// Move the cursor past a candidate after it is selected.
    pub auto_shift_cursor: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyboard_layout: KeyboardLayout::Default,
            max_chi_symbol_len: 10,
            candidates_per_page: 10,
            add_phrase_direction: AddPhraseDirection::Head,
            space_as_selection: false,
            easy_symbol_mode: false,
            fullshape_mode: false,
            phrase_choice_rearward: false,
            auto_shift_cursor: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Set the preedit capacity, clamped to 1..=[`MAX_PREEDIT_LEN`].
    pub fn set_max_chi_symbol_len(&mut self, len: usize) {
        self.max_chi_symbol_len = len.clamp(1, MAX_PREEDIT_LEN);
    }

    /// Set the candidate page size; zero is treated as one.
    pub fn set_candidates_per_page(&mut self, n: usize) {
        self.candidates_per_page = n.max(1);
    }

    pub fn phrase_choice_direction(&self) -> PhraseChoiceDirection {
        if self.phrase_choice_rearward {
            PhraseChoiceDirection::Rearward
        } else {
            PhraseChoiceDirection::Forward
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_roundtrip() {
        let mut config = Config::default();
        config.keyboard_layout = KeyboardLayout::Hsu;
        config.space_as_selection = true;
        config.set_max_chi_symbol_len(20);

        let text = config.to_toml_string().unwrap();
        let back = Config::from_toml_str(&text).unwrap();
        assert_eq!(KeyboardLayout::Hsu, back.keyboard_layout);
        assert!(back.space_as_selection);
        assert_eq!(20, back.max_chi_symbol_len);
    }

    #[test]
    fn preedit_len_is_clamped() {
        let mut config = Config::default();
        config.set_max_chi_symbol_len(0);
        assert_eq!(1, config.max_chi_symbol_len);
        config.set_max_chi_symbol_len(1000);
        assert_eq!(MAX_PREEDIT_LEN, config.max_chi_symbol_len);
    }
}
