//! Dictionaries for looking up phrases by syllable sequence.
//!
//! The system dictionary is a read-only phrase tree over memory-mapped data
//! files ([`TrieDictionary`]); the user phrase store supplies a second,
//! mutable source. [`lookup_merged`] folds both into one candidate list with
//! the ordering the phrase chooser relies on.

use std::collections::HashMap;
use std::fmt;

use crate::syllable::Syllable;
use crate::userdict::UserDict;

pub use trie::{TrieBuilder, TrieDictionary};

mod trie;

/// Longest phrase the engine stores or converts, in characters.
pub const MAX_PHRASE_LEN: usize = 11;

/// Candidate positions at or above this value belong to the user store;
/// everything below is a system arena offset.
pub(crate) const USER_POS_BASE: u32 = 0x0100_0000;

/// A phrase with its frequency and a stable position used to break
/// frequency ties deterministically (arena offset for system phrases,
/// insertion rank beyond [`USER_POS_BASE`] for user phrases).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    text: String,
    freq: u32,
    pos: u32,
}

impl Phrase {
    pub fn new(text: impl Into<String>, freq: u32) -> Phrase {
        Phrase {
            text: text.into(),
            freq,
            pos: 0,
        }
    }

    pub fn with_pos(text: impl Into<String>, freq: u32, pos: u32) -> Phrase {
        Phrase {
            text: text.into(),
            freq,
            pos,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    pub fn pos(&self) -> u32 {
        self.pos
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl From<(&str, u32)> for Phrase {
    fn from((text, freq): (&str, u32)) -> Phrase {
        Phrase::new(text, freq)
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Candidate ordering shared by every lookup path: descending frequency,
/// then ascending position.
pub(crate) fn sort_candidates(phrases: &mut [Phrase]) {
    phrases.sort_by(|a, b| b.freq.cmp(&a.freq).then(a.pos.cmp(&b.pos)));
}

/// Iterator over the phrases matching one lookup.
pub type Phrases<'a> = Box<dyn Iterator<Item = Phrase> + 'a>;

/// Read-only phrase lookup keyed by syllable sequences.
///
/// Implementations return phrases ordered by descending frequency, ties by
/// ascending position. `HashMap<Vec<Syllable>, Vec<Phrase>>` implements the
/// trait for tests.
pub trait Dictionary {
    /// All single-character phrases whose syllable equals `syllable`.
    fn lookup_word(&self, syllable: Syllable) -> Phrases<'_> {
        self.lookup_phrase(&[syllable])
    }

    /// All phrases matching `syllables` exactly.
    fn lookup_phrase(&self, syllables: &[Syllable]) -> Phrases<'_>;
}

impl Dictionary for HashMap<Vec<Syllable>, Vec<Phrase>> {
    fn lookup_phrase(&self, syllables: &[Syllable]) -> Phrases<'_> {
        match self.get(syllables) {
            Some(phrases) => {
                let mut phrases = phrases.clone();
                sort_candidates(&mut phrases);
                Box::new(phrases.into_iter())
            }
            None => Box::new(std::iter::empty()),
        }
    }
}

/// System∪user candidate lookup. On duplicate text the user entry's
/// frequency replaces the system one; otherwise user phrases join the list
/// with positions above [`USER_POS_BASE`].
pub fn lookup_merged(
    system: &dyn Dictionary,
    user: Option<&UserDict>,
    syllables: &[Syllable],
) -> Vec<Phrase> {
    let mut phrases: Vec<Phrase> = system.lookup_phrase(syllables).collect();
    if let Some(user) = user {
        for entry in user.lookup(syllables) {
            match phrases.iter_mut().find(|p| p.text == entry.text) {
                Some(existing) => existing.freq = entry.freq,
                None => phrases.push(entry),
            }
        }
    }
    sort_candidates(&mut phrases);
    phrases
}
