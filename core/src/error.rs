//! Error types shared across the engine.
//!
//! Only resource loading can fail fatally. Per-keystroke conditions are
//! reported through [`crate::layout::KeyBehavior`] and never unwind session
//! state; user store failures degrade the store to read-only.

use std::io;

use thiserror::Error;

/// Failure while opening or validating the system data files.
///
/// Returned from [`crate::dictionary::TrieDictionary::open`]; fatal to the
/// session being created.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open data file {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed data file: {0}")]
    Corrupt(String),
}

/// Failure in the user phrase store.
///
/// An error during open prevents the store from being attached; an error
/// during a write is logged and flips the store to read-only for the rest of
/// the session.
#[derive(Error, Debug)]
pub enum UserStoreError {
    #[error("user phrase log i/o")]
    Io(#[from] io::Error),
    #[error("user phrase log is locked by another writer")]
    Locked,
    #[error("user phrase log record is malformed at offset {0}")]
    CorruptRecord(u64),
    #[error("store was degraded to read-only")]
    ReadOnly,
}

/// Failure while building dictionary data files.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("phrase {0:?} is empty or longer than {max} characters", max = crate::dictionary::MAX_PHRASE_LEN)]
    PhraseLength(String),
    #[error("phrase {0:?} has {1} characters but {2} syllables")]
    SyllableCount(String, usize, usize),
    #[error("syllable sequence for {0:?} contains an incomplete syllable")]
    IncompleteSyllable(String),
    #[error("frequency {0} does not fit in 24 bits")]
    FrequencyRange(u32),
    #[error("arena offset overflows 24 bits; too many phrases")]
    ArenaOverflow,
    #[error("tree node index overflows 24 bits; too many nodes")]
    NodeOverflow,
    #[error(transparent)]
    Io(#[from] io::Error),
}
