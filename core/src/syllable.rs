//! Bopomofo symbols and the packed syllable representation.
//!
//! A Mandarin syllable written in Zhuyin Fuhao (Bopomofo) has up to four
//! components: an initial consonant, a medial glide, a rime and a tone. The
//! engine packs the four components into a single `u16` so that syllable
//! sequences can be stored compactly in the phrase tree and the user phrase
//! log, and so that comparing two packed values is the same as comparing the
//! component tuples.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which slot of a syllable a symbol occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BopomofoKind {
    Initial,
    Medial,
    Rime,
    Tone,
}

/// The 37 Zhuyin letters plus the five tones.
///
/// Tone 1 has no printed mark in dictionary sources but is a real tone; the
/// engine always records it explicitly so a toneless value unambiguously
/// means "still being typed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bopomofo {
    /// ㄅ
    B = 0,
    /// ㄆ
    P,
    /// ㄇ
    M,
    /// ㄈ
    F,
    /// ㄉ
    D,
    /// ㄊ
    T,
    /// ㄋ
    N,
    /// ㄌ
    L,
    /// ㄍ
    G,
    /// ㄎ
    K,
    /// ㄏ
    H,
    /// ㄐ
    J,
    /// ㄑ
    Q,
    /// ㄒ
    X,
    /// ㄓ
    ZH,
    /// ㄔ
    CH,
    /// ㄕ
    SH,
    /// ㄖ
    R,
    /// ㄗ
    Z,
    /// ㄘ
    C,
    /// ㄙ
    S,
    /// ㄧ
    I,
    /// ㄨ
    U,
    /// ㄩ
    IU,
    /// ㄚ
    A,
    /// ㄛ
    O,
    /// ㄜ
    E,
    /// ㄝ
    EH,
    /// ㄞ
    AI,
    /// ㄟ
    EI,
    /// ㄠ
    AU,
    /// ㄡ
    OU,
    /// ㄢ
    AN,
    /// ㄣ
    EN,
    /// ㄤ
    ANG,
    /// ㄥ
    ENG,
    /// ㄦ
    ER,
    /// first (level) tone, unmarked in running text
    TONE1,
    /// ˊ
    TONE2,
    /// ˇ
    TONE3,
    /// ˋ
    TONE4,
    /// ˙ neutral tone
    TONE5,
}

impl Bopomofo {
    pub const fn kind(self) -> BopomofoKind {
        match self as u16 {
            0..=20 => BopomofoKind::Initial,
            21..=23 => BopomofoKind::Medial,
            24..=36 => BopomofoKind::Rime,
            _ => BopomofoKind::Tone,
        }
    }

    /// 1-based index within the initial table, or `None` for other kinds.
    pub fn initial_index(self) -> Option<u16> {
        match self.kind() {
            BopomofoKind::Initial => Some(self as u16 + 1),
            _ => None,
        }
    }

    pub fn medial_index(self) -> Option<u16> {
        match self.kind() {
            BopomofoKind::Medial => Some(self as u16 - 20),
            _ => None,
        }
    }

    pub fn rime_index(self) -> Option<u16> {
        match self.kind() {
            BopomofoKind::Rime => Some(self as u16 - 23),
            _ => None,
        }
    }

    pub fn tone_index(self) -> Option<u16> {
        match self.kind() {
            BopomofoKind::Tone => Some(self as u16 - 36),
            _ => None,
        }
    }

    pub fn from_initial(index: u16) -> Option<Bopomofo> {
        (1..=21).contains(&index).then(|| ALL[index as usize - 1])
    }

    pub fn from_medial(index: u16) -> Option<Bopomofo> {
        (1..=3).contains(&index).then(|| ALL[index as usize + 20])
    }

    pub fn from_rime(index: u16) -> Option<Bopomofo> {
        (1..=13).contains(&index).then(|| ALL[index as usize + 23])
    }

    pub fn from_tone(index: u16) -> Option<Bopomofo> {
        (1..=5).contains(&index).then(|| ALL[index as usize + 36])
    }
}

const ALL: [Bopomofo; 42] = {
    use crate::syllable::Bopomofo::*;
    [
        B, P, M, F, D, T, N, L, G, K, H, J, Q, X, ZH, CH, SH, R, Z, C, S, I, U, IU, A, O, E, EH,
        AI, EI, AU, OU, AN, EN, ANG, ENG, ER, TONE1, TONE2, TONE3, TONE4, TONE5,
    ]
};

const GLYPHS: [char; 42] = [
    'ㄅ', 'ㄆ', 'ㄇ', 'ㄈ', 'ㄉ', 'ㄊ', 'ㄋ', 'ㄌ', 'ㄍ', 'ㄎ', 'ㄏ', 'ㄐ', 'ㄑ', 'ㄒ', 'ㄓ',
    'ㄔ', 'ㄕ', 'ㄖ', 'ㄗ', 'ㄘ', 'ㄙ', 'ㄧ', 'ㄨ', 'ㄩ', 'ㄚ', 'ㄛ', 'ㄜ', 'ㄝ', 'ㄞ', 'ㄟ',
    'ㄠ', 'ㄡ', 'ㄢ', 'ㄣ', 'ㄤ', 'ㄥ', 'ㄦ', 'ˉ', 'ˊ', 'ˇ', 'ˋ', '˙',
];

impl From<Bopomofo> for char {
    fn from(b: Bopomofo) -> char {
        GLYPHS[b as usize]
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not a bopomofo symbol")]
pub struct ParseBopomofoError;

impl TryFrom<char> for Bopomofo {
    type Error = ParseBopomofoError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        GLYPHS
            .iter()
            .position(|&g| g == c)
            .map(|i| ALL[i])
            .ok_or(ParseBopomofoError)
    }
}

/// A (possibly partial) syllable: up to one symbol per slot.
///
/// The packed `u16` layout keeps the initial in the most significant
/// position so that ordering packed values is the same as ordering
/// `(initial, medial, rime, tone)` tuples:
///
/// ```text
///  15        9 8   7 6     3 2    0
/// +-----------+-----+-------+------+
/// |  initial  | med | rime  | tone |
/// +-----------+-----+-------+------+
/// ```
///
/// A zero field means the slot is empty; the all-zero value is the empty
/// syllable. A syllable is *complete* once its tone slot is filled — tone
/// entry is what finalises composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Syllable {
    pub initial: Option<Bopomofo>,
    pub medial: Option<Bopomofo>,
    pub rime: Option<Bopomofo>,
    pub tone: Option<Bopomofo>,
}

impl Syllable {
    pub const fn new() -> Syllable {
        Syllable {
            initial: None,
            medial: None,
            rime: None,
            tone: None,
        }
    }

    pub const fn builder() -> SyllableBuilder {
        SyllableBuilder {
            syllable: Syllable::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.initial.is_none() && self.medial.is_none() && self.rime.is_none() && self.tone.is_none()
    }

    pub fn has_initial(&self) -> bool {
        self.initial.is_some()
    }

    pub fn has_medial(&self) -> bool {
        self.medial.is_some()
    }

    pub fn has_rime(&self) -> bool {
        self.rime.is_some()
    }

    pub fn has_tone(&self) -> bool {
        self.tone.is_some()
    }

    /// Complete syllables carry a tone; anything toneless is still owned by
    /// the phonetic editor.
    pub fn is_complete(&self) -> bool {
        self.has_tone() && !self.is_empty()
    }

    /// Pack into the `u16` wire representation. The empty syllable packs
    /// to zero.
    pub fn to_u16(&self) -> u16 {
        let initial = self.initial.and_then(Bopomofo::initial_index).unwrap_or(0);
        let medial = self.medial.and_then(Bopomofo::medial_index).unwrap_or(0);
        let rime = self.rime.and_then(Bopomofo::rime_index).unwrap_or(0);
        let tone = self.tone.and_then(Bopomofo::tone_index).unwrap_or(0);
        (initial << 9) | (medial << 7) | (rime << 3) | tone
    }

    /// Place a symbol in the slot selected by its kind, replacing whatever
    /// was there.
    pub fn update(&mut self, bopomofo: Bopomofo) {
        match bopomofo.kind() {
            BopomofoKind::Initial => self.initial = Some(bopomofo),
            BopomofoKind::Medial => self.medial = Some(bopomofo),
            BopomofoKind::Rime => self.rime = Some(bopomofo),
            BopomofoKind::Tone => self.tone = Some(bopomofo),
        }
    }

    /// Remove and return the most recently meaningful slot, in
    /// tone, rime, medial, initial order.
    pub fn pop(&mut self) -> Option<Bopomofo> {
        for slot in [
            &mut self.tone,
            &mut self.rime,
            &mut self.medial,
            &mut self.initial,
        ] {
            if slot.is_some() {
                return slot.take();
            }
        }
        None
    }

    pub fn take_initial(&mut self) -> Option<Bopomofo> {
        self.initial.take()
    }

    pub fn take_tone(&mut self) -> Option<Bopomofo> {
        self.tone.take()
    }

    pub fn clear(&mut self) {
        *self = Syllable::new();
    }
}

impl PartialOrd for Syllable {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Syllable {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_u16().cmp(&other.to_u16())
    }
}

impl From<Syllable> for u16 {
    fn from(syl: Syllable) -> u16 {
        syl.to_u16()
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("value {0:#06x} does not encode a syllable")]
pub struct DecodeSyllableError(pub u16);

impl TryFrom<u16> for Syllable {
    type Error = DecodeSyllableError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let initial = value >> 9;
        let medial = (value >> 7) & 0b11;
        let rime = (value >> 3) & 0b1111;
        let tone = value & 0b111;
        let slot = |idx: u16, table: fn(u16) -> Option<Bopomofo>| {
            if idx == 0 {
                Ok(None)
            } else {
                table(idx).map(Some).ok_or(DecodeSyllableError(value))
            }
        };
        Ok(Syllable {
            initial: slot(initial, Bopomofo::from_initial)?,
            medial: slot(medial, Bopomofo::from_medial)?,
            rime: slot(rime, Bopomofo::from_rime)?,
            tone: slot(tone, Bopomofo::from_tone)?,
        })
    }
}

impl fmt::Display for Syllable {
    /// Renders in dictionary-source notation: the tone-1 mark is omitted,
    /// other tones trail the letters.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bopomofo in [self.initial, self.medial, self.rime] {
            if let Some(b) = bopomofo {
                f.write_char(b.into())?;
            }
        }
        match self.tone {
            Some(Bopomofo::TONE1) | None => Ok(()),
            Some(t) => f.write_char(t.into()),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSyllableError {
    #[error("empty syllable")]
    Empty,
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(char),
}

impl FromStr for Syllable {
    type Err = ParseSyllableError;

    /// Parses dictionary-source notation; a missing tone mark means tone 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut syllable = Syllable::new();
        for c in s.chars() {
            let b = Bopomofo::try_from(c).map_err(|_| ParseSyllableError::UnknownSymbol(c))?;
            syllable.update(b);
        }
        if syllable.is_empty() {
            return Err(ParseSyllableError::Empty);
        }
        if syllable.tone.is_none() {
            syllable.tone = Some(Bopomofo::TONE1);
        }
        Ok(syllable)
    }
}

pub struct SyllableBuilder {
    syllable: Syllable,
}

impl SyllableBuilder {
    pub const fn insert(mut self, bopomofo: Bopomofo) -> SyllableBuilder {
        match bopomofo.kind() {
            BopomofoKind::Initial => {
                if self.syllable.initial.is_some() {
                    panic!("initial already set");
                }
                self.syllable.initial = Some(bopomofo);
            }
            BopomofoKind::Medial => {
                if self.syllable.medial.is_some() {
                    panic!("medial already set");
                }
                self.syllable.medial = Some(bopomofo);
            }
            BopomofoKind::Rime => {
                if self.syllable.rime.is_some() {
                    panic!("rime already set");
                }
                self.syllable.rime = Some(bopomofo);
            }
            BopomofoKind::Tone => {
                if self.syllable.tone.is_some() {
                    panic!("tone already set");
                }
                self.syllable.tone = Some(bopomofo);
            }
        }
        self
    }

    pub const fn build(self) -> Syllable {
        self.syllable
    }
}

/// Builds a [`Syllable`] from bopomofo symbols, usable in const context.
///
/// ```
/// use zhuyin_core::syl;
/// use zhuyin_core::syllable::{Bopomofo, Syllable};
///
/// const CE: Syllable = syl![Bopomofo::C, Bopomofo::E, Bopomofo::TONE4];
/// assert!(CE.is_complete());
/// ```
#[macro_export]
macro_rules! syl {
    () => { $crate::syllable::Syllable::new() };
    ($($bopomofo:expr),+ $(,)?) => {{
        let mut builder = $crate::syllable::Syllable::builder();
        $(builder = builder.insert($bopomofo);)+
        builder.build()
    }};
}

#[cfg(test)]
mod tests {
    use super::Bopomofo::*;
    use super::*;

    #[test]
    fn packing_layout_matches_slot_indexes() {
        assert_eq!(0x2A00, syl![S].to_u16());
        assert_eq!(0x0A00, syl![D].to_u16());
        assert_eq!(0x0800, syl![F].to_u16());
        // ㄘㄜˋ = initial 20, rime 3, tone 4
        assert_eq!((20 << 9) | (3 << 3) | 4, syl![C, E, TONE4].to_u16());
    }

    #[test]
    fn empty_packs_to_zero() {
        assert_eq!(0, Syllable::new().to_u16());
    }

    #[test]
    fn roundtrip_through_u16() {
        for syllable in [
            syl![C, E, TONE4],
            syl![N, I, TONE3],
            syl![H, AU, TONE3],
            syl![ZH, U, ENG, TONE1],
            syl![ER, TONE2],
            syl![S],
        ] {
            assert_eq!(Ok(syllable), Syllable::try_from(syllable.to_u16()));
        }
    }

    #[test]
    fn packed_order_is_component_order() {
        let a = syl![B, A, TONE1];
        let b = syl![B, I, A, TONE1];
        let c = syl![P, TONE1];
        assert!(a.to_u16() < b.to_u16());
        assert!(b.to_u16() < c.to_u16());
        assert!(a < b && b < c);
    }

    #[test]
    fn update_replaces_by_kind() {
        let mut syllable = Syllable::new();
        syllable.update(N);
        syllable.update(I);
        syllable.update(TONE3);
        assert_eq!(syl![N, I, TONE3], syllable);
        syllable.update(L);
        assert_eq!(syl![L, I, TONE3], syllable);
    }

    #[test]
    fn pop_unwinds_in_reverse_slot_order() {
        let mut syllable = syl![X, I, EN, TONE4];
        assert_eq!(Some(TONE4), syllable.pop());
        assert_eq!(Some(EN), syllable.pop());
        assert_eq!(Some(I), syllable.pop());
        assert_eq!(Some(X), syllable.pop());
        assert_eq!(None, syllable.pop());
    }

    #[test]
    fn display_and_parse_are_inverse() {
        let syllable = syl![C, E, TONE4];
        assert_eq!("ㄘㄜˋ", syllable.to_string());
        assert_eq!(Ok(syllable), "ㄘㄜˋ".parse());

        // tone 1 is implicit in text
        let syllable = syl![ZH, U, ENG, TONE1];
        assert_eq!("ㄓㄨㄥ", syllable.to_string());
        assert_eq!(Ok(syllable), "ㄓㄨㄥ".parse());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            Err(ParseSyllableError::UnknownSymbol('x')),
            "x".parse::<Syllable>()
        );
        assert_eq!(Err(ParseSyllableError::Empty), "".parse::<Syllable>());
    }
}
