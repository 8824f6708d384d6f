//! Hsu's 26-key layout.
//!
//! Hsu packs the full symbol set onto the letter keys by exploiting
//! impossible combinations: `a g h k l m n` produce finals once an initial
//! or medial is present, the palatals ㄐㄑㄒ and retroflexes ㄓㄔㄕ share
//! keys and are disambiguated by the following medial, and the tone marks
//! live on `s d f j` (˙ ˊ ˇ ˋ) plus space for tone 1 — valid as tones only
//! when a syllable is under way.

use crate::syllable::{Bopomofo, BopomofoKind, Syllable};

use super::KeyBehavior;

#[derive(Debug, Clone, Default)]
pub struct Hsu {
    syllable: Syllable,
    alt: Option<Syllable>,
}

impl Hsu {
    pub fn new() -> Hsu {
        Hsu::default()
    }

    fn is_end_key(&self, key: u8) -> bool {
        matches!(key, b's' | b'd' | b'f' | b'j' | b' ') && !self.syllable.is_empty()
    }

    fn has_initial_or_medial(&self) -> bool {
        self.syllable.has_initial() || self.syllable.has_medial()
    }

    /// A lone initial in front of a tone is really a rime (or a retroflex)
    /// on this layout.
    fn promote_lone_initial(&mut self) {
        if self.syllable.has_medial() || self.syllable.has_rime() {
            return;
        }
        match self.syllable.initial {
            Some(Bopomofo::J) => self.syllable.update(Bopomofo::ZH),
            Some(Bopomofo::Q) => self.syllable.update(Bopomofo::CH),
            Some(Bopomofo::X) => self.syllable.update(Bopomofo::SH),
            Some(Bopomofo::H) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::O);
            }
            Some(Bopomofo::G) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::E);
            }
            Some(Bopomofo::M) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::AN);
            }
            Some(Bopomofo::N) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::EN);
            }
            Some(Bopomofo::K) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::ANG);
            }
            Some(Bopomofo::L) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::ER);
            }
            _ => (),
        }
    }

    /// ㄍ cannot precede ㄧ/ㄩ; the key doubles as ㄐ there.
    fn promote_g_before_glide(&mut self) {
        if matches!(self.syllable.initial, Some(Bopomofo::G))
            && matches!(self.syllable.medial, Some(Bopomofo::I) | Some(Bopomofo::IU))
        {
            self.syllable.update(Bopomofo::J);
        }
    }

    pub fn key_press(&mut self, key: u8) -> KeyBehavior {
        if self.is_end_key(key) {
            let before = self.syllable;
            self.promote_lone_initial();
            self.promote_g_before_glide();

            let tone = match key {
                b'd' => Bopomofo::TONE2,
                b'f' => Bopomofo::TONE3,
                b'j' => Bopomofo::TONE4,
                b's' => Bopomofo::TONE5,
                _ => Bopomofo::TONE1,
            };
            self.syllable.update(tone);
            let promoted = {
                let mut s = self.syllable;
                s.take_tone();
                s != before
            };
            self.alt = promoted.then(|| {
                let mut s = before;
                s.update(tone);
                s
            });
            return KeyBehavior::Commit;
        }

        let ctx = self.has_initial_or_medial();
        let bopomofo = match key {
            b'a' if ctx => Bopomofo::EI,
            b'a' => Bopomofo::C,
            b'b' => Bopomofo::B,
            b'c' => Bopomofo::SH,
            b'd' => Bopomofo::D,
            b'e' => Bopomofo::I,
            b'f' => Bopomofo::F,
            b'g' if ctx => Bopomofo::E,
            b'g' => Bopomofo::G,
            b'h' if ctx => Bopomofo::O,
            b'h' => Bopomofo::H,
            b'i' => Bopomofo::AI,
            b'j' => Bopomofo::ZH,
            b'k' if ctx => Bopomofo::ANG,
            b'k' => Bopomofo::K,
            b'l' if ctx => Bopomofo::ENG,
            b'l' => Bopomofo::L,
            b'm' if ctx => Bopomofo::AN,
            b'm' => Bopomofo::M,
            b'n' if ctx => Bopomofo::EN,
            b'n' => Bopomofo::N,
            b'o' => Bopomofo::OU,
            b'p' => Bopomofo::P,
            b'r' => Bopomofo::R,
            b's' => Bopomofo::S,
            b't' => Bopomofo::T,
            b'u' => Bopomofo::IU,
            b'v' => Bopomofo::CH,
            b'w' => Bopomofo::AU,
            b'x' => Bopomofo::U,
            b'y' => Bopomofo::A,
            b'z' => Bopomofo::Z,
            _ => return KeyBehavior::KeyError,
        };

        // ㄐㄑㄒ only stand before ㄧ/ㄩ; ㄓㄔㄕ never do. Flip the initial
        // whenever the incoming symbol settles which family was meant.
        let kind = bopomofo.kind();
        let rime_without_medial = kind == BopomofoKind::Rime && !self.syllable.has_medial();
        if bopomofo == Bopomofo::U || rime_without_medial {
            match self.syllable.initial {
                Some(Bopomofo::J) => self.syllable.update(Bopomofo::ZH),
                Some(Bopomofo::Q) => self.syllable.update(Bopomofo::CH),
                Some(Bopomofo::X) => self.syllable.update(Bopomofo::SH),
                _ => (),
            }
        }
        if bopomofo == Bopomofo::I || bopomofo == Bopomofo::IU {
            match self.syllable.initial {
                Some(Bopomofo::ZH) => self.syllable.update(Bopomofo::J),
                Some(Bopomofo::CH) => self.syllable.update(Bopomofo::Q),
                Some(Bopomofo::SH) => self.syllable.update(Bopomofo::X),
                _ => (),
            }
        }

        self.syllable.update(bopomofo);
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
        self.alt = None;
    }

    pub fn read(&self) -> Syllable {
        self.syllable
    }

    pub fn alt(&self) -> Option<Syllable> {
        self.alt
    }
}
