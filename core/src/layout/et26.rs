//! ET26, the 26-key compression of the ET (Eten) layout.

use crate::syllable::{Bopomofo, BopomofoKind, Syllable};

use super::KeyBehavior;

#[derive(Debug, Clone, Default)]
pub struct Et26 {
    syllable: Syllable,
    alt: Option<Syllable>,
}

impl Et26 {
    pub fn new() -> Et26 {
        Et26::default()
    }

    fn is_end_key(&self, key: u8) -> bool {
        matches!(key, b'd' | b'f' | b'j' | b'k' | b' ') && !self.syllable.is_empty()
    }

    fn has_initial_or_medial(&self) -> bool {
        self.syllable.has_initial() || self.syllable.has_medial()
    }

    fn promote_lone_initial(&mut self) {
        if self.syllable.has_medial() || self.syllable.has_rime() {
            return;
        }
        match self.syllable.initial {
            Some(Bopomofo::J) => self.syllable.update(Bopomofo::ZH),
            Some(Bopomofo::X) => self.syllable.update(Bopomofo::SH),
            Some(Bopomofo::P) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::OU);
            }
            Some(Bopomofo::M) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::AN);
            }
            Some(Bopomofo::N) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::EN);
            }
            Some(Bopomofo::T) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::ANG);
            }
            Some(Bopomofo::L) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::ENG);
            }
            Some(Bopomofo::H) => {
                self.syllable.take_initial();
                self.syllable.update(Bopomofo::ER);
            }
            _ => (),
        }
    }

    pub fn key_press(&mut self, key: u8) -> KeyBehavior {
        if self.is_end_key(key) {
            let before = self.syllable;
            self.promote_lone_initial();

            let tone = match key {
                b'f' => Bopomofo::TONE2,
                b'j' => Bopomofo::TONE3,
                b'k' => Bopomofo::TONE4,
                b'd' => Bopomofo::TONE5,
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
            b'a' => Bopomofo::A,
            b'b' => Bopomofo::B,
            b'c' => Bopomofo::X,
            b'd' => Bopomofo::D,
            b'e' => Bopomofo::I,
            b'f' => Bopomofo::F,
            b'g' => Bopomofo::J,
            b'h' if ctx => Bopomofo::ER,
            b'h' => Bopomofo::H,
            b'i' => Bopomofo::AI,
            b'j' => Bopomofo::R,
            b'k' => Bopomofo::K,
            b'l' if ctx => Bopomofo::ENG,
            b'l' => Bopomofo::L,
            b'm' if ctx => Bopomofo::AN,
            b'm' => Bopomofo::M,
            b'n' if ctx => Bopomofo::EN,
            b'n' => Bopomofo::N,
            b'o' => Bopomofo::O,
            b'p' if ctx => Bopomofo::OU,
            b'p' => Bopomofo::P,
            b'q' if ctx => Bopomofo::EI,
            b'q' => Bopomofo::Z,
            b'r' => Bopomofo::E,
            b's' => Bopomofo::S,
            b't' if ctx => Bopomofo::ANG,
            b't' => Bopomofo::T,
            b'u' => Bopomofo::IU,
            b'v' => Bopomofo::G,
            b'w' if ctx => Bopomofo::EH,
            b'w' => Bopomofo::C,
            b'x' => Bopomofo::U,
            b'y' => Bopomofo::CH,
            b'z' => Bopomofo::AU,
            _ => return KeyBehavior::KeyError,
        };

        match bopomofo.kind() {
            BopomofoKind::Medial => {
                if bopomofo == Bopomofo::U {
                    match self.syllable.initial {
                        Some(Bopomofo::J) => self.syllable.update(Bopomofo::ZH),
                        Some(Bopomofo::X) => self.syllable.update(Bopomofo::SH),
                        _ => (),
                    }
                } else if self.syllable.initial == Some(Bopomofo::G) {
                    // ㄍ never stands before ㄧ/ㄩ on this layout; the key
                    // doubles as ㄑ there.
                    self.syllable.update(Bopomofo::Q);
                }
            }
            BopomofoKind::Rime if !self.syllable.has_medial() => {
                match self.syllable.initial {
                    Some(Bopomofo::J) => self.syllable.update(Bopomofo::ZH),
                    Some(Bopomofo::X) => self.syllable.update(Bopomofo::SH),
                    _ => (),
                }
            }
            _ => (),
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
