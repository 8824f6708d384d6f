//! Dachen CP26: the Dachen table folded onto the letter keys.
//!
//! Keys that carried two symbols on the 41-key board become two-stroke
//! toggles here: pressing the key again swaps to the partner symbol.
//! The ㄧ/ㄚ and ㄩ/ㄡ keys additionally juggle the medial and rime slots so
//! that any of the four combinations can be reached.

use crate::syllable::{Bopomofo, Syllable};

use super::KeyBehavior;

#[derive(Debug, Clone, Default)]
pub struct DaChien26 {
    syllable: Syllable,
}

fn toggled(current: Option<Bopomofo>, default: Bopomofo, alt: Bopomofo) -> Bopomofo {
    if current == Some(default) {
        alt
    } else {
        default
    }
}

impl DaChien26 {
    pub fn new() -> DaChien26 {
        DaChien26::default()
    }

    fn is_end_key(&self, key: u8) -> bool {
        matches!(key, b'e' | b'r' | b'd' | b'y' | b' ') && !self.syllable.is_empty()
    }

    fn has_initial_or_medial(&self) -> bool {
        self.syllable.has_initial() || self.syllable.has_medial()
    }

    pub fn key_press(&mut self, key: u8) -> KeyBehavior {
        if self.is_end_key(key) {
            let tone = match key {
                b'e' => Bopomofo::TONE2,
                b'r' => Bopomofo::TONE3,
                b'd' => Bopomofo::TONE4,
                b'y' => Bopomofo::TONE5,
                _ => Bopomofo::TONE1,
            };
            self.syllable.update(tone);
            return KeyBehavior::Commit;
        }

        let ctx = self.has_initial_or_medial();
        let bopomofo = match key {
            b'q' => toggled(self.syllable.initial, Bopomofo::B, Bopomofo::P),
            b'a' => Bopomofo::M,
            b'z' => Bopomofo::F,
            b'w' => toggled(self.syllable.initial, Bopomofo::D, Bopomofo::T),
            b's' => Bopomofo::N,
            b'x' => Bopomofo::L,
            b'e' => Bopomofo::G,
            b'd' => Bopomofo::K,
            b'c' => Bopomofo::H,
            b'r' => Bopomofo::J,
            b'f' => Bopomofo::Q,
            b'v' => Bopomofo::X,
            b't' => toggled(self.syllable.initial, Bopomofo::ZH, Bopomofo::CH),
            b'g' => Bopomofo::SH,
            b'b' if ctx => Bopomofo::EH,
            b'b' => Bopomofo::R,
            b'y' => Bopomofo::Z,
            b'h' => Bopomofo::C,
            b'n' if ctx => Bopomofo::ENG,
            b'n' => Bopomofo::S,
            b'u' => return self.stroke_i(),
            b'j' => Bopomofo::U,
            b'm' => return self.stroke_iu(),
            b'i' => toggled(self.syllable.rime, Bopomofo::O, Bopomofo::AI),
            b'k' => Bopomofo::E,
            b'o' => toggled(self.syllable.rime, Bopomofo::EI, Bopomofo::AN),
            b'l' => toggled(self.syllable.rime, Bopomofo::AU, Bopomofo::ANG),
            b'p' => toggled(self.syllable.rime, Bopomofo::EN, Bopomofo::ER),
            _ => return KeyBehavior::KeyError,
        };

        self.syllable.update(bopomofo);
        KeyBehavior::Absorb
    }

    /// The ㄧ key cycles ㄧ, ㄚ and ㄧㄚ.
    fn stroke_i(&mut self) -> KeyBehavior {
        match (self.syllable.medial, self.syllable.rime) {
            (Some(Bopomofo::I), Some(Bopomofo::A)) => {
                self.syllable.medial = None;
                self.syllable.rime = None;
            }
            (_, Some(Bopomofo::A)) => {
                self.syllable.medial = Some(Bopomofo::I);
            }
            (Some(Bopomofo::I), _) => {
                self.syllable.medial = None;
                self.syllable.rime = Some(Bopomofo::A);
            }
            (Some(_), _) => {
                self.syllable.rime = Some(Bopomofo::A);
            }
            _ => {
                self.syllable.medial = Some(Bopomofo::I);
            }
        }
        KeyBehavior::Absorb
    }

    /// The ㄩ key swings between ㄩ and ㄡ.
    fn stroke_iu(&mut self) -> KeyBehavior {
        match (self.syllable.medial, self.syllable.rime) {
            (Some(Bopomofo::IU), None) => {
                self.syllable.medial = None;
                self.syllable.rime = Some(Bopomofo::OU);
            }
            (Some(Bopomofo::IU), Some(f)) if f != Bopomofo::OU => {
                self.syllable.medial = None;
                self.syllable.rime = Some(Bopomofo::OU);
            }
            (None, Some(Bopomofo::OU)) => {
                self.syllable.medial = Some(Bopomofo::IU);
                self.syllable.rime = None;
            }
            (Some(f), Some(Bopomofo::OU)) if f != Bopomofo::IU => {
                self.syllable.medial = Some(Bopomofo::IU);
                self.syllable.rime = None;
            }
            (Some(_), _) => {
                self.syllable.rime = Some(Bopomofo::OU);
            }
            _ => {
                self.syllable.medial = Some(Bopomofo::IU);
            }
        }
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
