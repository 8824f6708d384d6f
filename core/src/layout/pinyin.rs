//! Pinyin romanisations typed on a plain Latin keyboard.
//!
//! Letters accumulate in a buffer; the buffer is translated to Zhuyin when a
//! tone key arrives (space or 1 for the first tone, 2..5 for the rest).
//! Several romanisations are ambiguous — "chi" is ㄔ in Hanyu Pinyin but
//! ㄑㄧ in THL — so translation produces a primary and an alternative
//! syllable and the dictionary is consulted for both.

use crate::syllable::{Bopomofo, Syllable};

use super::KeyBehavior;

const MAX_PINYIN_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinyinVariant {
    #[default]
    Hanyu,
    Thl,
    Mps2,
}

#[derive(Debug, Clone, Default)]
pub struct Pinyin {
    variant: PinyinVariant,
    key_seq: String,
    syllable: Syllable,
    alt: Option<Syllable>,
}

impl Pinyin {
    pub fn new(variant: PinyinVariant) -> Pinyin {
        Pinyin {
            variant,
            ..Default::default()
        }
    }

    pub fn key_press(&mut self, key: u8) -> KeyBehavior {
        let tone = match key {
            b' ' | b'1' => Some(Bopomofo::TONE1),
            b'2' => Some(Bopomofo::TONE2),
            b'3' => Some(Bopomofo::TONE3),
            b'4' => Some(Bopomofo::TONE4),
            b'5' => Some(Bopomofo::TONE5),
            _ => None,
        };

        let Some(tone) = tone else {
            if !key.is_ascii_lowercase() {
                return KeyBehavior::KeyError;
            }
            if self.key_seq.len() == MAX_PINYIN_LEN {
                return KeyBehavior::NoWord;
            }
            self.key_seq.push(key as char);
            return KeyBehavior::Absorb;
        };

        if self.key_seq.is_empty() {
            return KeyBehavior::KeyError;
        }

        let variant_table = match self.variant {
            PinyinVariant::Hanyu => HANYU_AMBIGUOUS,
            PinyinVariant::Thl => THL_AMBIGUOUS,
            PinyinVariant::Mps2 => MPS2_AMBIGUOUS,
        };
        for &(pinyin, primary, alt) in variant_table.iter().chain(COMMON_AMBIGUOUS) {
            if pinyin == self.key_seq {
                self.key_seq.clear();
                self.syllable = primary;
                self.syllable.update(tone);
                let mut alt = alt;
                alt.update(tone);
                self.alt = Some(alt);
                return KeyBehavior::Commit;
            }
        }

        let initial_entry = INITIALS
            .iter()
            .find(|(prefix, _)| self.key_seq.starts_with(prefix));
        let final_seq = match initial_entry {
            Some((prefix, _)) => &self.key_seq[prefix.len()..],
            None => self.key_seq.as_str(),
        };
        let final_entry = FINALS.iter().find(|(s, _, _)| *s == final_seq);

        if initial_entry.is_none() && final_entry.is_none() {
            // not a syllable in any table; swallow the garbage
            self.key_seq.clear();
            return KeyBehavior::Absorb;
        }

        let mut initial = initial_entry.map(|&(_, b)| b);
        let mut medial = final_entry.and_then(|&(_, m, _)| m);
        let mut rime = final_entry.and_then(|&(_, _, r)| r);

        // The "i" of zhi/chi/shi/ri/zi/ci/si is not the ㄧ glide.
        if rime == Some(Bopomofo::I) {
            if let Some(
                Bopomofo::ZH
                | Bopomofo::CH
                | Bopomofo::SH
                | Bopomofo::R
                | Bopomofo::Z
                | Bopomofo::C
                | Bopomofo::S,
            ) = initial
            {
                medial = None;
                rime = None;
            }
        }

        // ju/qu/xu spell ㄩ, not ㄨ.
        if let Some(Bopomofo::J | Bopomofo::Q | Bopomofo::X) = initial {
            if medial == Some(Bopomofo::U)
                && matches!(rime, Some(Bopomofo::AN) | Some(Bopomofo::EN) | None)
            {
                medial = Some(Bopomofo::IU);
            }
        }

        // Wade-Giles style s/ch before a glide are the palatals.
        match medial {
            Some(Bopomofo::I) | Some(Bopomofo::IU) => match initial {
                Some(Bopomofo::S) | Some(Bopomofo::SH) => initial = Some(Bopomofo::X),
                Some(Bopomofo::C) | Some(Bopomofo::CH) => initial = Some(Bopomofo::Q),
                _ => (),
            },
            _ => {
                if initial == Some(Bopomofo::J) {
                    initial = Some(Bopomofo::ZH);
                }
            }
        }

        // The labials swallow the ㄨ of -uo/-ung.
        if let Some(Bopomofo::B | Bopomofo::P | Bopomofo::M | Bopomofo::F) = initial {
            if medial == Some(Bopomofo::U)
                && matches!(rime, Some(Bopomofo::ENG) | Some(Bopomofo::O))
            {
                medial = None;
            }
        }

        self.key_seq.clear();
        self.syllable = Syllable {
            initial,
            medial,
            rime,
            tone: Some(tone),
        };
        self.alt = None;
        KeyBehavior::Commit
    }

    pub fn is_entering(&self) -> bool {
        !self.key_seq.is_empty()
    }

    pub fn pop(&mut self) -> Option<Bopomofo> {
        self.key_seq.pop();
        None
    }

    pub fn clear(&mut self) {
        self.key_seq.clear();
        self.syllable.clear();
        self.alt = None;
    }

    pub fn read(&self) -> Syllable {
        self.syllable
    }

    pub fn alt(&self) -> Option<Syllable> {
        self.alt
    }

    pub fn key_seq(&self) -> &str {
        &self.key_seq
    }
}

use crate::syl;
use crate::syllable::Bopomofo::*;

type Ambiguous = (&'static str, Syllable, Syllable);

/// Romanisations with two readings regardless of variant.
const COMMON_AMBIGUOUS: &[Ambiguous] = &[
    // Wade-Giles spellings
    ("tzu", syl![Z], syl![Z, U]),
    ("ssu", syl![S], syl![S, U]),
    ("szu", syl![S], syl![S, U]),
    // bare letters and digraphs
    ("e", syl![E], syl![EH]),
    ("ch", syl![CH], syl![Q]),
    ("sh", syl![SH], syl![X]),
    ("c", syl![C], syl![Q]),
    ("s", syl![S], syl![X]),
    ("nu", syl![N, U], syl![N, IU]),
    ("lu", syl![L, U], syl![L, IU]),
    ("luan", syl![L, U, AN], syl![L, IU, AN]),
    ("niu", syl![N, I, OU], syl![N, IU]),
    ("liu", syl![L, I, OU], syl![L, IU]),
    ("jiu", syl![J, I, OU], syl![J, IU]),
    ("chiu", syl![Q, I, OU], syl![Q, IU]),
    ("shiu", syl![X, I, OU], syl![X, IU]),
    ("ju", syl![J, IU], syl![ZH, U]),
    ("juan", syl![J, IU, AN], syl![ZH, U, AN]),
];

const HANYU_AMBIGUOUS: &[Ambiguous] = &[
    ("chi", syl![CH], syl![Q, I]),
    ("shi", syl![SH], syl![X, I]),
    ("ci", syl![C], syl![Q, I]),
    ("si", syl![S], syl![X, I]),
];

const THL_AMBIGUOUS: &[Ambiguous] = &[
    ("chi", syl![Q, I], syl![CH]),
    ("shi", syl![X, I], syl![SH]),
    ("ci", syl![Q, I], syl![C]),
    ("si", syl![X, I], syl![S]),
];

const MPS2_AMBIGUOUS: &[Ambiguous] = &[
    ("chi", syl![Q, I], syl![CH]),
    ("shi", syl![X, I], syl![SH]),
    ("ci", syl![Q, I], syl![C]),
    ("si", syl![X, I], syl![S]),
    ("niu", syl![N, IU], syl![N, I, OU]),
    ("liu", syl![L, IU], syl![L, I, OU]),
    ("jiu", syl![J, IU], syl![J, I, OU]),
    ("chiu", syl![Q, IU], syl![Q, I, OU]),
    ("shiu", syl![X, IU], syl![X, I, OU]),
    ("ju", syl![ZH, U], syl![J, IU]),
    ("juan", syl![ZH, U, AN], syl![J, IU, AN]),
    ("juen", syl![ZH, U, EN], syl![J, IU, EN]),
    ("tzu", syl![Z, U], syl![Z]),
];

/// Longest-prefix table for the initial consonant.
const INITIALS: &[(&str, Bopomofo)] = &[
    ("tz", Z),
    ("b", B),
    ("p", P),
    ("m", M),
    ("f", F),
    ("d", D),
    ("ts", C),
    ("t", T),
    ("n", N),
    ("l", L),
    ("g", G),
    ("k", K),
    ("hs", X),
    ("h", H),
    ("jh", ZH),
    ("j", J),
    ("q", Q),
    ("x", X),
    ("zh", ZH),
    ("ch", CH),
    ("sh", SH),
    ("r", R),
    ("z", Z),
    ("c", C),
    ("s", S),
];

/// Exact-match table for everything after the initial, covering the Hanyu,
/// THL and MPS2 spellings side by side.
const FINALS: &[(&str, Option<Bopomofo>, Option<Bopomofo>)] = &[
    ("uang", Some(U), Some(ANG)),
    ("wang", Some(U), Some(ANG)),
    ("weng", Some(U), Some(ENG)),
    ("wong", Some(U), Some(ENG)),
    ("ying", Some(I), Some(ENG)),
    ("yung", Some(IU), Some(ENG)),
    ("yong", Some(IU), Some(ENG)),
    ("iung", Some(IU), Some(ENG)),
    ("iong", Some(IU), Some(ENG)),
    ("iang", Some(I), Some(ANG)),
    ("yang", Some(I), Some(ANG)),
    ("yuan", Some(IU), Some(AN)),
    ("iuan", Some(IU), Some(AN)),
    ("ing", Some(I), Some(ENG)),
    ("iao", Some(I), Some(AU)),
    ("iau", Some(I), Some(AU)),
    ("yao", Some(I), Some(AU)),
    ("yau", Some(I), Some(AU)),
    ("yun", Some(IU), Some(EN)),
    ("iun", Some(IU), Some(EN)),
    ("iou", Some(I), Some(OU)),
    ("iu", Some(I), Some(OU)),
    ("you", Some(I), Some(OU)),
    ("io", Some(I), Some(O)),
    ("yo", Some(I), Some(O)),
    ("ian", Some(I), Some(AN)),
    ("ien", Some(I), Some(AN)),
    ("yan", Some(I), Some(AN)),
    ("yen", Some(I), Some(AN)),
    ("yin", Some(I), Some(EN)),
    ("ang", None, Some(ANG)),
    ("eng", None, Some(ENG)),
    ("uei", Some(U), Some(EI)),
    ("ui", Some(U), Some(EI)),
    ("wei", Some(U), Some(EI)),
    ("uen", Some(U), Some(EN)),
    ("yueh", Some(IU), Some(EH)),
    ("yue", Some(IU), Some(EH)),
    ("iue", Some(IU), Some(EH)),
    ("ueh", Some(IU), Some(EH)),
    ("ue", Some(IU), Some(EH)),
    ("ve", Some(IU), Some(EH)),
    ("uai", Some(U), Some(AI)),
    ("wai", Some(U), Some(AI)),
    ("uan", Some(U), Some(AN)),
    ("wan", Some(U), Some(AN)),
    ("un", Some(U), Some(EN)),
    ("wen", Some(U), Some(EN)),
    ("wun", Some(U), Some(EN)),
    ("ung", Some(U), Some(ENG)),
    ("ong", Some(U), Some(ENG)),
    ("van", Some(IU), Some(AN)),
    ("vn", Some(IU), Some(EN)),
    ("er", None, Some(ER)),
    ("ai", None, Some(AI)),
    ("ei", None, Some(EI)),
    ("ao", None, Some(AU)),
    ("au", None, Some(AU)),
    ("ou", None, Some(OU)),
    ("an", None, Some(AN)),
    ("en", None, Some(EN)),
    ("yi", None, Some(I)),
    ("ia", Some(I), Some(A)),
    ("ya", Some(I), Some(A)),
    ("ieh", Some(I), Some(EH)),
    ("ie", Some(I), Some(EH)),
    ("yeh", Some(I), Some(EH)),
    ("ye", Some(I), Some(EH)),
    ("in", Some(I), Some(EN)),
    ("wu", Some(U), None),
    ("ua", Some(U), Some(A)),
    ("wa", Some(U), Some(A)),
    ("uo", Some(U), Some(O)),
    ("wo", Some(U), Some(O)),
    ("yu", Some(IU), None),
    ("ih", None, None),
    ("a", None, Some(A)),
    ("o", None, Some(O)),
    ("eh", None, Some(EH)),
    ("e", None, Some(E)),
    ("v", Some(IU), None),
    ("i", Some(I), None),
    ("u", Some(U), None),
    ("n", None, Some(EN)),
    ("ng", None, Some(ENG)),
    ("r", None, None),
    ("z", None, None),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(variant: PinyinVariant, keys: &str) -> (Syllable, Option<Syllable>) {
        let mut editor = Pinyin::new(variant);
        let mut last = KeyBehavior::Ignore;
        for k in keys.bytes() {
            last = editor.key_press(k);
        }
        assert_eq!(KeyBehavior::Commit, last, "keys {keys:?}");
        (editor.read(), editor.alt())
    }

    #[test]
    fn hanyu_plain_syllables() {
        assert_eq!(syl![N, I, TONE3], commit(PinyinVariant::Hanyu, "ni3").0);
        assert_eq!(syl![H, AU, TONE3], commit(PinyinVariant::Hanyu, "hao3").0);
        assert_eq!(
            syl![ZH, U, ENG, TONE1],
            commit(PinyinVariant::Hanyu, "zhong1").0
        );
        assert_eq!(syl![C, E, TONE4], commit(PinyinVariant::Hanyu, "ce4").0);
    }

    #[test]
    fn space_is_first_tone() {
        assert_eq!(syl![M, A, TONE1], commit(PinyinVariant::Hanyu, "ma ").0);
    }

    #[test]
    fn hanyu_retroflex_i() {
        let (primary, alt) = commit(PinyinVariant::Hanyu, "shi4");
        assert_eq!(syl![SH, TONE4], primary);
        assert_eq!(Some(syl![X, I, TONE4]), alt);
    }

    #[test]
    fn thl_swaps_retroflex_reading() {
        let (primary, alt) = commit(PinyinVariant::Thl, "shi4");
        assert_eq!(syl![X, I, TONE4], primary);
        assert_eq!(Some(syl![SH, TONE4]), alt);
    }

    #[test]
    fn mps2_ju_is_retroflex() {
        let (primary, alt) = commit(PinyinVariant::Mps2, "ju1");
        assert_eq!(syl![ZH, U, TONE1], primary);
        assert_eq!(Some(syl![J, IU, TONE1]), alt);
    }

    #[test]
    fn palatal_u_rules() {
        assert_eq!(
            syl![Q, IU, AN, TONE2],
            commit(PinyinVariant::Hanyu, "quan2").0
        );
        assert_eq!(syl![X, IU, TONE2], commit(PinyinVariant::Hanyu, "xu2").0);
    }

    #[test]
    fn labial_drops_glide() {
        assert_eq!(syl![B, O, TONE1], commit(PinyinVariant::Hanyu, "buo1").0);
        assert_eq!(
            syl![F, ENG, TONE1],
            commit(PinyinVariant::Hanyu, "fung1").0
        );
    }

    #[test]
    fn buffer_is_capped() {
        let mut editor = Pinyin::new(PinyinVariant::Hanyu);
        for _ in 0..MAX_PINYIN_LEN {
            assert_eq!(KeyBehavior::Absorb, editor.key_press(b'a'));
        }
        assert_eq!(KeyBehavior::NoWord, editor.key_press(b'a'));
    }

    #[test]
    fn tone_with_no_letters_is_an_error() {
        let mut editor = Pinyin::new(PinyinVariant::Hanyu);
        assert_eq!(KeyBehavior::KeyError, editor.key_press(b'4'));
    }

    #[test]
    fn pop_removes_letters() {
        let mut editor = Pinyin::new(PinyinVariant::Hanyu);
        editor.key_press(b'n');
        editor.key_press(b'i');
        editor.pop();
        assert_eq!("n", editor.key_seq());
        assert!(editor.is_entering());
    }
}
