//! The phrase chooser: segmentation of the syllable buffer into phrases.
//!
//! Given the preedit's syllable run, the chooser partitions it into
//! contiguous spans such that every span matches a phrase from the merged
//! system∪user lookup, maximising — in lexicographic order — fewest
//! intervals, then the sum of log frequencies, then the longest phrase at
//! the right end. Remaining ties fall back to longer phrases at the left
//! end, higher phrase frequency, then lowest position (arena order), making
//! two runs over identical input byte-identical.
//!
//! User selections pin the text covering their span: any candidate phrase
//! whose span contains a selection must reproduce its text as a substring,
//! and no candidate may straddle a selection boundary. Break points forbid
//! phrases from spanning them. A syllable nothing matches degrades to a
//! one-syllable interval showing its bopomofo, so conversion always covers
//! the run.
//!
//! `convert` returns the best segmentation; `convert_next` the n-th ranked
//! alternative (cycled by the session's Tab handling), enumerated lazily
//! over the scored path space.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::PhraseChoiceDirection;
use crate::dictionary::{lookup_merged, Dictionary, Phrase, MAX_PHRASE_LEN};
use crate::syllable::Syllable;
use crate::userdict::UserDict;

/// A chosen phrase covering preedit positions `[start, end)`.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Interval {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Interval {
        Interval {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// The chooser's view of the syllable run under conversion.
#[derive(Debug, Default)]
pub struct ConversionInput<'a> {
    pub syllables: &'a [Syllable],
    /// User-pinned phrase choices.
    pub selections: &'a [Interval],
    /// Positions no phrase may span across.
    pub breaks: &'a [usize],
}

#[derive(Debug, Clone)]
struct Choice {
    start: usize,
    len: usize,
    phrase: Phrase,
}

/// Log-frequency in fixed point so path scores add exactly.
fn log_score(freq: u32) -> i64 {
    (f64::ln(freq.max(1) as f64) * 1_000_000.0) as i64
}

/// Total order on full segmentations; `Greater` means `a` wins.
fn better(a: &[Choice], b: &[Choice]) -> Ordering {
    // fewer intervals first
    match b.len().cmp(&a.len()) {
        Ordering::Equal => (),
        other => return other,
    }
    let score = |path: &[Choice]| -> i64 { path.iter().map(|c| log_score(c.phrase.freq())).sum() };
    match score(a).cmp(&score(b)) {
        Ordering::Equal => (),
        other => return other,
    }
    // longest phrase at the right end
    match (a.last(), b.last()) {
        (Some(x), Some(y)) => match x.len.cmp(&y.len) {
            Ordering::Equal => (),
            other => return other,
        },
        _ => (),
    }
    // left-to-right: longer, then more frequent, then lower position
    for (x, y) in a.iter().zip(b.iter()) {
        match x
            .len
            .cmp(&y.len)
            .then(x.phrase.freq().cmp(&y.phrase.freq()))
            .then(y.phrase.pos().cmp(&x.phrase.pos()))
        {
            Ordering::Equal => (),
            other => return other,
        }
    }
    Ordering::Equal
}

pub struct PhraseChooser<'a> {
    system: &'a dyn Dictionary,
    user: Option<&'a UserDict>,
}

impl<'a> PhraseChooser<'a> {
    pub fn new(system: &'a dyn Dictionary, user: Option<&'a UserDict>) -> PhraseChooser<'a> {
        PhraseChooser { system, user }
    }

    /// The best phrase for `[start, start+len)`, or `None` when a break,
    /// selection boundary, or empty lookup rules the span out.
    fn best_phrase(&self, input: &ConversionInput<'_>, start: usize, len: usize) -> Option<Phrase> {
        let end = start + len;
        if input.breaks.iter().any(|&p| p > start && p < end) {
            return None;
        }
        for selection in input.selections {
            let contained = start <= selection.start && end >= selection.end;
            let disjoint = end <= selection.start || start >= selection.end;
            if !contained && !disjoint {
                return None;
            }
        }

        // a selection covering exactly this span forces its text
        let forced = input
            .selections
            .iter()
            .find(|s| s.start == start && s.end == end);

        let candidates = lookup_merged(self.system, self.user, &input.syllables[start..end]);
        if let Some(selection) = forced {
            let freq = candidates
                .iter()
                .find(|p| p.as_str() == selection.text)
                .map(|p| p.freq())
                .unwrap_or(0);
            return Some(Phrase::with_pos(selection.text.clone(), freq, u32::MAX));
        }

        'next_phrase: for phrase in candidates {
            for selection in input.selections {
                if start <= selection.start && end >= selection.end {
                    let offset = selection.start - start;
                    let substring: String = phrase
                        .as_str()
                        .chars()
                        .skip(offset)
                        .take(selection.len())
                        .collect();
                    if substring != selection.text {
                        continue 'next_phrase;
                    }
                }
            }
            return Some(phrase);
        }
        None
    }

    /// Candidate spans starting (or, for single syllables, falling back)
    /// at each position, longest first.
    fn choices_at(&self, input: &ConversionInput<'_>, start: usize) -> Vec<Choice> {
        let n = input.syllables.len();
        let max_len = MAX_PHRASE_LEN.min(n - start);
        let mut choices = Vec::new();
        for len in (1..=max_len).rev() {
            if let Some(phrase) = self.best_phrase(input, start, len) {
                choices.push(Choice { start, len, phrase });
            }
        }
        if choices.is_empty() {
            // nothing matches: keep the syllable visible as bopomofo
            choices.push(Choice {
                start,
                len: 1,
                phrase: Phrase::with_pos(input.syllables[start].to_string(), 0, u32::MAX),
            });
        }
        choices
    }

    /// Optimal suffix segmentations for every position.
    fn suffix_table(&self, input: &ConversionInput<'_>) -> Vec<Vec<Choice>> {
        let n = input.syllables.len();
        let mut best: Vec<Option<Vec<Choice>>> = vec![None; n + 1];
        best[n] = Some(Vec::new());
        for start in (0..n).rev() {
            let mut winner: Option<Vec<Choice>> = None;
            for choice in self.choices_at(input, start) {
                let Some(suffix) = best[start + choice.len].as_ref() else {
                    continue;
                };
                let mut path = Vec::with_capacity(1 + suffix.len());
                path.push(choice);
                path.extend(suffix.iter().cloned());
                let wins = match &winner {
                    Some(current) => better(&path, current) == Ordering::Greater,
                    None => true,
                };
                if wins {
                    winner = Some(path);
                }
            }
            best[start] = winner;
        }
        // the fallback choice guarantees every suffix has a segmentation
        best.into_iter().map(|p| p.expect("suffix covered")).collect()
    }

    /// The highest-scoring segmentation.
    pub fn convert(&self, input: &ConversionInput<'_>) -> Vec<Interval> {
        if input.syllables.is_empty() {
            return Vec::new();
        }
        let table = self.suffix_table(input);
        to_intervals(&table[0])
    }

    /// The `nth` ranked segmentation, wrapping around when fewer than
    /// `nth + 1` alternatives exist. `convert_next(input, 0)` equals
    /// `convert(input)`.
    pub fn convert_next(&self, input: &ConversionInput<'_>, nth: usize) -> Vec<Interval> {
        if input.syllables.is_empty() {
            return Vec::new();
        }
        let n = input.syllables.len();
        let table = self.suffix_table(input);

        // Best-first enumeration over the path space; a popped complete
        // path is the best remaining because partial entries carry an
        // optimistic bound (prefix + optimal suffix).
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        let mut seq = 0usize;
        let mut bound = table[0].clone();
        heap.push(HeapEntry {
            bound,
            prefix: Vec::new(),
            pos: 0,
            seq,
        });

        let mut emitted: Vec<Vec<Choice>> = Vec::new();
        while let Some(entry) = heap.pop() {
            if entry.pos == n {
                emitted.push(entry.prefix);
                if emitted.len() > nth {
                    break;
                }
                continue;
            }
            for choice in self.choices_at(input, entry.pos) {
                let next_pos = entry.pos + choice.len;
                let mut prefix = entry.prefix.clone();
                prefix.push(choice);
                bound = prefix.clone();
                bound.extend(table[next_pos].iter().cloned());
                seq += 1;
                heap.push(HeapEntry {
                    bound,
                    prefix,
                    pos: next_pos,
                    seq,
                });
            }
        }
        match emitted.get(nth) {
            Some(path) => to_intervals(path),
            None => to_intervals(&emitted[nth % emitted.len()]),
        }
    }

    /// Candidate phrases for the window at `at`: every length whose span
    /// starts (forward) or ends (rearward) there, ordered by descending
    /// frequency, longer first on ties.
    pub fn candidates_at(
        &self,
        input: &ConversionInput<'_>,
        at: usize,
        direction: PhraseChoiceDirection,
    ) -> Vec<(Interval, Phrase)> {
        let n = input.syllables.len();
        if at >= n && direction == PhraseChoiceDirection::Forward {
            return Vec::new();
        }
        let mut out: Vec<(Interval, Phrase)> = Vec::new();
        for len in 1..=MAX_PHRASE_LEN {
            let (start, end) = match direction {
                PhraseChoiceDirection::Forward => (at, at + len),
                PhraseChoiceDirection::Rearward => {
                    if len > at + 1 {
                        break;
                    }
                    (at + 1 - len, at + 1)
                }
            };
            if end > n {
                break;
            }
            if input.breaks.iter().any(|&p| p > start && p < end) {
                continue;
            }
            for phrase in lookup_merged(self.system, self.user, &input.syllables[start..end]) {
                out.push((Interval::new(start, end, phrase.as_str()), phrase));
            }
        }
        out.sort_by(|(ia, a), (ib, b)| {
            b.freq()
                .cmp(&a.freq())
                .then(ib.len().cmp(&ia.len()))
                .then(a.pos().cmp(&b.pos()))
        });
        out
    }
}

fn to_intervals(path: &[Choice]) -> Vec<Interval> {
    path.iter()
        .map(|c| Interval::new(c.start, c.start + c.len, c.phrase.as_str()))
        .collect()
}

struct HeapEntry {
    bound: Vec<Choice>,
    prefix: Vec<Choice>,
    pos: usize,
    seq: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap on the bound; FIFO among equals keeps runs reproducible
        better(&self.bound, &other.bound).then(other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::syl;
    use crate::syllable::Bopomofo::*;

    fn test_dictionary() -> HashMap<Vec<Syllable>, Vec<Phrase>> {
        let mut pos = 0u32;
        let mut phrase = |text: &str, freq: u32| {
            pos += 10;
            Phrase::with_pos(text, freq, pos)
        };
        HashMap::from([
            (vec![syl![G, U, O, TONE2]], vec![phrase("國", 1)]),
            (vec![syl![M, I, EN, TONE2]], vec![phrase("民", 1)]),
            (vec![syl![D, A, TONE4]], vec![phrase("大", 1)]),
            (vec![syl![H, U, EI, TONE4]], vec![phrase("會", 1)]),
            (vec![syl![D, AI, TONE4]], vec![phrase("代", 1)]),
            (vec![syl![B, I, AU, TONE3]], vec![phrase("表", 1)]),
            (
                vec![syl![G, U, O, TONE2], syl![M, I, EN, TONE2]],
                vec![phrase("國民", 200)],
            ),
            (
                vec![syl![D, A, TONE4], syl![H, U, EI, TONE4]],
                vec![phrase("大會", 200)],
            ),
            (
                vec![syl![D, AI, TONE4], syl![B, I, AU, TONE3]],
                vec![phrase("代表", 200), phrase("戴錶", 100)],
            ),
            (vec![syl![X, I, EN, TONE1]], vec![phrase("心", 1)]),
            (
                vec![syl![K, U, TONE4], syl![I, EN, TONE1]],
                vec![phrase("庫音", 300)],
            ),
            (
                vec![
                    syl![X, I, EN, TONE1],
                    syl![K, U, TONE4],
                    syl![I, EN, TONE1],
                ],
                vec![phrase("新酷音", 200)],
            ),
        ])
    }

    fn guo_min_da_hui_dai_biau() -> Vec<Syllable> {
        vec![
            syl![G, U, O, TONE2],
            syl![M, I, EN, TONE2],
            syl![D, A, TONE4],
            syl![H, U, EI, TONE4],
            syl![D, AI, TONE4],
            syl![B, I, AU, TONE3],
        ]
    }

    #[test]
    fn convert_empty_input() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let input = ConversionInput::default();
        assert_eq!(Vec::<Interval>::new(), chooser.convert(&input));
    }

    #[test]
    fn convert_prefers_fewer_longer_intervals() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = guo_min_da_hui_dai_biau();
        let input = ConversionInput {
            syllables: &syllables,
            ..Default::default()
        };
        assert_eq!(
            vec![
                Interval::new(0, 2, "國民"),
                Interval::new(2, 4, "大會"),
                Interval::new(4, 6, "代表"),
            ],
            chooser.convert(&input)
        );
    }

    #[test]
    fn breaks_forbid_spanning_phrases() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = guo_min_da_hui_dai_biau();
        let breaks = [1usize, 5];
        let input = ConversionInput {
            syllables: &syllables,
            breaks: &breaks,
            ..Default::default()
        };
        assert_eq!(
            vec![
                Interval::new(0, 1, "國"),
                Interval::new(1, 2, "民"),
                Interval::new(2, 4, "大會"),
                Interval::new(4, 5, "代"),
                Interval::new(5, 6, "表"),
            ],
            chooser.convert(&input)
        );
    }

    #[test]
    fn selection_pins_the_covering_phrase() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = guo_min_da_hui_dai_biau();
        let selections = [Interval::new(4, 6, "戴錶")];
        let input = ConversionInput {
            syllables: &syllables,
            selections: &selections,
            ..Default::default()
        };
        assert_eq!(
            vec![
                Interval::new(0, 2, "國民"),
                Interval::new(2, 4, "大會"),
                Interval::new(4, 6, "戴錶"),
            ],
            chooser.convert(&input)
        );
    }

    #[test]
    fn selection_as_substring_of_longer_phrase() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = vec![
            syl![X, I, EN, TONE1],
            syl![K, U, TONE4],
            syl![I, EN, TONE1],
        ];
        let selections = [Interval::new(1, 3, "酷音")];
        let input = ConversionInput {
            syllables: &syllables,
            selections: &selections,
            ..Default::default()
        };
        assert_eq!(
            vec![Interval::new(0, 3, "新酷音")],
            chooser.convert(&input)
        );
    }

    #[test]
    fn unmatched_syllable_falls_back_to_bopomofo() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = vec![syl![ZH, U, ENG, TONE1]];
        let input = ConversionInput {
            syllables: &syllables,
            ..Default::default()
        };
        assert_eq!(
            vec![Interval::new(0, 1, "ㄓㄨㄥ")],
            chooser.convert(&input)
        );
    }

    #[test]
    fn convert_is_deterministic() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = guo_min_da_hui_dai_biau();
        let input = ConversionInput {
            syllables: &syllables,
            ..Default::default()
        };
        let first = chooser.convert(&input);
        for _ in 0..10 {
            assert_eq!(first, chooser.convert(&input));
        }
    }

    #[test]
    fn convert_next_cycles_alternatives() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = guo_min_da_hui_dai_biau();
        let input = ConversionInput {
            syllables: &syllables,
            ..Default::default()
        };
        let best = chooser.convert(&input);
        assert_eq!(best, chooser.convert_next(&input, 0));

        let second = chooser.convert_next(&input, 1);
        assert_ne!(best, second);
        // the runner-up still covers the whole run
        assert_eq!(0, second.first().unwrap().start);
        assert_eq!(6, second.last().unwrap().end);

        // 2×2×2 split choices of the three pairs
        assert_eq!(best, chooser.convert_next(&input, 8));
    }

    #[test]
    fn candidates_forward_and_rearward() {
        let dict = test_dictionary();
        let chooser = PhraseChooser::new(&dict, None);
        let syllables = guo_min_da_hui_dai_biau();
        let input = ConversionInput {
            syllables: &syllables,
            ..Default::default()
        };

        let forward = chooser.candidates_at(&input, 4, PhraseChoiceDirection::Forward);
        let texts: Vec<_> = forward.iter().map(|(i, _)| i.text.as_str()).collect();
        assert_eq!(vec!["代表", "戴錶", "代"], texts);

        let rearward = chooser.candidates_at(&input, 3, PhraseChoiceDirection::Rearward);
        let texts: Vec<_> = rearward.iter().map(|(i, _)| i.text.as_str()).collect();
        assert_eq!(vec!["大會", "會"], texts);
    }
}
