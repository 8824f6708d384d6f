//! The input session: one user's composing state behind a key-event API.
//!
//! A session owns a phonetic editor, the preedit symbol buffer, the active
//! segmentation, pinned selections, and a handle to the user phrase store;
//! the system dictionary is shared behind an `Arc`. The host delivers
//! [`KeyEvent`]s and reads back the preedit string, the candidate window
//! and the commit stream after each one.
//!
//! States: *entering* (the default), *selecting* (candidate window open)
//! and *bypass* (keys pass through untouched). Enter commits the converted
//! buffer front to back and feeds the user store; Tab cycles through
//! alternative segmentations; Down opens the candidate window at the
//! cursor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, PhraseChoiceDirection, MAX_PREEDIT_LEN};
use crate::conversion::{ConversionInput, Interval, PhraseChooser};
use crate::dictionary::{lookup_merged, Dictionary};
use crate::editor::PhoneticEditor;
use crate::layout::{KeyBehavior, KeyboardLayout};
use crate::preedit::{GlyphOrigin, PreeditBuffer, Symbol};
use crate::symbols::{easy_symbol, fullwidth_char};
use crate::syllable::Syllable;
use crate::userdict::UserDict;

/// Key events a host can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Space,
    Enter,
    Esc,
    Tab,
    Backspace,
    Delete,
    Down,
    Up,
    Left,
    Right,
    CapsLock,
}

#[derive(Debug)]
enum State {
    Entering,
    Selecting(Selecting),
    Bypass,
}

#[derive(Debug)]
struct Selecting {
    /// Candidate spans in conversion-index space, ordered for display.
    candidates: Vec<Interval>,
    page: usize,
}

pub struct Session {
    config: Config,
    editor: PhoneticEditor,
    preedit: PreeditBuffer,
    dict: Arc<dyn Dictionary>,
    user: UserDict,
    state: State,

    /// Pinned phrase choices, in preedit buffer positions.
    selections: Vec<Interval>,
    /// Tab cycling offset into the ranked segmentations.
    cycle: usize,
    /// Accumulated committed text; drained by the host.
    commit: String,

    // conversion view, refreshed by `reconvert`
    positions: Vec<usize>,
    conv_syllables: Vec<Syllable>,
    conv_selections: Vec<Interval>,
    conv_breaks: Vec<usize>,
    intervals: Vec<Interval>,
}

impl Session {
    pub fn new(dict: Arc<dyn Dictionary>, user: UserDict, config: Config) -> Session {
        let mut session = Session {
            editor: PhoneticEditor::new(config.keyboard_layout),
            preedit: PreeditBuffer::new(config.max_chi_symbol_len.clamp(1, MAX_PREEDIT_LEN)),
            dict,
            user,
            state: State::Entering,
            selections: Vec::new(),
            cycle: 0,
            commit: String::new(),
            positions: Vec::new(),
            conv_syllables: Vec::new(),
            conv_selections: Vec::new(),
            conv_breaks: Vec::new(),
            intervals: Vec::new(),
            config,
        };
        session.reconvert();
        session
    }

    // ----- host-facing accessors -----

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration, rebuilding the phonetic editor when the
    /// layout changed.
    pub fn set_config(&mut self, config: Config) {
        if config.keyboard_layout != self.editor.kb_type() {
            self.editor = PhoneticEditor::new(config.keyboard_layout);
        }
        self.preedit
            .set_max_len(config.max_chi_symbol_len.clamp(1, MAX_PREEDIT_LEN));
        self.config = config;
    }

    pub fn kb_type(&self) -> KeyboardLayout {
        self.editor.kb_type()
    }

    /// The composed display string, with any in-progress syllable shown at
    /// the cursor.
    pub fn preedit(&self) -> String {
        self.render().0
    }

    /// Cursor offset into [`Session::preedit`], in characters.
    pub fn cursor(&self) -> usize {
        self.render().1
    }

    /// Committed text accumulated so far.
    pub fn commit_text(&self) -> &str {
        &self.commit
    }

    /// Drain the commit stream.
    pub fn take_commit(&mut self) -> String {
        std::mem::take(&mut self.commit)
    }

    /// The current candidate page, when the window is open.
    pub fn candidates(&self) -> Vec<String> {
        match &self.state {
            State::Selecting(sel) => {
                let per = self.config.candidates_per_page.max(1);
                sel.candidates
                    .iter()
                    .skip(sel.page * per)
                    .take(per)
                    .map(|c| c.text.clone())
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, State::Selecting(_))
    }

    pub fn is_entering(&self) -> bool {
        self.editor.is_entering() || !self.preedit.is_empty()
    }

    /// The active segmentation, in preedit buffer spans.
    pub fn intervals(&self) -> Vec<Interval> {
        self.intervals
            .iter()
            .map(|iv| {
                Interval::new(
                    self.positions[iv.start],
                    self.positions[iv.end - 1] + 1,
                    iv.text.clone(),
                )
            })
            .collect()
    }

    pub fn user_dict(&self) -> &UserDict {
        &self.user
    }

    /// Flush the user phrase store.
    pub fn sync(&mut self) {
        self.user.sync();
    }

    // ----- key handling -----

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyBehavior {
        let key = match key {
            KeyEvent::Char(' ') => KeyEvent::Space,
            other => other,
        };

        if matches!(self.state, State::Bypass) {
            return match key {
                KeyEvent::CapsLock => {
                    self.state = State::Entering;
                    KeyBehavior::Absorb
                }
                _ => KeyBehavior::Ignore,
            };
        }

        if matches!(self.state, State::Selecting(_)) {
            return self.handle_selecting_key(key);
        }

        match key {
            KeyEvent::Char(c) => self.handle_char(c),
            KeyEvent::Space => self.handle_space(),
            KeyEvent::Enter => self.commit_all(),
            KeyEvent::Esc => {
                if self.editor.is_entering() {
                    self.editor.remove_all();
                    KeyBehavior::Absorb
                } else {
                    KeyBehavior::Ignore
                }
            }
            KeyEvent::Tab => {
                if self.editor.is_entering() || self.preedit.is_empty() {
                    KeyBehavior::KeyError
                } else {
                    self.cycle += 1;
                    self.reconvert();
                    KeyBehavior::Absorb
                }
            }
            KeyEvent::Backspace => {
                if self.editor.is_entering() {
                    self.editor.remove_last();
                    return KeyBehavior::Absorb;
                }
                if self.preedit.cursor() == 0 {
                    return KeyBehavior::Ignore;
                }
                let at = self.preedit.cursor() - 1;
                self.preedit.delete_before();
                self.adjust_selections_for_delete(at);
                self.cycle = 0;
                self.reconvert();
                KeyBehavior::Absorb
            }
            KeyEvent::Delete => {
                if self.editor.is_entering() {
                    return KeyBehavior::KeyError;
                }
                if self.preedit.cursor() >= self.preedit.len() {
                    return KeyBehavior::Ignore;
                }
                let at = self.preedit.cursor();
                self.preedit.delete_after();
                self.adjust_selections_for_delete(at);
                self.cycle = 0;
                self.reconvert();
                KeyBehavior::Absorb
            }
            KeyEvent::Down => self.open_candidates(),
            KeyEvent::Up => KeyBehavior::Ignore,
            KeyEvent::Left => {
                if self.editor.is_entering() {
                    KeyBehavior::Ignore
                } else if self.preedit.move_left() {
                    KeyBehavior::Absorb
                } else {
                    KeyBehavior::Ignore
                }
            }
            KeyEvent::Right => {
                if self.editor.is_entering() {
                    KeyBehavior::Ignore
                } else if self.preedit.move_right() {
                    KeyBehavior::Absorb
                } else {
                    KeyBehavior::Ignore
                }
            }
            KeyEvent::CapsLock => {
                self.editor.remove_all();
                self.state = State::Bypass;
                KeyBehavior::Absorb
            }
        }
    }

    fn handle_char(&mut self, c: char) -> KeyBehavior {
        if c == '`' && !self.editor.is_entering() {
            return KeyBehavior::OpenSymbolTable;
        }
        if self.config.easy_symbol_mode && !self.editor.is_entering() {
            if let Some(symbol) = easy_symbol(c) {
                return self.push_glyph(symbol, GlyphOrigin::Typed);
            }
        }
        self.feed_phonetic(c)
    }

    fn handle_space(&mut self) -> KeyBehavior {
        if self.config.space_as_selection && !self.editor.is_entering() && !self.preedit.is_empty()
        {
            return self.open_candidates();
        }
        self.feed_phonetic(' ')
    }

    fn handle_selecting_key(&mut self, key: KeyEvent) -> KeyBehavior {
        match key {
            KeyEvent::Char(c) if c.is_ascii_digit() && c != '0' => {
                let idx = (c as u8 - b'1') as usize;
                self.select_on_page(idx)
            }
            KeyEvent::Esc | KeyEvent::Backspace => {
                self.state = State::Entering;
                KeyBehavior::Absorb
            }
            KeyEvent::Down | KeyEvent::Right | KeyEvent::Space => self.turn_page(1),
            KeyEvent::Up | KeyEvent::Left => self.turn_page(-1),
            _ => KeyBehavior::KeyError,
        }
    }

    fn turn_page(&mut self, delta: i32) -> KeyBehavior {
        let per = self.config.candidates_per_page.max(1);
        let State::Selecting(sel) = &mut self.state else {
            return KeyBehavior::Error;
        };
        let pages = sel.candidates.len().div_ceil(per);
        let page = sel.page as i32 + delta;
        sel.page = page.rem_euclid(pages as i32) as usize;
        KeyBehavior::Absorb
    }

    fn select_on_page(&mut self, idx: usize) -> KeyBehavior {
        let per = self.config.candidates_per_page.max(1);
        let State::Selecting(sel) = &self.state else {
            return KeyBehavior::Error;
        };
        if idx >= per {
            return KeyBehavior::KeyError;
        }
        let Some(chosen) = sel.candidates.get(sel.page * per + idx).cloned() else {
            return KeyBehavior::KeyError;
        };

        let buf_start = self.positions[chosen.start];
        let buf_end = self.positions[chosen.end - 1] + 1;
        self.selections
            .retain(|s| s.end <= buf_start || s.start >= buf_end);
        self.selections
            .push(Interval::new(buf_start, buf_end, chosen.text));
        if self.config.auto_shift_cursor {
            self.preedit.set_cursor(buf_end);
        }
        self.cycle = 0;
        self.state = State::Entering;
        self.reconvert();
        KeyBehavior::Absorb
    }

    fn open_candidates(&mut self) -> KeyBehavior {
        if self.editor.is_entering() || self.preedit.is_empty() {
            return KeyBehavior::KeyError;
        }
        self.rebuild_view();
        if self.positions.is_empty() {
            return KeyBehavior::KeyError;
        }
        let cursor = self.preedit.cursor();
        let at = match self.config.phrase_choice_direction() {
            PhraseChoiceDirection::Forward => self
                .positions
                .iter()
                .position(|&p| p >= cursor)
                .unwrap_or(self.positions.len() - 1),
            PhraseChoiceDirection::Rearward => self
                .positions
                .iter()
                .rposition(|&p| p < cursor)
                .unwrap_or(0),
        };

        let chooser = PhraseChooser::new(self.dict.as_ref(), Some(&self.user));
        let input = ConversionInput {
            syllables: &self.conv_syllables,
            selections: &[],
            breaks: &self.conv_breaks,
        };
        let candidates: Vec<Interval> = chooser
            .candidates_at(&input, at, self.config.phrase_choice_direction())
            .into_iter()
            .map(|(span, _)| span)
            .collect();
        if candidates.is_empty() {
            return KeyBehavior::KeyError;
        }
        self.state = State::Selecting(Selecting {
            candidates,
            page: 0,
        });
        KeyBehavior::Absorb
    }

    fn feed_phonetic(&mut self, c: char) -> KeyBehavior {
        if !c.is_ascii() {
            return KeyBehavior::Ignore;
        }
        let was_entering = self.editor.is_entering();
        match self.editor.key_press(c as u8) {
            KeyBehavior::Commit => {
                if self.preedit.is_full() {
                    self.editor.remove_all();
                    return KeyBehavior::KeyError;
                }
                let mut syllable = self.editor.syllable();
                let alt = self.editor.alt_syllable();
                self.editor.remove_all();

                let mut no_word = !self.has_word(syllable);
                if no_word {
                    // the alternative completion may be the real reading
                    if let Some(alt) = alt {
                        if self.has_word(alt) {
                            syllable = alt;
                            no_word = false;
                        }
                    }
                }

                let at = self.preedit.cursor();
                self.adjust_selections_for_insert(at);
                self.preedit.insert(Symbol::Phone(syllable));
                self.cycle = 0;
                self.reconvert();
                if no_word {
                    KeyBehavior::NoWord
                } else {
                    KeyBehavior::Commit
                }
            }
            KeyBehavior::KeyError if !was_entering => self.symbol_fallback(c),
            other => other,
        }
    }

    fn has_word(&self, syllable: Syllable) -> bool {
        self.dict.lookup_word(syllable).next().is_some()
            || !self.user.lookup(&[syllable]).is_empty()
    }

    fn symbol_fallback(&mut self, c: char) -> KeyBehavior {
        if self.config.fullshape_mode && !c.is_control() {
            return self.push_glyph(fullwidth_char(c), GlyphOrigin::Fullwidth);
        }
        KeyBehavior::KeyError
    }

    fn push_glyph(&mut self, ch: char, origin: GlyphOrigin) -> KeyBehavior {
        if self.preedit.is_full() {
            return KeyBehavior::KeyError;
        }
        let at = self.preedit.cursor();
        self.adjust_selections_for_insert(at);
        self.preedit.insert(Symbol::Glyph { ch, origin });
        self.cycle = 0;
        self.reconvert();
        KeyBehavior::Absorb
    }

    /// Commits the whole converted buffer, feeding the user store, and
    /// clears composing state.
    fn commit_all(&mut self) -> KeyBehavior {
        if self.editor.is_entering() {
            return KeyBehavior::KeyError;
        }
        if self.preedit.is_empty() {
            return KeyBehavior::Ignore;
        }
        let (text, _) = self.render();

        // every user pin is learned, whether or not a longer phrase ended
        // up covering it
        for pin in &self.conv_selections {
            let syllables = &self.conv_syllables[pin.start..pin.end];
            if self.user.contains(syllables, &pin.text) {
                self.user.bump_frequency(syllables, &pin.text);
            } else {
                let candidates = lookup_merged(self.dict.as_ref(), None, syllables);
                let orig = candidates
                    .iter()
                    .find(|p| p.as_str() == pin.text)
                    .map(|p| p.freq())
                    .unwrap_or(1);
                let max = candidates.iter().map(|p| p.freq()).max().unwrap_or(orig);
                self.user.add_with_origin(
                    syllables,
                    &pin.text,
                    orig,
                    max,
                    self.config.add_phrase_direction,
                );
            }
        }
        // chosen phrases the user had learned before keep aging
        for iv in &self.intervals {
            let covered_by_pin = self
                .conv_selections
                .iter()
                .any(|s| s.start == iv.start && s.end == iv.end && s.text == iv.text);
            let syllables = &self.conv_syllables[iv.start..iv.end];
            if !covered_by_pin && self.user.contains(syllables, &iv.text) {
                self.user.bump_frequency(syllables, &iv.text);
            }
        }

        self.commit.push_str(&text);
        self.preedit.clear();
        self.selections.clear();
        self.cycle = 0;
        self.reconvert();
        KeyBehavior::Commit
    }

    // ----- conversion plumbing -----

    fn adjust_selections_for_insert(&mut self, at: usize) {
        self.selections.retain(|s| !(s.start < at && at < s.end));
        for s in &mut self.selections {
            if s.start >= at {
                s.start += 1;
                s.end += 1;
            }
        }
    }

    fn adjust_selections_for_delete(&mut self, at: usize) {
        self.selections.retain(|s| at < s.start || at >= s.end);
        for s in &mut self.selections {
            if s.start > at {
                s.start -= 1;
                s.end -= 1;
            }
        }
    }

    /// Refreshes the conversion-index view of the buffer: syllable list,
    /// positions, translated selections, and breaks at glyph gaps.
    fn rebuild_view(&mut self) {
        let entries = self.preedit.syllables();
        self.positions = entries.iter().map(|(p, _)| *p).collect();
        self.conv_syllables = entries.into_iter().map(|(_, s)| s).collect();

        self.conv_breaks.clear();
        for k in 1..self.positions.len() {
            if self.positions[k] != self.positions[k - 1] + 1 {
                self.conv_breaks.push(k);
            }
        }

        self.conv_selections.clear();
        for sel in &self.selections {
            let Some(start) = self.positions.iter().position(|&p| p == sel.start) else {
                continue;
            };
            let len = sel.end - sel.start;
            let contiguous = start + len <= self.positions.len()
                && (0..len).all(|k| self.positions[start + k] == sel.start + k);
            if contiguous {
                self.conv_selections
                    .push(Interval::new(start, start + len, sel.text.clone()));
            }
        }
    }

    fn reconvert(&mut self) {
        self.rebuild_view();
        let chooser = PhraseChooser::new(self.dict.as_ref(), Some(&self.user));
        let input = ConversionInput {
            syllables: &self.conv_syllables,
            selections: &self.conv_selections,
            breaks: &self.conv_breaks,
        };
        let intervals = if self.cycle == 0 {
            chooser.convert(&input)
        } else {
            chooser.convert_next(&input, self.cycle)
        };
        self.intervals = intervals;
    }

    /// Builds the display string and cursor offset: converted interval
    /// texts overlaying the syllable spans, glyphs verbatim, and the
    /// in-progress syllable inlined at the cursor.
    fn render(&self) -> (String, usize) {
        let mut span_at: HashMap<usize, (usize, &str)> = HashMap::new();
        for iv in &self.intervals {
            let start = self.positions[iv.start];
            let end = self.positions[iv.end - 1] + 1;
            span_at.insert(start, (end, iv.text.as_str()));
        }

        let symbols = self.preedit.symbols();
        let cursor = self.preedit.cursor();
        let mut pending = self
            .editor
            .is_entering()
            .then(|| self.editor.preedit());

        let mut out = String::new();
        let mut cursor_chars = 0usize;
        let mut pos = 0usize;
        while pos <= symbols.len() {
            if pos == cursor {
                if let Some(p) = pending.take() {
                    out.push_str(&p);
                }
                cursor_chars = out.chars().count();
            }
            if pos == symbols.len() {
                break;
            }
            if let Some(&(end, text)) = span_at.get(&pos) {
                out.push_str(text);
                if cursor > pos && cursor < end {
                    // cursor sits inside the phrase: display it after
                    if let Some(p) = pending.take() {
                        out.push_str(&p);
                    }
                    cursor_chars = out.chars().count();
                }
                pos = end;
                continue;
            }
            match symbols[pos] {
                Symbol::Glyph { ch, .. } => out.push(ch),
                // syllables outside any interval only occur transiently
                Symbol::Phone(_) => (),
            }
            pos += 1;
        }
        (out, cursor_chars)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::dictionary::Phrase;
    use crate::syl;
    use crate::syllable::Bopomofo::*;

    fn small_dict() -> Arc<dyn Dictionary> {
        Arc::new(HashMap::from([
            (
                vec![syl![C, E, TONE4]],
                vec![
                    Phrase::with_pos("測", 300, 1),
                    Phrase::with_pos("冊", 100, 2),
                ],
            ),
            (
                vec![syl![SH, TONE4]],
                vec![Phrase::with_pos("是", 5000, 3)],
            ),
            (
                vec![syl![C, E, TONE4], syl![SH, TONE4]],
                vec![Phrase::with_pos("測試", 400, 4)],
            ),
        ]))
    }

    fn session() -> Session {
        Session::new(small_dict(), UserDict::in_memory(), Config::default())
    }

    fn type_keys(session: &mut Session, keys: &str) {
        for c in keys.chars() {
            session.handle_key(KeyEvent::Char(c));
        }
    }

    #[test]
    fn compose_convert_commit() {
        let mut session = session();
        type_keys(&mut session, "hk4g4");
        assert_eq!("測試", session.preedit());
        assert_eq!(KeyBehavior::Commit, session.handle_key(KeyEvent::Enter));
        assert_eq!("測試", session.take_commit());
        assert_eq!("", session.preedit());
    }

    #[test]
    fn backspace_pops_phonetic_before_symbols() {
        let mut session = session();
        type_keys(&mut session, "hk");
        assert!(session.editor.is_entering());
        session.handle_key(KeyEvent::Backspace);
        session.handle_key(KeyEvent::Backspace);
        assert!(!session.editor.is_entering());

        type_keys(&mut session, "hk4");
        assert_eq!(1, session.preedit.len());
        session.handle_key(KeyEvent::Backspace);
        assert!(session.preedit.is_empty());
    }

    #[test]
    fn escape_clears_in_progress() {
        let mut session = session();
        type_keys(&mut session, "hk");
        assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Esc));
        assert!(!session.editor.is_entering());
        assert_eq!("", session.preedit());
    }

    #[test]
    fn candidate_window_selects_and_pins() {
        let mut session = session();
        type_keys(&mut session, "hk4");
        session.preedit.set_cursor(0);
        assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Down));
        assert!(session.is_selecting());
        let candidates = session.candidates();
        assert_eq!(vec!["測", "冊"], candidates);

        // pick the runner-up
        assert_eq!(
            KeyBehavior::Absorb,
            session.handle_key(KeyEvent::Char('2'))
        );
        assert!(!session.is_selecting());
        assert_eq!("冊", session.preedit());
    }

    #[test]
    fn bypass_passes_keys_through() {
        let mut session = session();
        session.handle_key(KeyEvent::CapsLock);
        assert_eq!(
            KeyBehavior::Ignore,
            session.handle_key(KeyEvent::Char('h'))
        );
        session.handle_key(KeyEvent::CapsLock);
        assert_eq!(
            KeyBehavior::Absorb,
            session.handle_key(KeyEvent::Char('h'))
        );
    }

    #[test]
    fn preedit_cap_rejects_overflow() {
        let mut config = Config::default();
        config.set_max_chi_symbol_len(2);
        let mut session = Session::new(small_dict(), UserDict::in_memory(), config);
        type_keys(&mut session, "hk4hk4");
        assert_eq!(2, session.preedit.len());
        // third syllable bounces at the buffer cap
        type_keys(&mut session, "hk");
        assert_eq!(KeyBehavior::KeyError, session.handle_key(KeyEvent::Char('4')));
        assert_eq!(2, session.preedit.len());
        assert!(!session.editor.is_entering());
    }

    #[test]
    fn tab_cycles_segmentation() {
        let mut session = session();
        type_keys(&mut session, "hk4g4");
        assert_eq!("測試", session.preedit());
        assert_eq!(KeyBehavior::Absorb, session.handle_key(KeyEvent::Tab));
        assert_eq!("測是", session.preedit());
    }

    #[test]
    fn backtick_opens_symbol_table() {
        let mut session = session();
        assert_eq!(
            KeyBehavior::OpenSymbolTable,
            session.handle_key(KeyEvent::Char('`'))
        );
    }
}
