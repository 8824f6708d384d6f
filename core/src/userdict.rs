//! The user phrase store.
//!
//! A keyed table of user-learned phrases persisted as an append-only log
//! with an in-memory index. Records carry `(syllables, text)` as the key and
//! `(freq, max_freq, timestamp)` as the payload; the original system
//! frequency of an entry is whatever its first `add` record carried, so the
//! on-disk format never stores it twice.
//!
//! Effective frequencies age: an entry used recently reads close to its
//! recorded maximum and decays linearly back to its original frequency over
//! [`HALF_LIFE_SECS`]. Bumping an entry refreshes its timestamp and pushes
//! the maximum up by one.
//!
//! Writers take an exclusive advisory lock on the log; read-only openers
//! take a shared one. A write failure mid-session degrades the store to
//! read-only instead of unwinding the session.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use fs2::FileExt;
use smallvec::SmallVec;

use crate::config::AddPhraseDirection;
use crate::dictionary::{sort_candidates, Phrase, USER_POS_BASE};
use crate::error::UserStoreError;
use crate::syllable::Syllable;

/// Seconds for an unused entry to decay back to its original frequency.
pub const HALF_LIFE_SECS: i64 = 4_000_000;

const LOG_VERSION: u8 = 1;
const OP_ADD: u8 = 1;
const OP_REMOVE: u8 = 2;
const OP_BUMP: u8 = 3;

type Seq = SmallVec<[u16; 4]>;
type Key = (Seq, String);

#[derive(Debug, Clone, Copy)]
struct Record {
    user_freq: u32,
    orig_freq: u32,
    max_freq: u32,
    recent: i64,
    rank: u32,
}

fn effective(rec: &Record, now: i64) -> u32 {
    let dt = (now - rec.recent).max(0);
    let decay = (1.0 - dt as f64 / HALF_LIFE_SECS as f64).max(0.0);
    let span = rec.max_freq.saturating_sub(rec.orig_freq) as f64;
    let f = rec.orig_freq as f64 + decay * span;
    (f.round() as u32).clamp(rec.orig_freq, rec.max_freq.max(rec.orig_freq))
}

fn wall_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn seq_of(syllables: &[Syllable]) -> Seq {
    syllables.iter().map(Syllable::to_u16).collect()
}

#[derive(Debug)]
pub struct UserDict {
    path: Option<PathBuf>,
    file: Option<File>,
    read_only: bool,
    index: HashMap<Key, Record>,
    records_logged: usize,
    head_rank: u32,
    tail_rank: u32,
}

impl UserDict {
    /// Opens (creating if necessary) the log for writing, taking the
    /// exclusive advisory lock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<UserDict, UserStoreError> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| UserStoreError::Locked)?;

        let mut dict = UserDict {
            path: Some(path.to_path_buf()),
            file: None,
            read_only: false,
            index: HashMap::new(),
            records_logged: 0,
            head_rank: 0x8000,
            tail_rank: 0x8000,
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        dict.replay(&data);
        dict.file = Some(file);
        Ok(dict)
    }

    /// Opens the log for reading only, with a shared lock. Mutating calls
    /// will report [`UserStoreError::ReadOnly`].
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<UserDict, UserStoreError> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        file.try_lock_shared().map_err(|_| UserStoreError::Locked)?;

        let mut dict = UserDict {
            path: Some(path.to_path_buf()),
            file: None,
            read_only: true,
            index: HashMap::new(),
            records_logged: 0,
            head_rank: 0x8000,
            tail_rank: 0x8000,
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        dict.replay(&data);
        Ok(dict)
    }

    /// A store with no backing file, used when the host runs without a
    /// user profile.
    pub fn in_memory() -> UserDict {
        UserDict {
            path: None,
            file: None,
            read_only: false,
            index: HashMap::new(),
            records_logged: 0,
            head_rank: 0x8000,
            tail_rank: 0x8000,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, syllables: &[Syllable], text: &str) -> bool {
        self.index.contains_key(&(seq_of(syllables), text.to_string()))
    }

    /// All user phrases under a syllable sequence, with aged frequencies.
    pub fn lookup(&self, syllables: &[Syllable]) -> Vec<Phrase> {
        self.lookup_at(syllables, wall_clock())
    }

    pub fn lookup_at(&self, syllables: &[Syllable], now: i64) -> Vec<Phrase> {
        let seq = seq_of(syllables);
        let mut phrases: Vec<Phrase> = self
            .index
            .iter()
            .filter(|(key, _)| key.0 == seq)
            .map(|(key, rec)| {
                Phrase::with_pos(key.1.clone(), effective(rec, now), USER_POS_BASE + rec.rank)
            })
            .collect();
        sort_candidates(&mut phrases);
        phrases
    }

    /// The aged frequency of one entry, if present.
    pub fn frequency_at(&self, syllables: &[Syllable], text: &str, now: i64) -> Option<u32> {
        self.index
            .get(&(seq_of(syllables), text.to_string()))
            .map(|rec| effective(rec, now))
    }

    /// Inserts with a default origin, or bumps an existing entry.
    pub fn add(&mut self, syllables: &[Syllable], text: &str) {
        self.add_with_origin(syllables, text, 1, 1, AddPhraseDirection::Tail);
    }

    /// Inserts a phrase learned from the chooser. `orig_freq` is the system
    /// frequency of the same text (or a floor of 1), `max_at_key` the
    /// highest frequency among all candidates at the key; both seed the
    /// aging curve the way the original entry distribution did.
    pub fn add_with_origin(
        &mut self,
        syllables: &[Syllable],
        text: &str,
        orig_freq: u32,
        max_at_key: u32,
        direction: AddPhraseDirection,
    ) {
        if self.read_only {
            log::debug!("user phrase store is read-only; dropping add of {text:?}");
            return;
        }
        let now = wall_clock();
        let key = (seq_of(syllables), text.to_string());
        if self.index.contains_key(&key) {
            self.bump_frequency_at(syllables, text, now);
            return;
        }
        let orig_freq = orig_freq.max(1);
        let rank = match direction {
            AddPhraseDirection::Head => {
                self.head_rank = self.head_rank.saturating_sub(1);
                self.head_rank
            }
            AddPhraseDirection::Tail => {
                let rank = self.tail_rank;
                self.tail_rank += 1;
                rank
            }
        };
        let rec = Record {
            user_freq: orig_freq,
            orig_freq,
            max_freq: max_at_key.max(orig_freq),
            recent: now,
            rank,
        };
        self.append(OP_ADD, &key.0, text, &rec);
        self.index.insert(key, rec);
    }

    /// Drops an entry. Returns whether it existed.
    pub fn remove(&mut self, syllables: &[Syllable], text: &str) -> bool {
        if self.read_only {
            return false;
        }
        let key = (seq_of(syllables), text.to_string());
        match self.index.remove(&key) {
            Some(rec) => {
                self.append(OP_REMOVE, &key.0, text, &rec);
                true
            }
            None => false,
        }
    }

    /// Applies the aging bump for an entry the chooser just used. Returns
    /// whether the entry existed.
    pub fn bump_frequency(&mut self, syllables: &[Syllable], text: &str) -> bool {
        self.bump_frequency_at(syllables, text, wall_clock())
    }

    pub fn bump_frequency_at(&mut self, syllables: &[Syllable], text: &str, now: i64) -> bool {
        if self.read_only {
            return false;
        }
        let key = (seq_of(syllables), text.to_string());
        let Some(rec) = self.index.get_mut(&key) else {
            return false;
        };
        let f = effective(rec, now);
        rec.max_freq = rec.max_freq.max(f + 1);
        rec.user_freq = (f + 1).min(rec.max_freq);
        rec.recent = now;
        let rec = *rec;
        self.append(OP_BUMP, &key.0, text, &rec);
        true
    }

    /// Flushes buffered writes to disk.
    pub fn sync(&mut self) {
        if let Some(file) = &mut self.file {
            if let Err(err) = file.flush().and_then(|_| file.sync_data()) {
                log::warn!("user phrase log sync failed: {err}");
            }
        }
    }

    fn append(&mut self, op: u8, seq: &[u16], text: &str, rec: &Record) {
        if self.read_only {
            return;
        }
        let Some(file) = &mut self.file else {
            return;
        };
        let mut buf = Vec::with_capacity(20 + seq.len() * 2 + text.len());
        buf.push(LOG_VERSION);
        buf.push(op);
        buf.push(seq.len() as u8);
        for &s in seq {
            buf.write_u16::<LittleEndian>(s).expect("vec write");
        }
        buf.write_u16::<LittleEndian>(text.len() as u16)
            .expect("vec write");
        buf.extend_from_slice(text.as_bytes());
        buf.write_u32::<LittleEndian>(rec.user_freq).expect("vec write");
        buf.write_u32::<LittleEndian>(rec.max_freq).expect("vec write");
        buf.write_i64::<LittleEndian>(rec.recent).expect("vec write");

        if let Err(err) = file.write_all(&buf) {
            log::warn!("user phrase log write failed, degrading to read-only: {err}");
            self.read_only = true;
            return;
        }
        self.records_logged += 1;
    }

    /// Replays the log into the index. Stops at the first malformed record
    /// so a torn tail write loses only the tail.
    fn replay(&mut self, data: &[u8]) {
        let mut cursor = 0usize;
        while cursor < data.len() {
            let start = cursor;
            let Some(parsed) = parse_record(data, &mut cursor) else {
                log::warn!("user phrase log truncated at offset {start}");
                break;
            };
            let (op, seq, text, freq, max_freq, ts) = parsed;
            self.records_logged += 1;
            let key = (seq, text);
            match op {
                OP_ADD => {
                    let stale = self
                        .index
                        .get(&key)
                        .is_some_and(|existing| existing.recent > ts);
                    if !stale {
                        let rank = self.tail_rank;
                        self.tail_rank += 1;
                        self.index.insert(
                            key,
                            Record {
                                user_freq: freq,
                                orig_freq: freq,
                                max_freq: max_freq.max(freq),
                                recent: ts,
                                rank,
                            },
                        );
                    }
                }
                OP_BUMP => match self.index.get_mut(&key) {
                    Some(rec) if rec.recent <= ts => {
                        rec.user_freq = freq;
                        rec.max_freq = max_freq.max(freq);
                        rec.recent = ts;
                    }
                    Some(_) => (),
                    None => {
                        let rank = self.tail_rank;
                        self.tail_rank += 1;
                        self.index.insert(
                            key,
                            Record {
                                user_freq: freq,
                                orig_freq: freq,
                                max_freq: max_freq.max(freq),
                                recent: ts,
                                rank,
                            },
                        );
                    }
                },
                OP_REMOVE => {
                    self.index.remove(&key);
                }
                other => {
                    log::warn!("user phrase log has unknown op {other} at offset {start}");
                }
            }
        }
    }

    /// Rewrites the log to just the live set: an `add` establishing each
    /// entry's original frequency followed, where needed, by a `bump`
    /// carrying its current state.
    fn compact(&mut self) -> Result<(), UserStoreError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if self.read_only {
            return Err(UserStoreError::ReadOnly);
        }

        let tmp_path = path.with_extension("compact");
        let mut tmp = File::create(&tmp_path)?;
        let mut entries: Vec<(&Key, &Record)> = self.index.iter().collect();
        entries.sort_by_key(|(_, rec)| rec.rank);

        let mut records = 0usize;
        for ((seq, text), rec) in entries {
            let add = Record {
                user_freq: rec.orig_freq,
                orig_freq: rec.orig_freq,
                max_freq: rec.orig_freq,
                recent: rec.recent,
                rank: rec.rank,
            };
            write_record(&mut tmp, OP_ADD, seq, text, &add)?;
            records += 1;
            if rec.user_freq != rec.orig_freq || rec.max_freq != rec.orig_freq {
                write_record(&mut tmp, OP_BUMP, seq, text, rec)?;
                records += 1;
            }
        }
        tmp.sync_data()?;
        drop(tmp);

        // Release the lock before the rename, then take it again.
        self.file = None;
        std::fs::rename(&tmp_path, &path)?;
        let file = OpenOptions::new().read(true).append(true).open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| UserStoreError::Locked)?;
        self.file = Some(file);
        self.records_logged = records;
        Ok(())
    }
}

impl Drop for UserDict {
    fn drop(&mut self) {
        if !self.read_only && self.path.is_some() && self.records_logged > 2 * self.index.len() {
            if let Err(err) = self.compact() {
                log::warn!("user phrase log compaction failed: {err}");
            }
        }
        self.sync();
    }
}

fn write_record(
    file: &mut File,
    op: u8,
    seq: &[u16],
    text: &str,
    rec: &Record,
) -> Result<(), UserStoreError> {
    let mut buf = Vec::with_capacity(20 + seq.len() * 2 + text.len());
    buf.push(LOG_VERSION);
    buf.push(op);
    buf.push(seq.len() as u8);
    for &s in seq {
        buf.write_u16::<LittleEndian>(s).expect("vec write");
    }
    buf.write_u16::<LittleEndian>(text.len() as u16)
        .expect("vec write");
    buf.extend_from_slice(text.as_bytes());
    buf.write_u32::<LittleEndian>(rec.user_freq).expect("vec write");
    buf.write_u32::<LittleEndian>(rec.max_freq).expect("vec write");
    buf.write_i64::<LittleEndian>(rec.recent).expect("vec write");
    file.write_all(&buf)?;
    Ok(())
}

type Parsed = (u8, Seq, String, u32, u32, i64);

fn take<'d>(data: &'d [u8], at: &mut usize, n: usize) -> Option<&'d [u8]> {
    let slice = data.get(*at..*at + n)?;
    *at += n;
    Some(slice)
}

fn parse_record(data: &[u8], cursor: &mut usize) -> Option<Parsed> {
    let mut at = *cursor;

    let header = take(data, &mut at, 3)?;
    if header[0] != LOG_VERSION {
        return None;
    }
    let op = header[1];
    let seq_len = header[2] as usize;
    let mut seq = Seq::new();
    for chunk in take(data, &mut at, seq_len * 2)?.chunks_exact(2) {
        seq.push(LittleEndian::read_u16(chunk));
    }
    let text_len = LittleEndian::read_u16(take(data, &mut at, 2)?) as usize;
    let text = std::str::from_utf8(take(data, &mut at, text_len)?)
        .ok()?
        .to_string();
    let freq = LittleEndian::read_u32(take(data, &mut at, 4)?);
    let max_freq = LittleEndian::read_u32(take(data, &mut at, 4)?);
    let ts = LittleEndian::read_i64(take(data, &mut at, 8)?);

    *cursor = at;
    Some((op, seq, text, freq, max_freq, ts))
}
