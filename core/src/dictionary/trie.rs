//! The on-disk phrase tree and arena.
//!
//! Two files back the system dictionary:
//!
//! * the *arena* (`dict.dat`) — concatenated NUL-terminated UTF-8 phrases;
//! * the *tree* (`fonetree.dat`) — an array of fixed-width nodes forming a
//!   trie keyed by packed syllables.
//!
//! A node is 12 bytes, three little-endian `u32` slots:
//!
//! ```text
//! | key | a | b |
//! ```
//!
//! Internal nodes carry a non-zero syllable in the low half of `key` and
//! their half-open child range in `a`/`b`. Leaf nodes have `key == 0`, the
//! phrase's arena offset in `a` and its frequency in `b`; both are 24-bit
//! values. The root at index 0 is a sentinel whose `key` is the total
//! phrase count — readers take the count from here, never from a constant.
//!
//! Children of an internal node are laid out leaves first, then internal
//! children in strictly ascending key order, so a lookup can binary-search
//! the internal part and scan the leaves.
//!
//! Both files are memory-mapped read-only and shared freely between
//! sessions.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;

use crate::dictionary::{sort_candidates, Dictionary, Phrase, Phrases, MAX_PHRASE_LEN};
use crate::error::{BuildError, LoadError};
use crate::syllable::Syllable;

const NODE_SIZE: usize = 12;
const FIELD_MAX: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy)]
struct Node {
    key: u32,
    a: u32,
    b: u32,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.key == 0
    }
}

/// The memory-mapped system dictionary.
#[derive(Debug)]
pub struct TrieDictionary {
    arena: Mmap,
    tree: Mmap,
    node_count: u32,
    phrase_count: u32,
}

impl TrieDictionary {
    /// Maps and validates the data files. Fails fatally on a missing or
    /// structurally broken file.
    pub fn open<P: AsRef<Path>>(arena_path: P, tree_path: P) -> Result<TrieDictionary, LoadError> {
        let arena = Self::map(arena_path.as_ref())?;
        let tree = Self::map(tree_path.as_ref())?;

        if tree.len() % NODE_SIZE != 0 || tree.is_empty() {
            return Err(LoadError::Corrupt(format!(
                "tree length {} is not a whole number of nodes",
                tree.len()
            )));
        }
        let node_count = (tree.len() / NODE_SIZE) as u32;
        let root = Node {
            key: LittleEndian::read_u32(&tree[0..4]),
            a: LittleEndian::read_u32(&tree[4..8]),
            b: LittleEndian::read_u32(&tree[8..12]),
        };
        if root.a > root.b || root.b > node_count {
            return Err(LoadError::Corrupt(format!(
                "root child range {}..{} exceeds {} nodes",
                root.a, root.b, node_count
            )));
        }

        Ok(TrieDictionary {
            arena,
            tree,
            node_count,
            phrase_count: root.key,
        })
    }

    fn map(path: &Path) -> Result<Mmap, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        // Safety: the mapping is read-only and the data files are treated
        // as immutable for the lifetime of the process.
        unsafe { Mmap::map(&file) }.map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Total number of phrases, as recorded by the sentinel root.
    pub fn phrase_count(&self) -> u32 {
        self.phrase_count
    }

    fn node(&self, index: u32) -> Option<Node> {
        if index >= self.node_count {
            log::warn!("tree node index {index} out of bounds");
            return None;
        }
        let off = index as usize * NODE_SIZE;
        Some(Node {
            key: LittleEndian::read_u32(&self.tree[off..off + 4]),
            a: LittleEndian::read_u32(&self.tree[off + 4..off + 8]),
            b: LittleEndian::read_u32(&self.tree[off + 8..off + 12]),
        })
    }

    /// Child node indices of an internal node, leaves included.
    pub fn children_of(&self, index: u32) -> impl Iterator<Item = u32> + '_ {
        let range = match self.node(index) {
            Some(node) if !node.is_leaf() || index == 0 => node.a..node.b.min(self.node_count),
            _ => 0..0,
        };
        range
    }

    /// Walks the internal children of `node` for the syllable key.
    fn descend(&self, node: Node, key: u16) -> Option<Node> {
        let begin = node.a;
        let end = node.b.min(self.node_count);
        if begin >= end {
            return None;
        }
        // Leaves sort first (key 0); binary search the whole range works
        // because the internal keys are strictly ascending.
        let mut lo = begin;
        let mut hi = end;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mid_node = self.node(mid)?;
            use std::cmp::Ordering::*;
            match mid_node.key.cmp(&(key as u32)) {
                Less => lo = mid + 1,
                Greater => hi = mid,
                Equal => return Some(mid_node),
            }
        }
        None
    }

    fn find_node(&self, syllables: &[Syllable]) -> Option<Node> {
        let mut node = self.node(0)?;
        for syllable in syllables {
            node = self.descend(node, syllable.to_u16())?;
        }
        Some(node)
    }

    /// Reads the NUL-terminated phrase at an arena offset, validating
    /// bounds and UTF-8 on the way.
    fn phrase_at(&self, offset: u32) -> Option<&str> {
        let start = offset as usize;
        if start >= self.arena.len() {
            log::warn!("arena offset {offset} out of bounds");
            return None;
        }
        let rest = &self.arena[start..];
        let len = rest.iter().position(|&b| b == 0)?;
        match std::str::from_utf8(&rest[..len]) {
            Ok(s) => Some(s),
            Err(_) => {
                log::warn!("arena offset {offset} is not valid UTF-8");
                None
            }
        }
    }

    fn leaves(&self, node: Node) -> Vec<Phrase> {
        let begin = node.a;
        let end = node.b.min(self.node_count);
        let mut phrases = Vec::new();
        for index in begin..end {
            let Some(child) = self.node(index) else {
                break;
            };
            if !child.is_leaf() {
                // leaves sort before the internal children
                break;
            }
            if let Some(text) = self.phrase_at(child.a) {
                phrases.push(Phrase::with_pos(text, child.b, child.a));
            }
        }
        sort_candidates(&mut phrases);
        phrases
    }
}

impl Dictionary for TrieDictionary {
    fn lookup_phrase(&self, syllables: &[Syllable]) -> Phrases<'_> {
        if syllables.is_empty() || syllables.len() > MAX_PHRASE_LEN {
            return Box::new(std::iter::empty());
        }
        match self.find_node(syllables) {
            Some(node) => Box::new(self.leaves(node).into_iter()),
            None => Box::new(std::iter::empty()),
        }
    }
}

#[derive(Debug, Default)]
struct BuilderNode {
    children: BTreeMap<u16, BuilderNode>,
    phrases: Vec<(String, u32)>,
}

/// Builds the arena and tree files from `(syllables, phrase, frequency)`
/// entries. Used by the data compiler and by tests that need fixture
/// dictionaries.
#[derive(Debug, Default)]
pub struct TrieBuilder {
    root: BuilderNode,
}

impl TrieBuilder {
    pub fn new() -> TrieBuilder {
        TrieBuilder::default()
    }

    pub fn insert(
        &mut self,
        syllables: &[Syllable],
        phrase: &str,
        freq: u32,
    ) -> Result<(), BuildError> {
        let chars = phrase.chars().count();
        if chars == 0 || chars > MAX_PHRASE_LEN {
            return Err(BuildError::PhraseLength(phrase.to_string()));
        }
        if chars != syllables.len() {
            return Err(BuildError::SyllableCount(
                phrase.to_string(),
                chars,
                syllables.len(),
            ));
        }
        if syllables.iter().any(|s| !s.is_complete()) {
            return Err(BuildError::IncompleteSyllable(phrase.to_string()));
        }
        if freq > FIELD_MAX {
            return Err(BuildError::FrequencyRange(freq));
        }

        let mut node = &mut self.root;
        for syllable in syllables {
            node = node.children.entry(syllable.to_u16()).or_default();
        }
        if !node.phrases.iter().any(|(text, _)| text == phrase) {
            node.phrases.push((phrase.to_string(), freq));
        }
        Ok(())
    }

    /// Serialises into `(arena, tree)` byte vectors.
    pub fn build(&self) -> Result<(Vec<u8>, Vec<u8>), BuildError> {
        let mut arena: Vec<u8> = Vec::new();
        let mut nodes: Vec<(u32, u32, u32)> = Vec::new();
        let mut phrase_count = 0u32;

        // Breadth-first layout keeps every child block contiguous.
        nodes.push((0, 0, 0)); // sentinel, patched below
        let mut queue: Vec<(&BuilderNode, usize)> = vec![(&self.root, 0)];
        let mut head = 0;
        while head < queue.len() {
            let (node, slot) = queue[head];
            head += 1;

            let begin = nodes.len() as u32;
            for (text, freq) in &node.phrases {
                let offset = arena.len() as u32;
                if offset > FIELD_MAX {
                    return Err(BuildError::ArenaOverflow);
                }
                arena.extend_from_slice(text.as_bytes());
                arena.push(0);
                nodes.push((0, offset, *freq));
                phrase_count += 1;
            }
            for (&key, child) in &node.children {
                let slot = nodes.len();
                nodes.push((key as u32, 0, 0));
                queue.push((child, slot));
            }
            let end = nodes.len() as u32;
            if end > FIELD_MAX {
                return Err(BuildError::NodeOverflow);
            }

            nodes[slot].1 = begin;
            nodes[slot].2 = end;
        }
        nodes[0].0 = phrase_count;

        let mut tree = Vec::with_capacity(nodes.len() * NODE_SIZE);
        for (key, a, b) in nodes {
            tree.write_u32::<LittleEndian>(key)?;
            tree.write_u32::<LittleEndian>(a)?;
            tree.write_u32::<LittleEndian>(b)?;
        }
        Ok((arena, tree))
    }

    /// Writes both files to disk.
    pub fn write_to<P: AsRef<Path>>(&self, arena_path: P, tree_path: P) -> Result<(), BuildError> {
        let (arena, tree) = self.build()?;
        File::create(arena_path)?.write_all(&arena)?;
        File::create(tree_path)?.write_all(&tree)?;
        Ok(())
    }
}
