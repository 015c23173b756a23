//! Per-buffer word completion database.
//!
//! Tracks the multiset of words in a buffer as a sorted map from interned word
//! to occurrence count, alongside a parallel per-line word list. Updates are
//! incremental: on query the database folds the line modifications since its
//! last timestamp, subtracts the word lists of removed lines and rescans only
//! the modified and added ones.
//!
//! Invariant: `words` always equals the multiset union of `line_to_words`.

use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::debug;

use crate::intern::{intern, InternedString};
use crate::{compute_line_modifications, Buffer, LineCount};

type WordList = BTreeMap<InternedString, u32>;

pub struct WordDb {
    timestamp: u64,
    line_to_words: Vec<Vec<InternedString>>,
    words: WordList,
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Maximal runs of word characters in a line, interned.
fn words_of(line: &str) -> Vec<InternedString> {
    let mut res = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if is_word_char(c) {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            res.push(intern(&line[s..i]));
        }
    }
    if let Some(s) = start {
        res.push(intern(&line[s..]));
    }
    res
}

fn add_words(words: &mut WordList, list: &[InternedString]) {
    for w in list {
        *words.entry(w.clone()).or_insert(0) += 1;
    }
}

fn remove_words(words: &mut WordList, list: &[InternedString]) {
    for w in list {
        let count = words
            .get_mut(w.as_str())
            .expect("word list out of sync with multiset");
        *count -= 1;
        if *count == 0 {
            words.remove(w.as_str());
        }
    }
}

/// True when `needle`'s characters appear in `word` in order, not necessarily
/// contiguously.
fn subsequence_match(word: &str, needle: &str) -> bool {
    let mut chars = needle.chars();
    let mut next = chars.next();
    for c in word.chars() {
        if next == Some(c) {
            next = chars.next();
            if next.is_none() {
                return true;
            }
        }
    }
    next.is_none()
}

impl WordDb {
    pub fn new(buffer: &Buffer) -> WordDb {
        let mut db = WordDb {
            timestamp: buffer.timestamp(),
            line_to_words: Vec::with_capacity(buffer.line_count().as_usize()),
            words: WordList::new(),
        };
        let mut line = LineCount(0);
        while line < buffer.line_count() {
            let list = words_of(buffer.line(line));
            add_words(&mut db.words, &list);
            db.line_to_words.push(list);
            line += 1;
        }
        db
    }

    fn update(&mut self, buffer: &Buffer) {
        if self.timestamp == buffer.timestamp() {
            return;
        }
        let modifs = compute_line_modifications(buffer, self.timestamp);
        self.timestamp = buffer.timestamp();
        if modifs.is_empty() {
            return;
        }
        debug!(
            target: "word_db",
            buffer = buffer.name(),
            modifications = modifs.len(),
            "incremental word database update"
        );

        let mut new_lines: Vec<Vec<InternedString>> =
            Vec::with_capacity(buffer.line_count().as_usize());
        let mut old_line = 0usize;
        for modif in &modifs {
            while old_line < modif.old_line.as_usize() {
                new_lines.push(std::mem::take(&mut self.line_to_words[old_line]));
                old_line += 1;
            }
            debug_assert_eq!(new_lines.len(), modif.new_line.as_usize());

            // the modified line and the lines removed after it give up their words
            let removed_end = (modif.old_line + modif.num_removed).as_usize();
            while old_line <= removed_end && old_line < self.line_to_words.len() {
                remove_words(&mut self.words, &self.line_to_words[old_line]);
                old_line += 1;
            }

            // rescan the modified line plus the added ones
            let mut line = modif.new_line;
            while line <= modif.new_line + modif.num_added && line < buffer.line_count() {
                let list = words_of(buffer.line(line));
                add_words(&mut self.words, &list);
                new_lines.push(list);
                line += 1;
            }
        }
        while old_line < self.line_to_words.len() {
            new_lines.push(std::mem::take(&mut self.line_to_words[old_line]));
            old_line += 1;
        }
        self.line_to_words = new_lines;
    }

    /// Words starting with `prefix`, in sorted order.
    pub fn find_prefix(&mut self, buffer: &Buffer, prefix: &str) -> Vec<InternedString> {
        self.update(buffer);
        self.words
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(w, _)| w.as_str().starts_with(prefix))
            .map(|(w, _)| w.clone())
            .collect()
    }

    /// Words containing `needle` as a (possibly non-contiguous) subsequence.
    pub fn find_subsequence(&mut self, buffer: &Buffer, needle: &str) -> Vec<InternedString> {
        self.update(buffer);
        self.words
            .keys()
            .filter(|w| subsequence_match(w.as_str(), needle))
            .cloned()
            .collect()
    }

    /// Occurrence count of an exact word.
    pub fn word_occurrences(&self, word: &str) -> u32 {
        self.words.get(word).copied().unwrap_or(0)
    }
}
