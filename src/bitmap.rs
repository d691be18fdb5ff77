// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fixed-size word bitmaps used for identifier allocation and relations.
// Author: Lukas Bower

//! Fixed-size bitmaps backed by machine words.
//!
//! [`Bitmap`] is the plain variant used for the tables the registry owns.
//! [`AtomicBitmap`] lives inside caller-owned records and is only mutated with
//! the registry's critical section held, so relaxed ordering is sufficient.

use portable_atomic::{AtomicUsize, Ordering};

use crate::config::BITS_PER_WORD;

#[inline(always)]
const fn split(bit: usize) -> (usize, usize) {
    (bit / BITS_PER_WORD, 1usize << (bit % BITS_PER_WORD))
}

/// A set of small integers stored as `WORDS` machine words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bitmap<const WORDS: usize> {
    words: [usize; WORDS],
}

impl<const WORDS: usize> Bitmap<WORDS> {
    /// Number of bits the bitmap can hold.
    pub const CAPACITY: usize = WORDS * BITS_PER_WORD;

    /// Empty bitmap.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Sets `bit`.
    #[inline]
    pub fn set(&mut self, bit: usize) {
        let (word, mask) = split(bit);
        self.words[word] |= mask;
    }

    /// Clears `bit`.
    #[inline]
    pub fn clear(&mut self, bit: usize) {
        let (word, mask) = split(bit);
        self.words[word] &= !mask;
    }

    /// Returns whether `bit` is set.
    #[inline]
    #[must_use]
    pub fn test(&self, bit: usize) -> bool {
        let (word, mask) = split(bit);
        self.words[word] & mask != 0
    }

    /// Clears every bit.
    pub fn clear_all(&mut self) {
        self.words = [0; WORDS];
    }

    /// Returns whether no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Word-wise intersection of two bitmaps.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (dst, (lhs, rhs)) in out
            .words
            .iter_mut()
            .zip(self.words.iter().zip(other.words.iter()))
        {
            *dst = lhs & rhs;
        }
        out
    }

    /// Lowest clear bit in `start..limit`, if any.
    ///
    /// Full words are skipped in one step, so the scan costs at most one pass
    /// over `limit / BITS_PER_WORD` words.
    #[must_use]
    pub fn next_clear(&self, start: usize, limit: usize) -> Option<usize> {
        let limit = limit.min(Self::CAPACITY);
        let mut bit = start;
        while bit < limit {
            let (word, _) = split(bit);
            let offset = bit % BITS_PER_WORD;
            let free = !self.words[word] & (usize::MAX << offset);
            if free != 0 {
                let found = word * BITS_PER_WORD + free.trailing_zeros() as usize;
                return (found < limit).then_some(found);
            }
            bit = (word + 1) * BITS_PER_WORD;
        }
        None
    }

    /// Iterates the set bits in ascending order.
    #[must_use]
    pub fn iter(&self) -> SetBits<'_, WORDS> {
        SetBits {
            words: &self.words,
            word: 0,
            pending: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Raw backing words.
    #[must_use]
    pub const fn words(&self) -> &[usize; WORDS] {
        &self.words
    }
}

impl<const WORDS: usize> Default for Bitmap<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const WORDS: usize> IntoIterator for &'a Bitmap<WORDS> {
    type Item = usize;
    type IntoIter = SetBits<'a, WORDS>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the set bits of a [`Bitmap`].
#[derive(Debug, Clone)]
pub struct SetBits<'a, const WORDS: usize> {
    words: &'a [usize; WORDS],
    word: usize,
    pending: usize,
}

impl<const WORDS: usize> Iterator for SetBits<'_, WORDS> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.pending != 0 {
                let bit = self.pending.trailing_zeros() as usize;
                self.pending &= self.pending - 1;
                return Some(self.word * BITS_PER_WORD + bit);
            }
            self.word += 1;
            self.pending = *self.words.get(self.word)?;
        }
    }
}

/// Bitmap with interior mutability, embedded in caller-owned records.
#[derive(Debug)]
pub struct AtomicBitmap<const WORDS: usize> {
    words: [AtomicUsize; WORDS],
}

impl<const WORDS: usize> AtomicBitmap<WORDS> {
    /// Empty bitmap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [const { AtomicUsize::new(0) }; WORDS],
        }
    }

    /// Sets `bit`.
    #[inline]
    pub fn set(&self, bit: usize) {
        let (word, mask) = split(bit);
        self.words[word].fetch_or(mask, Ordering::Relaxed);
    }

    /// Clears `bit`.
    #[inline]
    pub fn clear(&self, bit: usize) {
        let (word, mask) = split(bit);
        self.words[word].fetch_and(!mask, Ordering::Relaxed);
    }

    /// Returns whether `bit` is set.
    #[inline]
    #[must_use]
    pub fn test(&self, bit: usize) -> bool {
        let (word, mask) = split(bit);
        self.words[word].load(Ordering::Relaxed) & mask != 0
    }

    /// Clears every bit.
    pub fn clear_all(&self) {
        for word in &self.words {
            word.store(0, Ordering::Relaxed);
        }
    }

    /// Copies the current contents into a plain [`Bitmap`].
    #[must_use]
    pub fn snapshot(&self) -> Bitmap<WORDS> {
        let mut out = Bitmap::new();
        for (dst, src) in out.words.iter_mut().zip(self.words.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        out
    }
}

impl<const WORDS: usize> Default for AtomicBitmap<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}
