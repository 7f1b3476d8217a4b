//! Sparse, hole-tolerant id allocation.
//!
//! [`IndexTable`] maps a set of live small integer ids onto payloads. Ids are
//! never renumbered implicitly: removing an id leaves a hole that the next
//! [`IndexTable::add`] reuses (lowest hole first). The set of live ids is kept
//! in a [`BitVector`] so iteration skips empty 64-id words.

use std::collections::BTreeSet;

const WORD: usize = 64;

/// Growable bit set over `usize`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    card: usize,
}

impl BitVector {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, i: usize) -> bool {
        self.words
            .get(i / WORD)
            .is_some_and(|w| w & (1u64 << (i % WORD)) != 0)
    }

    /// Sets bit `i`; returns `true` if it was previously clear.
    pub fn insert(&mut self, i: usize) -> bool {
        let w = i / WORD;
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        let mask = 1u64 << (i % WORD);
        let fresh = self.words[w] & mask == 0;
        if fresh {
            self.words[w] |= mask;
            self.card += 1;
        }
        fresh
    }

    /// Clears bit `i`; returns `true` if it was set.
    pub fn remove(&mut self, i: usize) -> bool {
        let Some(word) = self.words.get_mut(i / WORD) else {
            return false;
        };
        let mask = 1u64 << (i % WORD);
        let was = *word & mask != 0;
        if was {
            *word &= !mask;
            self.card -= 1;
            while self.words.last() == Some(&0) {
                self.words.pop();
            }
        }
        was
    }

    /// Number of set bits.
    #[inline]
    pub fn card(&self) -> usize {
        self.card
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.card == 0
    }

    /// Largest set bit, if any.
    pub fn last_true(&self) -> Option<usize> {
        let w = self.words.len().checked_sub(1)?;
        let word = self.words[w];
        Some(w * WORD + (WORD - 1 - word.leading_zeros() as usize))
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.card = 0;
    }

    /// Set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * WORD + tz)
            })
        })
    }
}

impl FromIterator<usize> for BitVector {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bv = BitVector::new();
        for i in iter {
            bv.insert(i);
        }
        bv
    }
}

/// Sparse container with stable ids and lowest-hole reuse.
#[derive(Clone, Debug)]
pub struct IndexTable<T> {
    slots: Vec<Option<T>>,
    live: BitVector,
    holes: BTreeSet<usize>,
}

impl<T> Default for IndexTable<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: BitVector::new(),
            holes: BTreeSet::new(),
        }
    }
}

impl<T> IndexTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest id that [`add`](Self::add) would return.
    pub fn first_free(&self) -> usize {
        self.holes.first().copied().unwrap_or(self.slots.len())
    }

    /// Stores `value` under the lowest unused id and returns it.
    pub fn add(&mut self, value: T) -> usize {
        let id = self.first_free();
        self.insert_at(id, value);
        id
    }

    /// Stores `value` under `id`, returning the payload previously there.
    pub fn insert_at(&mut self, id: usize, value: T) -> Option<T> {
        if id >= self.slots.len() {
            self.holes.extend(self.slots.len()..id);
            self.slots.resize_with(id + 1, || None);
        }
        self.holes.remove(&id);
        self.live.insert(id);
        self.slots[id].replace(value)
    }

    /// Frees `id`. Other ids are untouched.
    pub fn remove(&mut self, id: usize) -> Option<T> {
        let value = self.slots.get_mut(id)?.take()?;
        self.live.remove(id);
        self.holes.insert(id);
        self.shrink_tail();
        Some(value)
    }

    fn shrink_tail(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
            self.holes.remove(&self.slots.len());
        }
    }

    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        self.live.contains(id)
    }

    #[inline]
    pub fn get(&self, id: usize) -> Option<&T> {
        self.slots.get(id)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        self.slots.get_mut(id)?.as_mut()
    }

    /// Number of live ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.live.card()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// The live-id set.
    #[inline]
    pub fn index(&self) -> &BitVector {
        &self.live
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.live.iter()
    }

    /// `(id, payload)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.live.iter().filter_map(|i| Some((i, self.slots[i].as_ref()?)))
    }

    /// Exchanges the contents (and liveness) of two slots.
    pub fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let hi = i.max(j);
        if hi >= self.slots.len() {
            self.holes.extend(self.slots.len()..=hi);
            self.slots.resize_with(hi + 1, || None);
        }
        self.slots.swap(i, j);
        for k in [i, j] {
            if self.slots[k].is_some() {
                self.live.insert(k);
                self.holes.remove(&k);
            } else {
                self.live.remove(k);
                self.holes.insert(k);
            }
        }
        self.shrink_tail();
    }

    /// Moves `(from, to)` that make the live ids contiguous from 0 while
    /// keeping their relative order. Applying them in order with
    /// [`swap`](Self::swap) always moves a live id into a hole.
    pub fn compaction_moves(&self) -> Vec<(usize, usize)> {
        self.ids()
            .enumerate()
            .filter(|&(k, i)| k != i)
            .map(|(k, i)| (i, k))
            .collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.live.clear();
        self.holes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitvector_iter_skips_words() {
        let bv: BitVector = [0, 3, 64, 200].into_iter().collect();
        assert_eq!(bv.iter().collect::<Vec<_>>(), vec![0, 3, 64, 200]);
        assert_eq!(bv.card(), 4);
        assert_eq!(bv.last_true(), Some(200));
    }

    #[test]
    fn bitvector_remove_trims() {
        let mut bv: BitVector = [1, 130].into_iter().collect();
        assert!(bv.remove(130));
        assert!(!bv.remove(130));
        assert_eq!(bv.last_true(), Some(1));
        assert!(bv.remove(1));
        assert_eq!(bv.last_true(), None);
        assert!(bv.is_empty());
    }

    #[test]
    fn add_reuses_lowest_hole() {
        let mut t = IndexTable::new();
        for v in 0..5 {
            assert_eq!(t.add(v), v);
        }
        t.remove(3);
        t.remove(1);
        assert_eq!(t.ids().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(t.add(10), 1);
        assert_eq!(t.add(11), 3);
        assert_eq!(t.add(12), 5);
        assert_eq!(t.get(3), Some(&11));
    }

    #[test]
    fn remove_tail_shrinks() {
        let mut t = IndexTable::new();
        t.add('a');
        t.add('b');
        t.add('c');
        t.remove(1);
        t.remove(2);
        assert_eq!(t.first_free(), 1);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn insert_at_leaves_holes() {
        let mut t = IndexTable::new();
        t.insert_at(4, "x");
        assert_eq!(t.len(), 1);
        assert_eq!(t.first_free(), 0);
        assert!(!t.contains(2));
        assert_eq!(t.add("y"), 0);
    }

    #[test]
    fn swap_with_hole_moves() {
        let mut t = IndexTable::new();
        t.add(1);
        t.add(2);
        t.add(3);
        t.remove(0);
        t.swap(2, 0);
        assert_eq!(t.ids().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(t.get(0), Some(&3));
        assert_eq!(t.first_free(), 2);
    }

    #[test]
    fn compaction_moves_preserve_order() {
        let mut t = IndexTable::new();
        for v in 0..6 {
            t.add(v);
        }
        t.remove(0);
        t.remove(3);
        let moves = t.compaction_moves();
        for &(from, to) in &moves {
            t.swap(from, to);
        }
        assert_eq!(t.ids().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        let values: Vec<_> = t.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2, 4, 5]);
    }
}
