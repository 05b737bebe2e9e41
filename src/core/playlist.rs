//! core/playlist.rs
//! Ordered streams + current cursor + repeat/random navigation.
//!
//! Random mode walks a shuffled order of item indexes. The order is always a
//! permutation of `0..len`: inserts drop the new index at a random slot,
//! removals take it out, and toggling random reshuffles everything. Indexes
//! rather than streams, so the same stream can sit in two slots.
//!
//! Navigation (`get_next`, `get_previous`) never mutates; moving the cursor is
//! the controller's job.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::error::{Error, Result};
use super::stream::{Stream, StreamRef};

pub struct Playlist {
    items: Vec<StreamRef>,
    shuffled: Vec<usize>,
    current: Option<usize>,
    repeat: bool,
    random: bool,
    rng: StdRng,
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Playlist {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic shuffles (tests, reproducible sessions).
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            items: Vec::new(),
            shuffled: Vec::new(),
            current: None,
            repeat: false,
            random: false,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn streams(&self) -> &[StreamRef] {
        &self.items
    }

    /// The random walk order, as indexes into `streams()`.
    pub fn shuffled(&self) -> &[usize] {
        &self.shuffled
    }

    pub fn nth(&self, pos: usize) -> Option<&StreamRef> {
        self.items.get(pos)
    }

    /// First index holding this exact stream.
    pub fn index_of(&self, stream: &Stream) -> Option<usize> {
        self.items.iter().position(|s| s.id() == stream.id())
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_stream(&self) -> Option<&StreamRef> {
        self.current.and_then(|i| self.items.get(i))
    }

    /// Insert at `pos`; `None` or anything past the end appends.
    /// Returns the index actually used.
    pub fn insert(&mut self, stream: StreamRef, pos: Option<usize>) -> usize {
        let len = self.items.len();
        let pos = pos.map_or(len, |p| p.min(len));

        for i in self.shuffled.iter_mut().filter(|i| **i >= pos) {
            *i += 1;
        }
        let slot = self.rng.gen_range(0..=self.shuffled.len());
        self.shuffled.insert(slot, pos);
        self.items.insert(pos, stream);

        if let Some(cur) = self.current {
            if cur >= pos {
                self.current = Some(cur + 1);
            }
        }

        pos
    }

    pub fn remove(&mut self, pos: usize) -> Result<StreamRef> {
        if pos >= self.items.len() {
            return Err(Error::NoSuchItem(pos));
        }

        let stream = self.items.remove(pos);
        self.shuffled.retain(|&i| i != pos);
        for i in self.shuffled.iter_mut().filter(|i| **i > pos) {
            *i -= 1;
        }

        self.current = match self.current {
            Some(cur) if cur == pos => None,
            Some(cur) if cur > pos => Some(cur - 1),
            other => other,
        };

        Ok(stream)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.shuffled.clear();
        self.current = None;
    }

    /// Move the cursor. Returns `(old, new)`.
    pub fn set_current(&mut self, pos: Option<usize>) -> Result<(Option<usize>, Option<usize>)> {
        if let Some(p) = pos {
            if p >= self.items.len() {
                return Err(Error::NoSuchItem(p));
            }
        }

        let old = self.current;
        self.current = pos;
        Ok((old, pos))
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    pub fn random(&self) -> bool {
        self.random
    }

    /// Toggling reshuffles from the current contents.
    pub fn set_random(&mut self, random: bool) {
        if random == self.random {
            return;
        }
        self.random = random;
        self.reshuffle();
    }

    pub fn reshuffle(&mut self) {
        self.shuffled = (0..self.items.len()).collect();
        self.shuffled.shuffle(&mut self.rng);
    }

    pub fn get_next(&self) -> Option<usize> {
        let total = self.items.len();
        if total == 0 {
            return None;
        }

        if self.random {
            return match self.current.and_then(|c| self.normal_to_random(c)) {
                None => self.random_to_normal(0),
                Some(r) if r + 1 == total => {
                    if self.repeat {
                        self.random_to_normal(0)
                    } else {
                        None
                    }
                }
                Some(r) => self.random_to_normal(r + 1),
            };
        }

        match self.current {
            None => Some(0),
            Some(c) if c + 1 == total => self.repeat.then_some(0),
            Some(c) => Some(c + 1),
        }
    }

    pub fn get_previous(&self) -> Option<usize> {
        let total = self.items.len();
        if total == 0 {
            return None;
        }

        if self.random {
            return match self.current.and_then(|c| self.normal_to_random(c)) {
                None | Some(0) => {
                    if self.repeat {
                        self.random_to_normal(total - 1)
                    } else {
                        None
                    }
                }
                Some(r) => self.random_to_normal(r - 1),
            };
        }

        match self.current {
            None | Some(0) => self.repeat.then_some(total - 1),
            Some(c) => Some(c - 1),
        }
    }

    fn normal_to_random(&self, pos: usize) -> Option<usize> {
        self.shuffled.iter().position(|&i| i == pos)
    }

    fn random_to_normal(&self, slot: usize) -> Option<usize> {
        self.shuffled.get(slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::rc::Rc;

    fn stream(n: usize) -> StreamRef {
        Stream::new(format!("file:///music/{n}.mp3")).unwrap().shared()
    }

    fn playlist_with(n: usize) -> Playlist {
        let mut pl = Playlist::with_seed(7);
        for i in 0..n {
            pl.insert(stream(i), None);
        }
        pl
    }

    fn assert_permutation(pl: &Playlist) {
        let mut order = pl.shuffled().to_vec();
        order.sort_unstable();
        assert_eq!(order, (0..pl.len()).collect::<Vec<_>>());
    }

    #[test]
    fn insert_clamps_out_of_range_to_append() {
        let mut pl = playlist_with(2);
        let s = stream(9);
        assert_eq!(pl.insert(Rc::clone(&s), Some(40)), 2);
        assert_eq!(pl.index_of(&s), Some(2));

        let head = stream(10);
        assert_eq!(pl.insert(Rc::clone(&head), Some(0)), 0);
        assert_eq!(pl.index_of(&head), Some(0));
        assert_permutation(&pl);
    }

    #[test]
    fn insert_before_cursor_keeps_same_stream_current() {
        let mut pl = playlist_with(3);
        pl.set_current(Some(1)).unwrap();
        let before = Rc::clone(pl.current_stream().unwrap());

        pl.insert(stream(8), Some(0));
        assert_eq!(pl.current(), Some(2));
        assert!(Rc::ptr_eq(pl.current_stream().unwrap(), &before));
    }

    #[test]
    fn remove_adjusts_cursor() {
        let mut pl = playlist_with(4);
        pl.set_current(Some(2)).unwrap();

        pl.remove(0).unwrap();
        assert_eq!(pl.current(), Some(1));

        pl.remove(3).unwrap_err();
        pl.remove(2).unwrap();
        assert_eq!(pl.current(), Some(1));

        pl.remove(1).unwrap();
        assert_eq!(pl.current(), None);
        assert_permutation(&pl);
    }

    #[test]
    fn remove_invalid_index_is_no_such_item() {
        let mut pl = playlist_with(1);
        assert!(matches!(pl.remove(5), Err(Error::NoSuchItem(5))));
        assert_eq!(pl.len(), 1);
    }

    #[test]
    fn sequential_navigation_stops_at_edges() {
        let mut pl = playlist_with(3);
        assert_eq!(pl.get_next(), Some(0));
        assert_eq!(pl.get_previous(), None);

        pl.set_current(Some(2)).unwrap();
        assert_eq!(pl.get_next(), None);
        assert_eq!(pl.get_previous(), Some(1));

        pl.set_current(Some(0)).unwrap();
        assert_eq!(pl.get_previous(), None);
    }

    #[test]
    fn repeat_wraps_both_ways() {
        let mut pl = playlist_with(3);
        pl.set_repeat(true);

        pl.set_current(Some(2)).unwrap();
        assert_eq!(pl.get_next(), Some(0));

        pl.set_current(Some(0)).unwrap();
        assert_eq!(pl.get_previous(), Some(2));
    }

    #[test]
    fn random_walk_visits_every_item_once() {
        let mut pl = playlist_with(6);
        pl.set_random(true);
        assert_permutation(&pl);

        let mut seen = HashSet::new();
        let mut cursor = pl.get_next();
        while let Some(i) = cursor {
            assert!(seen.insert(i), "index {i} visited twice");
            pl.set_current(Some(i)).unwrap();
            cursor = pl.get_next();
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn random_previous_undoes_next() {
        let mut pl = playlist_with(5);
        pl.set_random(true);
        pl.set_current(Some(3)).unwrap();

        if let Some(next) = pl.get_next() {
            pl.set_current(Some(next)).unwrap();
            assert_eq!(pl.get_previous(), Some(3));
        }
    }

    #[test]
    fn random_repeat_wraps_to_first_shuffled() {
        let mut pl = playlist_with(4);
        pl.set_random(true);
        pl.set_repeat(true);

        let last = pl.shuffled()[3];
        let first = pl.shuffled()[0];
        pl.set_current(Some(last)).unwrap();
        assert_eq!(pl.get_next(), Some(first));
    }

    #[test]
    fn toggling_random_is_always_a_permutation() {
        let mut pl = playlist_with(10);
        for _ in 0..5 {
            pl.set_random(true);
            assert_permutation(&pl);
            pl.set_random(false);
            assert_permutation(&pl);
        }
        pl.remove(4).unwrap();
        pl.insert(stream(99), Some(2));
        assert_permutation(&pl);
    }

    #[test]
    fn same_stream_twice_gets_two_random_slots() {
        let mut pl = Playlist::with_seed(3);
        let a = stream(0);
        pl.insert(Rc::clone(&a), None);
        pl.insert(stream(1), None);
        pl.insert(Rc::clone(&a), None);
        pl.set_random(true);
        assert_permutation(&pl);

        let mut seen = HashSet::new();
        let mut cursor = pl.get_next();
        while let Some(i) = cursor {
            assert!(seen.insert(i), "index {i} visited twice");
            pl.set_current(Some(i)).unwrap();
            cursor = pl.get_next();
        }
        assert_eq!(seen.len(), 3);

        pl.remove(0).unwrap();
        assert_permutation(&pl);
        assert!(Rc::ptr_eq(pl.nth(1).unwrap(), &a));
    }

    #[test]
    fn set_current_validates() {
        let mut pl = playlist_with(2);
        assert_eq!(pl.set_current(Some(1)).unwrap(), (None, Some(1)));
        assert!(pl.set_current(Some(2)).is_err());
        assert_eq!(pl.current(), Some(1));
        assert_eq!(pl.set_current(None).unwrap(), (Some(1), None));
    }

    #[test]
    fn empty_playlist_has_no_neighbours() {
        let mut pl = Playlist::with_seed(1);
        pl.set_repeat(true);
        assert_eq!(pl.get_next(), None);
        assert_eq!(pl.get_previous(), None);
    }
}
