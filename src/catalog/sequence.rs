//! Ordered playlist with a movable "now playing" cursor.
//!
//! A doubly linked list whose nodes live in a slot vector and link to each
//! other by slot index; freed slots are reused. `current` is a slot index
//! too and is cleared whenever its node goes away, so it never dangles.

use rand::Rng;

use super::song::SongId;

#[derive(Debug, Clone)]
struct Node {
    id: SongId,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackSequence {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    current: Option<usize>,
    len: usize,
}

impl PlaybackSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, slot: usize) -> Option<&Node> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn id_at(&self, slot: Option<usize>) -> Option<SongId> {
        slot.and_then(|s| self.node(s)).map(|n| n.id)
    }

    /// Add `id` at the tail. The first song appended becomes current.
    pub fn append(&mut self, id: SongId) {
        let node = Node {
            id,
            prev: self.tail,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.tail.and_then(|t| self.node_mut(t)) {
            Some(tail) => tail.next = Some(slot),
            None => {
                self.head = Some(slot);
                self.current = Some(slot);
            }
        }
        self.tail = Some(slot);
        self.len += 1;
    }

    fn find(&self, id: SongId) -> Option<usize> {
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = self.node(slot)?;
            if node.id == id {
                return Some(slot);
            }
            cursor = node.next;
        }
        None
    }

    /// Unlink the first node holding `id`.
    ///
    /// If that node was current, the cursor is cleared and the next call to
    /// [`PlaybackSequence::next`] restarts from the head.
    pub fn remove(&mut self, id: SongId) -> bool {
        let Some(slot) = self.find(id) else {
            return false;
        };
        let Some(node) = self.slots[slot].take() else {
            return false;
        };

        match node.prev.and_then(|p| self.node_mut(p)) {
            Some(prev) => prev.next = node.next,
            None => self.head = node.next,
        }
        match node.next.and_then(|n| self.node_mut(n)) {
            Some(next) => next.prev = node.prev,
            None => self.tail = node.prev,
        }
        if self.current == Some(slot) {
            log::debug!("Removed current song {}; cursor reset", id);
            self.current = None;
        }

        self.free.push(slot);
        self.len -= 1;
        true
    }

    /// Advance the cursor, wrapping from the tail (or from no cursor) to the head.
    pub fn next(&mut self) -> Option<SongId> {
        let following = self.current.and_then(|c| self.node(c)).and_then(|n| n.next);
        self.current = following.or(self.head);
        self.id_at(self.current)
    }

    /// Step the cursor back, wrapping from the head (or from no cursor) to the tail.
    pub fn prev(&mut self) -> Option<SongId> {
        let preceding = self.current.and_then(|c| self.node(c)).and_then(|n| n.prev);
        self.current = preceding.or(self.tail);
        self.id_at(self.current)
    }

    pub fn current(&self) -> Option<SongId> {
        self.id_at(self.current)
    }

    /// Point the cursor at the first node holding `id`.
    pub fn set_cursor(&mut self, id: SongId) -> bool {
        match self.find(id) {
            Some(slot) => {
                self.current = Some(slot);
                true
            }
            None => false,
        }
    }

    /// Drop the cursor; the next [`PlaybackSequence::next`] starts at the head.
    pub fn clear_cursor(&mut self) {
        self.current = None;
    }

    /// Ids from head to tail.
    pub fn ids(&self) -> Vec<SongId> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(node) = cursor.and_then(|s| self.node(s)) {
            out.push(node.id);
            cursor = node.next;
        }
        out
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Fisher–Yates shuffle using the thread-local RNG.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Fisher–Yates shuffle, then rebuild the list from the new order.
    /// The cursor lands on the new head.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut ids = self.ids();
        for i in (1..ids.len()).rev() {
            let j = rng.gen_range(0..=i);
            ids.swap(i, j);
        }

        self.clear();
        for id in ids {
            self.append(id);
        }
        log::debug!("Shuffled playback sequence ({} songs)", self.len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seq(ids: &[u64]) -> PlaybackSequence {
        let mut s = PlaybackSequence::new();
        for &id in ids {
            s.append(SongId(id));
        }
        s
    }

    fn ids(raw: &[u64]) -> Vec<SongId> {
        raw.iter().map(|&i| SongId(i)).collect()
    }

    #[test]
    fn test_first_append_sets_cursor() {
        let mut s = PlaybackSequence::new();
        assert_eq!(s.current(), None);
        s.append(SongId(1));
        assert_eq!(s.current(), Some(SongId(1)));
        s.append(SongId(2));
        assert_eq!(s.current(), Some(SongId(1)));
        assert_eq!(s.ids(), ids(&[1, 2]));
    }

    #[test]
    fn test_next_wraps_to_head() {
        let mut s = seq(&[1, 2, 3]);
        assert_eq!(s.next(), Some(SongId(2)));
        assert_eq!(s.next(), Some(SongId(3)));
        assert_eq!(s.next(), Some(SongId(1)));
        assert_eq!(s.current(), Some(SongId(1)));
    }

    #[test]
    fn test_prev_wraps_to_tail() {
        let mut s = seq(&[1, 2, 3]);
        assert_eq!(s.current(), Some(SongId(1)));
        assert_eq!(s.prev(), Some(SongId(3)));
        assert_eq!(s.prev(), Some(SongId(2)));
    }

    #[test]
    fn test_empty_sequence_navigation() {
        let mut s = PlaybackSequence::new();
        assert_eq!(s.next(), None);
        assert_eq!(s.prev(), None);
        assert_eq!(s.current(), None);
        assert!(!s.remove(SongId(1)));
    }

    #[test]
    fn test_remove_fixes_head_and_tail() {
        let mut s = seq(&[1, 2, 3, 4]);
        assert!(s.remove(SongId(1)));
        assert!(s.remove(SongId(4)));
        assert_eq!(s.ids(), ids(&[2, 3]));
        assert_eq!(s.len(), 2);

        s.append(SongId(5));
        assert_eq!(s.ids(), ids(&[2, 3, 5]));
        assert!(!s.remove(SongId(42)));
    }

    #[test]
    fn test_removing_current_resets_cursor_to_head_on_next() {
        let mut s = seq(&[1, 2, 3]);
        s.next();
        assert_eq!(s.current(), Some(SongId(2)));
        assert!(s.remove(SongId(2)));
        assert_eq!(s.current(), None);
        assert_eq!(s.next(), Some(SongId(1)));
    }

    #[test]
    fn test_removing_current_then_prev_goes_to_tail() {
        let mut s = seq(&[1, 2, 3]);
        assert!(s.remove(SongId(1)));
        assert_eq!(s.prev(), Some(SongId(3)));
    }

    #[test]
    fn test_remove_last_song_empties_everything() {
        let mut s = seq(&[7]);
        assert!(s.remove(SongId(7)));
        assert!(s.is_empty());
        assert_eq!(s.next(), None);
        s.append(SongId(8));
        assert_eq!(s.current(), Some(SongId(8)));
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let mut s = seq(&[1, 2, 3]);
        s.remove(SongId(2));
        s.append(SongId(4));
        assert_eq!(s.slots.len(), 3);
        assert_eq!(s.ids(), ids(&[1, 3, 4]));
        assert_eq!(s.prev(), Some(SongId(4)));
    }

    #[test]
    fn test_set_cursor() {
        let mut s = seq(&[1, 2, 3]);
        assert!(s.set_cursor(SongId(3)));
        assert_eq!(s.next(), Some(SongId(1)));
        assert!(!s.set_cursor(SongId(9)));
        assert_eq!(s.current(), Some(SongId(1)));
    }

    #[test]
    fn test_shuffle_is_permutation_with_cursor_at_head() {
        let mut s = seq(&[1, 2, 3, 4, 5, 6, 7, 8]);
        s.next();
        s.next();
        let mut rng = StdRng::seed_from_u64(7);
        s.shuffle_with(&mut rng);

        let shuffled = s.ids();
        let mut sorted = shuffled.clone();
        sorted.sort();
        assert_eq!(sorted, ids(&[1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(s.current(), Some(shuffled[0]));
        assert_eq!(s.len(), 8);

        // Links survive the rebuild in both directions
        let mut backwards = Vec::new();
        for _ in 0..8 {
            backwards.push(s.prev().unwrap());
        }
        backwards.reverse();
        assert_eq!(backwards, shuffled);
    }

    #[test]
    fn test_shuffle_is_deterministic_for_a_seed() {
        let mut a = seq(&[1, 2, 3, 4, 5]);
        let mut b = seq(&[1, 2, 3, 4, 5]);
        a.shuffle_with(&mut StdRng::seed_from_u64(99));
        b.shuffle_with(&mut StdRng::seed_from_u64(99));
        assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        let mut empty = PlaybackSequence::new();
        empty.shuffle();
        assert!(empty.is_empty());

        let mut one = seq(&[1]);
        one.shuffle();
        assert_eq!(one.ids(), ids(&[1]));
        assert_eq!(one.current(), Some(SongId(1)));
    }
}
