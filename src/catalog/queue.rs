use super::song::SongId;

/// Recently played entries kept when none is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
struct Node {
    id: SongId,
    next: Option<usize>,
}

/// Singly linked FIFO of song ids with removal from the middle.
///
/// Nodes live in a slot vector (freed slots are reused); `front`, `rear` and
/// `size` are kept in step with the links on every operation.
#[derive(Debug, Clone, Default)]
pub struct SongQueue {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    front: Option<usize>,
    rear: Option<usize>,
    size: usize,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn node(&self, slot: usize) -> Option<&Node> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn enqueue(&mut self, id: SongId) {
        let node = Node { id, next: None };
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

        match self.rear.and_then(|r| self.node_mut(r)) {
            Some(rear) => rear.next = Some(slot),
            None => self.front = Some(slot),
        }
        self.rear = Some(slot);
        self.size += 1;
    }

    pub fn dequeue(&mut self) -> Option<SongId> {
        let slot = self.front?;
        let node = self.slots[slot].take()?;
        self.front = node.next;
        if self.front.is_none() {
            self.rear = None;
        }
        self.free.push(slot);
        self.size -= 1;
        Some(node.id)
    }

    pub fn peek(&self) -> Option<SongId> {
        self.front.and_then(|f| self.node(f)).map(|n| n.id)
    }

    /// Ids front to rear.
    pub fn ids(&self) -> Vec<SongId> {
        let mut out = Vec::with_capacity(self.size);
        let mut cursor = self.front;
        while let Some(node) = cursor.and_then(|s| self.node(s)) {
            out.push(node.id);
            cursor = node.next;
        }
        out
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Unlink the first entry for `id`. Returns whether one was found.
    pub fn remove(&mut self, id: SongId) -> bool {
        if self.peek() == Some(id) {
            self.dequeue();
            return true;
        }

        let mut prev = self.front;
        while let Some(prev_slot) = prev {
            let Some(slot) = self.node(prev_slot).and_then(|n| n.next) else {
                return false;
            };
            let Some(node) = self.node(slot) else {
                return false;
            };
            if node.id == id {
                let after = node.next;
                if let Some(p) = self.node_mut(prev_slot) {
                    p.next = after;
                }
                if self.rear == Some(slot) {
                    self.rear = Some(prev_slot);
                }
                self.slots[slot] = None;
                self.free.push(slot);
                self.size -= 1;
                return true;
            }
            prev = Some(slot);
        }
        false
    }

    /// Unlink every entry for `id`. Returns how many were removed.
    pub fn remove_all(&mut self, id: SongId) -> usize {
        let mut removed = 0;
        while self.remove(id) {
            removed += 1;
        }
        removed
    }
}

/// Bounded FIFO of recently played songs; the oldest entries are evicted
/// once more than `limit` are held.
#[derive(Debug, Clone)]
pub struct HistoryQueue {
    queue: SongQueue,
    limit: usize,
}

impl HistoryQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: SongQueue::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Append a play, then evict from the front until within the limit.
    pub fn record(&mut self, id: SongId) {
        self.queue.enqueue(id);
        while self.queue.len() > self.limit {
            self.queue.dequeue();
        }
    }

    /// Oldest first.
    pub fn ids(&self) -> Vec<SongId> {
        self.queue.ids()
    }

    pub fn remove_all(&mut self, id: SongId) -> usize {
        self.queue.remove_all(id)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for HistoryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
