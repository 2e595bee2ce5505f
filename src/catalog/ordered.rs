//! Alphabetical index over song titles.
//!
//! A plain (unbalanced) binary search tree keyed by the lowercased title.
//! Equal titles go to the right subtree, so an in-order walk keeps songs with
//! the same title in insertion order. Inserting titles in sorted order
//! degrades the tree to a list (depth O(n)). Walks and teardown are
//! iterative, so such a tree costs time, not stack.

use std::cmp::Ordering;

use super::song::SongId;

struct Node {
    key: String,
    id: SongId,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Binary search tree of song ids ordered by case-insensitive title.
#[derive(Default)]
pub struct OrderedIndex {
    root: Option<Box<Node>>,
    len: usize,
}

/// Sort key for a title.
pub fn title_key(title: &str) -> String {
    title.to_lowercase()
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Insert `id` under `title`. No rebalancing.
    pub fn insert(&mut self, id: SongId, title: &str) {
        let key = title_key(title);
        let mut slot = &mut self.root;
        while let Some(node) = slot {
            slot = if key < node.key {
                &mut node.left
            } else {
                &mut node.right
            };
        }
        *slot = Some(Box::new(Node {
            key,
            id,
            left: None,
            right: None,
        }));
        self.len += 1;
    }

    /// Every song whose title contains `term`, case-insensitively.
    ///
    /// Substring matches are not ordered by the tree, so this visits every
    /// node (node, then left subtree, then right subtree).
    pub fn search(&self, term: &str) -> Vec<SongId> {
        let needle = term.to_lowercase();
        let mut found = Vec::new();
        let mut stack: Vec<&Node> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            if node.key.contains(&needle) {
                found.push(node.id);
            }
            if let Some(right) = node.right.as_deref() {
                stack.push(right);
            }
            if let Some(left) = node.left.as_deref() {
                stack.push(left);
            }
        }
        found
    }

    /// All ids in ascending title order.
    pub fn in_order(&self) -> Vec<SongId> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<&Node> = Vec::new();
        let mut cursor = self.root.as_deref();
        loop {
            while let Some(node) = cursor {
                stack.push(node);
                cursor = node.left.as_deref();
            }
            let Some(node) = stack.pop() else { break };
            out.push(node.id);
            cursor = node.right.as_deref();
        }
        out
    }

    /// Songs whose lowercased first title character lies in `[start, end]`.
    ///
    /// Subtrees that cannot hold such a title are skipped: the left side only
    /// when the node's first character is below `start`, the right side only
    /// when it is above `end`. Empty titles never match.
    pub fn by_range(&self, start: char, end: char) -> Vec<SongId> {
        let (start, end) = (fold_char(start), fold_char(end));
        let mut found = Vec::new();
        let mut stack: Vec<&Node> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            let first = node.key.chars().next();
            let at_or_after_start = first.is_some_and(|c| c >= start);
            let at_or_before_end = first.is_none_or(|c| c <= end);

            if at_or_after_start && at_or_before_end {
                found.push(node.id);
            }
            if at_or_before_end {
                if let Some(right) = node.right.as_deref() {
                    stack.push(right);
                }
            }
            if at_or_after_start {
                if let Some(left) = node.left.as_deref() {
                    stack.push(left);
                }
            }
        }
        found
    }

    /// Remove the node holding `id` (filed under `title`).
    ///
    /// A node with two children is replaced by its in-order successor, so the
    /// in-order position of every remaining song is unchanged.
    pub fn remove(&mut self, id: SongId, title: &str) -> bool {
        let key = title_key(title);
        let Some(path) = self.path_to(id, &key) else {
            return false;
        };

        let mut slot = &mut self.root;
        for side in path {
            let Some(node) = slot else { return false };
            slot = match side {
                Side::Left => &mut node.left,
                Side::Right => &mut node.right,
            };
        }

        let Some(mut removed) = slot.take() else {
            return false;
        };
        *slot = match (removed.left.take(), removed.right.take()) {
            (None, None) => None,
            (Some(child), None) | (None, Some(child)) => Some(child),
            (Some(left), Some(right)) => {
                let mut right = Some(right);
                let mut successor = take_min(&mut right);
                if let Some(succ) = successor.as_mut() {
                    succ.left = Some(left);
                    succ.right = right;
                }
                successor
            }
        };
        self.len -= 1;
        true
    }

    /// Directions from the root to the node with `id`.
    ///
    /// Equal keys normally sit to the right, but successor replacement can
    /// leave one on the left, so both sides are searched on a key match.
    fn path_to(&self, id: SongId, key: &str) -> Option<Vec<Side>> {
        let mut stack: Vec<(&Node, Vec<Side>)> = Vec::new();
        if let Some(root) = self.root.as_deref() {
            stack.push((root, Vec::new()));
        }
        while let Some((node, path)) = stack.pop() {
            let step = |side: Side| {
                let mut next = path.clone();
                next.push(side);
                next
            };
            match key.cmp(node.key.as_str()) {
                Ordering::Less => {
                    if let Some(left) = node.left.as_deref() {
                        stack.push((left, step(Side::Left)));
                    }
                }
                Ordering::Greater => {
                    if let Some(right) = node.right.as_deref() {
                        stack.push((right, step(Side::Right)));
                    }
                }
                Ordering::Equal => {
                    if node.id == id {
                        return Some(path);
                    }
                    if let Some(left) = node.left.as_deref() {
                        stack.push((left, step(Side::Left)));
                    }
                    if let Some(right) = node.right.as_deref() {
                        stack.push((right, step(Side::Right)));
                    }
                }
            }
        }
        None
    }
}

impl Drop for OrderedIndex {
    fn drop(&mut self) {
        let mut stack: Vec<Box<Node>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

/// Detach the leftmost node of a subtree, splicing its right child into its place.
fn take_min(slot: &mut Option<Box<Node>>) -> Option<Box<Node>> {
    let mut slot = slot;
    while slot.as_ref().is_some_and(|node| node.left.is_some()) {
        slot = &mut slot.as_mut()?.left;
    }
    let mut min = slot.take()?;
    *slot = min.right.take();
    Some(min)
}
