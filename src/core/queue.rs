//! core/queue.rs
//! Play-next FIFO. Entries point at streams that live in the playlist.

use std::collections::VecDeque;
use std::rc::Rc;

use super::stream::{Stream, StreamRef};

#[derive(Default)]
pub struct Queue {
    pending: VecDeque<StreamRef>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append; returns the new queue index.
    pub fn push(&mut self, stream: StreamRef) -> usize {
        self.pending.push_back(stream);
        self.pending.len() - 1
    }

    pub fn remove(&mut self, queue_pos: usize) -> Option<StreamRef> {
        self.pending.remove(queue_pos)
    }

    pub fn peek(&self) -> Option<&StreamRef> {
        self.pending.front()
    }

    pub fn get(&self, queue_pos: usize) -> Option<&StreamRef> {
        self.pending.get(queue_pos)
    }

    pub fn position_of(&self, stream: &Stream) -> Option<usize> {
        self.pending.iter().position(|s| s.id() == stream.id())
    }

    /// Drop every entry for `stream`. Returns the queue indexes removed, as
    /// they were before removal.
    pub fn purge(&mut self, stream: &Stream) -> Vec<usize> {
        let removed: Vec<usize> = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.id() == stream.id())
            .map(|(i, _)| i)
            .collect();

        self.pending.retain(|s| s.id() != stream.id());
        removed
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamRef> {
        self.pending.iter()
    }

    pub fn contains(&self, stream: &StreamRef) -> bool {
        self.pending.iter().any(|s| Rc::ptr_eq(s, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(name: &str) -> StreamRef {
        Stream::new(format!("file:///{name}.mp3")).unwrap().shared()
    }

    #[test]
    fn fifo_order() {
        let mut q = Queue::new();
        let a = stream("a");
        let b = stream("b");

        assert_eq!(q.push(Rc::clone(&a)), 0);
        assert_eq!(q.push(Rc::clone(&b)), 1);
        assert!(Rc::ptr_eq(q.peek().unwrap(), &a));

        let first = q.remove(0).unwrap();
        assert!(Rc::ptr_eq(&first, &a));
        assert!(Rc::ptr_eq(q.peek().unwrap(), &b));
    }

    #[test]
    fn invalid_dequeue_is_noop() {
        let mut q = Queue::new();
        q.push(stream("a"));
        assert!(q.remove(3).is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn purge_drops_all_entries_of_a_stream() {
        let mut q = Queue::new();
        let a = stream("a");
        let b = stream("b");
        q.push(Rc::clone(&a));
        q.push(Rc::clone(&b));
        q.push(Rc::clone(&a));

        assert_eq!(q.purge(&a), vec![0, 2]);
        assert_eq!(q.len(), 1);
        assert!(!q.contains(&a));
        assert_eq!(q.position_of(&b), Some(0));
    }
}
