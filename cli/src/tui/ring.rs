//! # Log Ring Buffer
//!
//! File: cli/src/tui/ring.rs
//!
//! Fixed-capacity circular buffer of formatted log lines. When full, each
//! append overwrites the oldest line and bumps the `dropped` counter, which
//! the viewer turns into its truncation warning.
//!
//! All methods take one short exclusive lock, so concurrent producers always
//! leave `len() + dropped() == total appends` (until the next `clear`).
//!
use crate::core::config::DEFAULT_BUFFER_CAPACITY;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Slots {
    lines: Vec<Option<String>>,
    head: usize,
    count: usize,
    dropped: u64,
}

impl Slots {
    fn push(&mut self, line: String) {
        let capacity = self.lines.len();
        if self.count < capacity {
            let idx = (self.head + self.count) % capacity;
            self.lines[idx] = Some(line);
            self.count += 1;
        } else {
            self.lines[self.head] = Some(line);
            self.head = (self.head + 1) % capacity;
            self.dropped += 1;
        }
    }
}

#[derive(Debug)]
pub struct RingBuffer {
    inner: Mutex<Slots>,
}

impl RingBuffer {
    /// A buffer holding at most `capacity` lines; `0` means the default (5000).
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_BUFFER_CAPACITY
        } else {
            capacity
        };
        Self {
            inner: Mutex::new(Slots {
                lines: vec![None; capacity],
                head: 0,
                count: 0,
                dropped: 0,
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, line: impl Into<String>) {
        self.slots().push(line.into());
    }

    /// Appends all `lines` under a single lock.
    pub fn append_batch<I>(&self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut slots = self.slots();
        for line in lines {
            slots.push(line.into());
        }
    }

    /// Copy of the current contents, oldest first.
    pub fn lines(&self) -> Vec<String> {
        let slots = self.slots();
        let capacity = slots.lines.len();
        (0..slots.count)
            .filter_map(|i| slots.lines[(slots.head + i) % capacity].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots().lines.len()
    }

    /// Lines overwritten since creation or the last `clear`.
    pub fn dropped(&self) -> u64 {
        self.slots().dropped
    }

    pub fn clear(&self) {
        let mut slots = self.slots();
        slots.lines.iter_mut().for_each(|slot| *slot = None);
        slots.head = 0;
        slots.count = 0;
        slots.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_overflow_keeps_newest() {
        let ring = RingBuffer::new(5);
        for line in ["a", "b", "c", "d", "e", "f", "g"] {
            ring.append(line);
        }
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.dropped(), 2);
        assert_eq!(ring.lines(), vec!["c", "d", "e", "f", "g"]);
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        let ring = RingBuffer::new(0);
        assert_eq!(ring.capacity(), 5000);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let ring = RingBuffer::new(3);
        ring.append_batch(["1", "2", "3", "4"]);
        ring.clear();
        ring.clear();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.dropped(), 0);
        assert!(ring.lines().is_empty());
        ring.append("x");
        assert_eq!(ring.lines(), vec!["x"]);
    }

    #[test]
    fn test_batch_matches_sequential_appends() {
        let batched = RingBuffer::new(4);
        let single = RingBuffer::new(4);
        for ring in [&batched, &single] {
            ring.append("seed");
            ring.clear();
        }
        let lines: Vec<String> = (0..9).map(|i| format!("line {}", i)).collect();
        batched.append_batch(lines.clone());
        for line in &lines {
            single.append(line.as_str());
        }
        assert_eq!(batched.lines(), single.lines());
        assert_eq!(batched.dropped(), single.dropped());
    }

    #[test]
    fn test_concurrent_producers() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 1000;
        let ring = Arc::new(RingBuffer::new(500));
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        if i % 10 == 0 {
                            ring.append_batch([format!("{}-{}", p, i)]);
                        } else {
                            ring.append(format!("{}-{}", p, i));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let total = (PRODUCERS * PER_PRODUCER) as u64;
        assert_eq!(ring.len(), 500);
        assert_eq!(ring.dropped(), total - 500);
        assert_eq!(ring.lines().len(), ring.len());
    }

    #[test]
    fn test_lines_preserve_per_producer_order() {
        let ring = RingBuffer::new(100);
        for i in 0..250 {
            ring.append(i.to_string());
        }
        let lines = ring.lines();
        let expected: Vec<String> = (150..250).map(|i| i.to_string()).collect();
        assert_eq!(lines, expected);
    }
}
