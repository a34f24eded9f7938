//! Bounded session id allocation.

use std::collections::BTreeSet;

use matchloop_protocol::SessionId;

/// Hands out ids from `[1, max]`, always the lowest one free.
///
/// Released ids are reused before fresh ones, so after
/// `allocate() == 1`, `allocate() == 2`, `release(1)`, the next
/// `allocate()` is `1` again.
#[derive(Debug, Clone)]
pub struct IdPool {
    max: u16,
    /// Lowest id never handed out.
    next: u32,
    released: BTreeSet<u16>,
}

impl IdPool {
    /// A pool over `[1, max]`. `max == 0` yields an empty pool.
    pub fn new(max: u16) -> Self {
        Self {
            max,
            next: 1,
            released: BTreeSet::new(),
        }
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    /// Takes the lowest free id, or `None` if all are in use.
    pub fn allocate(&mut self) -> Option<SessionId> {
        if let Some(id) = self.released.pop_first() {
            return Some(SessionId(id));
        }
        if self.next > u32::from(self.max) {
            return None;
        }
        let id = self.next as u16;
        self.next += 1;
        Some(SessionId(id))
    }

    /// Returns an id to the pool. Ids that are not currently allocated
    /// are ignored; returns whether the id was accepted.
    pub fn release(&mut self, id: SessionId) -> bool {
        if !self.is_allocated(id) {
            return false;
        }
        if u32::from(id.0) + 1 == self.next {
            // Shrink the fresh range instead of growing the free set.
            self.next -= 1;
            while self.next > 1 && self.released.remove(&((self.next - 1) as u16)) {
                self.next -= 1;
            }
            return true;
        }
        self.released.insert(id.0)
    }

    pub fn is_allocated(&self, id: SessionId) -> bool {
        id.0 >= 1 && u32::from(id.0) < self.next && !self.released.contains(&id.0)
    }

    /// Number of ids currently handed out.
    pub fn in_use(&self) -> usize {
        (self.next - 1) as usize - self.released.len()
    }

    pub fn available(&self) -> usize {
        usize::from(self.max) - self.in_use()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_sequential_from_one() {
        let mut pool = IdPool::new(4);
        assert_eq!(pool.allocate(), Some(SessionId(1)));
        assert_eq!(pool.allocate(), Some(SessionId(2)));
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn test_released_id_is_reused_first() {
        let mut pool = IdPool::new(4);
        pool.allocate();
        pool.allocate();
        assert!(pool.release(SessionId(1)));
        assert_eq!(pool.allocate(), Some(SessionId(1)));
        assert_eq!(pool.allocate(), Some(SessionId(3)));
    }

    #[test]
    fn test_lowest_released_wins() {
        let mut pool = IdPool::new(8);
        for _ in 0..5 {
            pool.allocate();
        }
        pool.release(SessionId(4));
        pool.release(SessionId(2));
        assert_eq!(pool.allocate(), Some(SessionId(2)));
        assert_eq!(pool.allocate(), Some(SessionId(4)));
        assert_eq!(pool.allocate(), Some(SessionId(6)));
    }

    #[test]
    fn test_exhaustion_and_recovery() {
        let mut pool = IdPool::new(2);
        pool.allocate();
        pool.allocate();
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.available(), 0);

        pool.release(SessionId(2));
        assert_eq!(pool.allocate(), Some(SessionId(2)));
    }

    #[test]
    fn test_release_of_top_id_shrinks_range() {
        let mut pool = IdPool::new(8);
        for _ in 0..3 {
            pool.allocate();
        }
        pool.release(SessionId(2));
        pool.release(SessionId(3));

        assert_eq!(pool.in_use(), 1);
        assert!(pool.is_allocated(SessionId(1)));
        assert_eq!(pool.allocate(), Some(SessionId(2)));
        assert_eq!(pool.allocate(), Some(SessionId(3)));
    }

    #[test]
    fn test_release_ignores_unknown_and_double_release() {
        let mut pool = IdPool::new(4);
        pool.allocate();
        assert!(!pool.release(SessionId(0)));
        assert!(!pool.release(SessionId(3)));
        assert!(pool.release(SessionId(1)));
        assert!(!pool.release(SessionId(1)));
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_full_range_at_max_u16() {
        let mut pool = IdPool::new(u16::MAX);
        pool.next = u32::from(u16::MAX);
        assert_eq!(pool.allocate(), Some(SessionId(u16::MAX)));
        assert_eq!(pool.allocate(), None);
    }

    #[test]
    fn test_empty_pool() {
        let mut pool = IdPool::new(0);
        assert_eq!(pool.allocate(), None);
    }
}
