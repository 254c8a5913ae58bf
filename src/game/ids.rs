//! Reusable player-id pool
//!
//! Ids must fit the 8-bit wire field, so each room hands out small integers
//! from a bounded free list and takes them back on disconnect. The list is
//! a LIFO stack preloaded so the lowest ids are handed out first.

/// Bounded pool of reusable small-integer ids
#[derive(Debug)]
pub struct IdentityPool {
    free: Vec<u8>,
}

impl IdentityPool {
    /// Pool over ids `0..capacity`
    pub fn new(capacity: u8) -> Self {
        Self {
            free: (0..capacity).rev().collect(),
        }
    }

    /// Take the next free id; `None` when the pool is exhausted
    pub fn acquire(&mut self) -> Option<u8> {
        self.free.pop()
    }

    /// Return an id for reuse. The id must have come from `acquire`.
    pub fn release(&mut self, id: u8) {
        debug_assert!(!self.free.contains(&id), "double release of id {id}");
        self.free.push(id);
    }

    /// Free slots remaining
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_ids_first() {
        let mut pool = IdentityPool::new(4);
        assert_eq!(pool.acquire(), Some(0));
        assert_eq!(pool.acquire(), Some(1));
        assert_eq!(pool.acquire(), Some(2));
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = IdentityPool::new(2);
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_some());
        assert_eq!(pool.acquire(), None);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_is_lifo() {
        let mut pool = IdentityPool::new(8);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a);
        // the most recently released id comes back first
        assert_eq!(pool.acquire(), Some(a));
        pool.release(b);
        assert_eq!(pool.acquire(), Some(b));
    }
}
