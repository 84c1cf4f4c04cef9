//! A small concurrent object pool for match-time scratch buffers.
//!
//! Matching needs somewhere to accumulate captured substrings before the
//! whole path is known to match. Those buffers are pooled so the hot path
//! stays allocation-free; acquisition hands out an RAII guard that resets
//! and returns the value on drop, on every exit path.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

pub(crate) struct Pool<T> {
    items: Mutex<Vec<T>>,
    make: Box<dyn Fn() -> T + Send + Sync>,
    reset: Box<dyn Fn(&mut T) + Send + Sync>,
}

impl<T> Pool<T> {
    pub(crate) fn new(
        make: impl Fn() -> T + Send + Sync + 'static,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        Self { items: Mutex::new(Vec::new()), make: Box::new(make), reset: Box::new(reset) }
    }

    /// Takes a value from the pool, or makes a fresh one when the pool is
    /// empty or its lock is poisoned. The pool is an optimization, never a
    /// correctness dependency.
    pub(crate) fn acquire(&self) -> Pooled<'_, T> {
        let item = match self.items.lock() {
            Ok(mut items) => items.pop().unwrap_or_else(|| (self.make)()),
            Err(_) => (self.make)(),
        };
        Pooled { pool: self, item: Some(item) }
    }
}

pub(crate) struct Pooled<'pool, T> {
    pool: &'pool Pool<T>,
    item: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().unwrap()
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().unwrap()
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(mut item) = self.item.take() {
            (self.pool.reset)(&mut item);
            if let Ok(mut items) = self.pool.items.lock() {
                items.push(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Pool;

    #[test]
    fn test_acquire_release_reuse() {
        let pool: Pool<Vec<String>> = Pool::new(|| Vec::with_capacity(4), Vec::clear);

        {
            let mut buf = pool.acquire();
            buf.push("hello".to_string());
            assert_eq!(buf.len(), 1);
        }

        // the released buffer comes back cleared, capacity intact
        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 4);
    }

    #[test]
    fn test_early_exit_still_releases() {
        let pool: Pool<Vec<String>> = Pool::new(Vec::new, Vec::clear);

        fn bails_out(pool: &Pool<Vec<String>>) -> Option<()> {
            let mut buf = pool.acquire();
            buf.push("partial".to_string());
            None?;
            Some(())
        }

        assert_eq!(bails_out(&pool), None);
        assert!(pool.acquire().is_empty());
    }

    #[test]
    fn test_concurrent_acquire() {
        let pool: Arc<Pool<Vec<String>>> = Arc::new(Pool::new(Vec::new, Vec::clear));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        buf.push(format!("task-{i}"));
                        assert_eq!(buf.len(), 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
