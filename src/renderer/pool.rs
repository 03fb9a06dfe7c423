//! Reusable buffer pools shared between pipeline workers.
//!
//! A pool is owned by whoever builds it and lent to the threads that need
//! it. Items are checked out through a `Pooled` guard and go back to the
//! pool when the guard drops, whichever way the holder exits.

use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

pub struct Pool<T> {
    items: Mutex<Vec<T>>,
    returned: Condvar,
    /// When set, an empty pool allocates instead of blocking.
    factory: Option<Factory<T>>,
}

impl<T> Pool<T> {
    /// A fixed set of items. `checkout` blocks while all of them are out.
    pub fn bounded(items: Vec<T>) -> Self {
        Pool {
            items: Mutex::new(items),
            returned: Condvar::new(),
            factory: None,
        }
    }

    /// An unbounded pool that creates items on demand and keeps every
    /// returned one for reuse.
    pub fn elastic(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Pool {
            items: Mutex::new(Vec::new()),
            returned: Condvar::new(),
            factory: Some(Box::new(factory)),
        }
    }

    pub fn checkout(&self) -> Pooled<'_, T> {
        let mut items = self.items.lock();
        let item = loop {
            if let Some(item) = items.pop() {
                break item;
            }
            if let Some(factory) = &self.factory {
                break factory();
            }
            self.returned.wait(&mut items);
        };
        Pooled {
            pool: self,
            item: Some(item),
        }
    }

    /// Items currently sitting in the pool.
    #[cfg(test)]
    fn idle(&self) -> usize {
        self.items.lock().len()
    }

    fn restore(&self, item: T) {
        self.items.lock().push(item);
        self.returned.notify_one();
    }
}

/// Exclusive hold on a pooled item.
pub struct Pooled<'a, T> {
    pool: &'a Pool<T>,
    item: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `Drop` takes the item out.
        self.item.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.restore(item);
        }
    }
}
