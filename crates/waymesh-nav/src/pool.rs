//! Fixed pool of query contexts.
//!
//! Path tasks rent a [`QueryContext`] for their whole lifetime and give it
//! back by dropping the handle. Exhaustion is not an error: `acquire`
//! returns `None` and the caller retries on a later tick.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::query::QueryContext;

type Shelf = Rc<RefCell<Vec<QueryContext>>>;

pub struct PathQueryPool {
    shelf: Shelf,
    capacity: usize,
}

impl PathQueryPool {
    pub fn new(capacity: usize, node_budget: usize) -> Self {
        let contexts = (0..capacity).map(|_| QueryContext::new(node_budget)).collect();
        Self {
            shelf: Rc::new(RefCell::new(contexts)),
            capacity,
        }
    }

    /// Rent a context. `None` means every context is out; retry later.
    pub fn acquire(&self) -> Option<QueryHandle> {
        let context = self.shelf.borrow_mut().pop()?;
        Some(QueryHandle {
            context,
            shelf: Rc::clone(&self.shelf),
        })
    }

    pub fn available(&self) -> usize {
        self.shelf.borrow().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Owning handle to a rented [`QueryContext`]; dropping it returns the
/// context (reset) to the pool.
pub struct QueryHandle {
    context: QueryContext,
    shelf: Shelf,
}

impl Deref for QueryHandle {
    type Target = QueryContext;
    fn deref(&self) -> &QueryContext {
        &self.context
    }
}

impl DerefMut for QueryHandle {
    fn deref_mut(&mut self) -> &mut QueryContext {
        &mut self.context
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        let mut context = std::mem::replace(&mut self.context, QueryContext::new(0));
        context.reset();
        self.shelf.borrow_mut().push(context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_hands_out_up_to_capacity() {
        let pool = PathQueryPool::new(2, 16);
        let a = pool.acquire();
        let b = pool.acquire();
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn dropping_a_handle_returns_the_context() {
        let pool = PathQueryPool::new(1, 16);
        {
            let handle = pool.acquire();
            assert!(handle.is_some());
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn returned_contexts_keep_their_budget() {
        let pool = PathQueryPool::new(1, 64);
        {
            let _handle = pool.acquire();
        }
        let handle = pool.acquire().map(|h| h.node_budget());
        assert_eq!(handle, Some(64));
    }
}
