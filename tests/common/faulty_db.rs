//! A [`KVStore`] that wraps [`MemDB`] and fails writes on demand.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use lean_blockchain::block_store::{
    in_memory::{MemCursor, MemDB},
    pluggables::{KVError, KVGet, KVStore, Space},
};

#[derive(Clone, Default)]
pub(crate) struct FaultyDB {
    inner: MemDB,
    failing_puts: Arc<Mutex<HashSet<Space>>>,
    // Number of removes that still succeed. `None` means no limit.
    remaining_removes: Arc<Mutex<Option<usize>>>,
}

impl FaultyDB {
    pub(crate) fn new(inner: MemDB) -> FaultyDB {
        FaultyDB {
            inner,
            ..Default::default()
        }
    }

    /// Make every subsequent put into `space` fail.
    pub(crate) fn fail_puts_into(&self, space: Space) {
        self.failing_puts.lock().unwrap().insert(space);
    }

    /// Make every subsequent remove fail.
    pub(crate) fn fail_removes(&self) {
        self.fail_removes_after(0);
    }

    /// Let the next `count` removes succeed and make every remove after them fail.
    pub(crate) fn fail_removes_after(&self, count: usize) {
        *self.remaining_removes.lock().unwrap() = Some(count);
    }
}

impl KVStore for FaultyDB {
    type Cursor<'a> = MemCursor;

    fn put(&mut self, space: Space, key: &[u8], value: &[u8]) -> Result<(), KVError> {
        if self.failing_puts.lock().unwrap().contains(&space) {
            return Err(KVError::new(space, "injected put failure"));
        }
        self.inner.put(space, key, value)
    }

    fn remove(&mut self, space: Space, key: &[u8]) -> Result<(), KVError> {
        if let Some(remaining) = self.remaining_removes.lock().unwrap().as_mut() {
            if *remaining == 0 {
                return Err(KVError::new(space, "injected remove failure"));
            }
            *remaining -= 1;
        }
        self.inner.remove(space, key)
    }

    fn cursor(&self, space: Space) -> Self::Cursor<'_> {
        self.inner.cursor(space)
    }
}

impl KVGet for FaultyDB {
    fn get(&self, space: Space, key: &[u8]) -> Result<Option<Vec<u8>>, KVError> {
        self.inner.get(space, key)
    }
}
