/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A simple, volatile, in-memory implementation of [`KVStore`].

use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::{Arc, Mutex, MutexGuard},
};

use super::pluggables::{KVCursor, KVError, KVGet, KVStore, Space};

type Spaces = HashMap<Space, BTreeMap<Vec<u8>, Vec<u8>>>;

/// An in-memory implementation of [`KVStore`].
///
/// Clones share the same underlying maps, so a clone kept aside observes every write made through the
/// original.
#[derive(Clone, Default)]
pub struct MemDB(Arc<Mutex<Spaces>>);

impl MemDB {
    /// Create a new, empty `MemDB`.
    pub fn new() -> MemDB {
        MemDB::default()
    }

    /// Get every key currently stored in `space`, in byte order.
    pub fn keys(&self, space: Space) -> Result<Vec<Vec<u8>>, KVError> {
        let spaces = self.lock(space)?;
        Ok(spaces
            .get(&space)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn lock(&self, space: Space) -> Result<MutexGuard<'_, Spaces>, KVError> {
        self.0
            .lock()
            .map_err(|_| KVError::new(space, "in-memory store lock poisoned"))
    }
}

impl KVStore for MemDB {
    type Cursor<'a> = MemCursor;

    fn put(&mut self, space: Space, key: &[u8], value: &[u8]) -> Result<(), KVError> {
        self.lock(space)?
            .entry(space)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, space: Space, key: &[u8]) -> Result<(), KVError> {
        if let Some(map) = self.lock(space)?.get_mut(&space) {
            map.remove(key);
        }
        Ok(())
    }

    fn cursor(&self, space: Space) -> MemCursor {
        MemCursor {
            db: self.clone(),
            space,
            position: None,
        }
    }
}

impl KVGet for MemDB {
    fn get(&self, space: Space, key: &[u8]) -> Result<Option<Vec<u8>>, KVError> {
        Ok(self
            .lock(space)?
            .get(&space)
            .and_then(|map| map.get(key))
            .cloned())
    }
}

/// Cursor over one space of a [`MemDB`].
///
/// The cursor takes the lock only for the duration of each movement, so other handles to the same
/// `MemDB` may be used freely while a cursor is alive.
pub struct MemCursor {
    db: MemDB,
    space: Space,
    position: Option<(Vec<u8>, Vec<u8>)>,
}

impl KVCursor for MemCursor {
    fn seek_last(&mut self) -> Result<(), KVError> {
        let spaces = self.db.lock(self.space)?;
        let last = spaces
            .get(&self.space)
            .and_then(|map| map.last_key_value())
            .map(|(key, value)| (key.clone(), value.clone()));
        drop(spaces);
        self.position = last;
        Ok(())
    }

    fn next(&mut self) -> Result<(), KVError> {
        let Some((current, _)) = &self.position else {
            return Ok(());
        };
        let spaces = self.db.lock(self.space)?;
        let next = spaces.get(&self.space).and_then(|map| {
            map.range::<[u8], _>((Bound::Excluded(current.as_slice()), Bound::Unbounded))
                .next()
                .map(|(key, value)| (key.clone(), value.clone()))
        });
        drop(spaces);
        self.position = next;
        Ok(())
    }

    fn prev(&mut self) -> Result<(), KVError> {
        let Some((current, _)) = &self.position else {
            return Ok(());
        };
        let spaces = self.db.lock(self.space)?;
        let prev = spaces.get(&self.space).and_then(|map| {
            map.range::<[u8], _>((Bound::Unbounded, Bound::Excluded(current.as_slice())))
                .next_back()
                .map(|(key, value)| (key.clone(), value.clone()))
        });
        drop(spaces);
        self.position = prev;
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.position.is_some()
    }

    fn key(&self) -> Option<&[u8]> {
        self.position.as_ref().map(|(key, _)| key.as_slice())
    }

    fn value(&self) -> Option<&[u8]> {
        self.position.as_ref().map(|(_, value)| value.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_walks_keys_in_byte_order_and_skips_other_spaces() {
        let mut db = MemDB::new();
        db.put(Space::SlotToHashes, &[0, 2], b"b").unwrap();
        db.put(Space::SlotToHashes, &[0, 1], b"a").unwrap();
        db.put(Space::SlotToHashes, &[0, 9], b"c").unwrap();
        db.put(Space::Header, &[0, 10], b"other").unwrap();

        let mut cursor = db.cursor(Space::SlotToHashes);
        assert!(!cursor.is_valid());

        cursor.seek_last().unwrap();
        assert_eq!(cursor.key(), Some(&[0u8, 9][..]));
        assert_eq!(cursor.value(), Some(&b"c"[..]));

        cursor.prev().unwrap();
        assert_eq!(cursor.key(), Some(&[0u8, 2][..]));
        cursor.prev().unwrap();
        assert_eq!(cursor.key(), Some(&[0u8, 1][..]));
        cursor.prev().unwrap();
        assert!(!cursor.is_valid());

        cursor.seek_last().unwrap();
        cursor.next().unwrap();
        assert!(!cursor.is_valid());
    }

    #[test]
    fn clones_share_data() {
        let mut db = MemDB::new();
        let observer = db.clone();
        db.put(Space::Body, b"k", b"v").unwrap();
        assert_eq!(observer.get(Space::Body, b"k").unwrap(), Some(b"v".to_vec()));
        db.remove(Space::Body, b"k").unwrap();
        assert!(!observer.contains(Space::Body, b"k").unwrap());
    }
}
