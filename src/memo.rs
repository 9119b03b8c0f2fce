// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Identity-keyed memo table of the pickler.
//!
//! Open addressing over a prime-sized table.  Probing steps by a fifth of
//! the table size; since the size is prime, every slot is visited.  Slots
//! match only if both the identity key and the stored object are the same.

use log::trace;

use crate::error::{Error, ErrorCode, Result};
use crate::object::ObjRef;

const PRIMES: [usize; 25] = [
    13, 61, 251, 1021, 4093, 5987, 9551, 15683, 19609, 31397, 65521, 131071, 262139,
    524287, 1048573, 2097143, 4194301, 8388593, 16777213, 33554393, 67108859,
    134217689, 268435399, 536870909, 1073741789,
];

#[derive(Clone, Copy, Debug)]
struct Entry<T> {
    key: u32,
    position: u32,
    value: T,
}

#[derive(Clone, Debug)]
pub struct MemoTable<T = ObjRef> {
    slots: Vec<Option<Entry<T>>>,
    filled: usize,
}

impl<T: Copy + PartialEq> Default for MemoTable<T> {
    fn default() -> Self {
        MemoTable::new()
    }
}

impl<T: Copy + PartialEq> MemoTable<T> {
    pub fn new() -> MemoTable<T> {
        MemoTable::with_capacity(4)
    }

    pub fn with_capacity(capacity: usize) -> MemoTable<T> {
        let size = next_prime(capacity).unwrap_or(PRIMES[PRIMES.len() - 1]);
        MemoTable { slots: vec![None; size], filled: 0 }
    }

    /// Number of stored entries.
    pub fn size(&self) -> usize {
        self.filled
    }

    /// Number of slots of the underlying table.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Record `value` under `key` with the given memo position.  An existing
    /// entry for the same object gets the new position.
    pub fn put(&mut self, key: u32, position: u32, value: T) -> Result<()> {
        if 2 * (self.filled + 1) > self.slots.len() {
            self.resize(self.slots.len() + 1)?;
        }
        let index = self.probe(key, value);
        if self.slots[index].is_none() {
            self.filled += 1;
        }
        self.slots[index] = Some(Entry { key, position, value });
        Ok(())
    }

    /// Memo position of `value`, if it was stored.
    pub fn find_position(&self, key: u32, value: T) -> Option<u32> {
        let index = self.probe(key, value);
        self.slots[index].map(|e| e.position)
    }

    /// The stored object itself, if present.
    pub fn find_value(&self, key: u32, value: T) -> Option<T> {
        let index = self.probe(key, value);
        self.slots[index].map(|e| e.value)
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.filled = 0;
    }

    /// Slot holding the entry for (key, value), or the free slot where it
    /// would go.  The table is never full, so this terminates.
    fn probe(&self, key: u32, value: T) -> usize {
        let len = self.slots.len();
        let step = (len / 5).max(1);
        let mut index = (key & 0x7fff_ffff) as usize % len;
        loop {
            match self.slots[index] {
                None => return index,
                Some(ref e) if e.key == key && e.value == value => return index,
                Some(_) => index = (index + step) % len,
            }
        }
    }

    fn resize(&mut self, min_size: usize) -> Result<()> {
        let size = next_prime(min_size).ok_or(Error::Pickle(ErrorCode::MemoTooLarge(min_size)))?;
        trace!("memo table resize: {} -> {} slots", self.slots.len(), size);
        let old = std::mem::replace(&mut self.slots, vec![None; size]);
        for entry in old.into_iter().flatten() {
            let index = self.probe(entry.key, entry.value);
            self.slots[index] = Some(entry);
        }
        Ok(())
    }
}

fn next_prime(n: usize) -> Option<usize> {
    PRIMES.iter().cloned().find(|&p| p >= n)
}
