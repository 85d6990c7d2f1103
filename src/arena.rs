//! Fixed-block string arena.
//!
//! Every label, symbolic operand, comment fragment and `.DB`/`.DW` literal of a program lives in
//! one of the slots of a [StringArena]. A slot holds at most [SLOT_SIZE] bytes and is addressed by a
//! small integer [Handle]. Slot 0 is reserved: it is never handed out and reads back as the empty
//! string, which the line printer uses as an indentation filler.
//!
//! # Complexity
//!
//! Allocation probes round-robin from the slot after the previous allocation, so it is `O(N)` in
//! the worst case (a nearly full arena) and amortized `O(1)` for sparse churn. Freeing is `O(1)`.

use std::fmt;
use std::num::NonZeroU16;

/// Length of a single slot in bytes.
pub const SLOT_SIZE: usize = 8;

/// Largest blob accepted by [StringArena::alloc_raw]. One byte of the slot stores the high bits of
/// the payload, and a single header byte can only describe eight of them.
pub const MAX_RAW_SIZE: usize = if SLOT_SIZE - 1 < 8 { SLOT_SIZE - 1 } else { 8 };

/// Default number of slots, including the reserved slot 0.
pub const DEFAULT_SLOTS: usize = 64;

/// Largest arena: every slot index must fit a [Handle].
pub const MAX_SLOTS: usize = u16::max_value() as usize + 1;

/// Opaque reference to an allocated slot. A handle is never 0; "no string" is `Option<Handle>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU16);

impl Handle {
    /// The slot number of this handle, as shown in maps and dumps.
    pub fn index(self) -> usize {
        self.0.get() as usize
    }

    pub(crate) fn from_slot(index: usize) -> Option<Handle> {
        if index > u16::max_value() as usize {
            return None;
        }

        NonZeroU16::new(index as u16).map(Handle)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X}", self.0.get())
    }
}

/// Reasons why the arena refused to store a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// Nothing to store.
    Empty,

    /// The value does not fit in a slot.
    TooLong {
        /// Length of the rejected value.
        len: usize,
        /// Largest accepted length.
        max: usize,
    },

    /// Text contained a `00` byte, which marks free slots and string ends.
    ZeroByte,

    /// Every slot is in use.
    Exhausted,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArenaError::Empty => write!(f, "empty string"),
            ArenaError::TooLong { len, max } => write!(f, "too long ({} > {})", len, max),
            ArenaError::ZeroByte => write!(f, "string contains a 00 byte"),
            ArenaError::Exhausted => write!(f, "out of string memory"),
        }
    }
}

/// The slot allocator. See the [module documentation](self).
#[derive(Clone)]
pub struct StringArena {
    slots: Vec<[u8; SLOT_SIZE]>,
    rover: usize,
}

impl Default for StringArena {
    fn default() -> StringArena {
        StringArena::new(DEFAULT_SLOTS)
    }
}

impl StringArena {
    /// Creates an arena with `slots` slots, one of which is the reserved slot 0.
    pub fn new(slots: usize) -> StringArena {
        let slots = std::cmp::min(std::cmp::max(slots, 2), MAX_SLOTS);

        StringArena {
            slots: vec![[0; SLOT_SIZE]; slots],
            rover: 0,
        }
    }

    /// Total number of slots, including the reserved one.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Marks every slot free.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot[0] = 0;
        }

        self.rover = 0;
    }

    /// Stores `text` in a free slot.
    pub fn alloc(&mut self, text: &[u8]) -> Result<Handle, ArenaError> {
        if text.is_empty() {
            return Err(ArenaError::Empty);
        }

        if text.len() > SLOT_SIZE {
            return Err(ArenaError::TooLong { len: text.len(), max: SLOT_SIZE });
        }

        if text.contains(&0) {
            return Err(ArenaError::ZeroByte);
        }

        let start = self.rover;

        loop {
            if self.rover != 0 && self.slots[self.rover][0] == 0 {
                let handle = Handle::from_slot(self.rover).ok_or(ArenaError::Exhausted)?;

                let slot = &mut self.slots[self.rover];
                *slot = [0; SLOT_SIZE];
                slot[..text.len()].copy_from_slice(text);

                return Ok(handle);
            }

            self.rover = (self.rover + 1) % self.slots.len();

            if self.rover == start {
                return Err(ArenaError::Exhausted);
            }
        }
    }

    /// Stores an arbitrary byte array, zero bytes included.
    ///
    /// The slot receives a header byte with its own high bit set whose bit `i` records the high
    /// bit of payload byte `i`, followed by the payload bytes with their high bit forced to 1.
    /// No stored byte is therefore ever `00`.
    pub fn alloc_raw(&mut self, bytes: &[u8]) -> Result<Handle, ArenaError> {
        if bytes.is_empty() {
            return Err(ArenaError::Empty);
        }

        if bytes.len() > MAX_RAW_SIZE {
            return Err(ArenaError::TooLong { len: bytes.len(), max: MAX_RAW_SIZE });
        }

        let mut encoded = Vec::with_capacity(bytes.len() + 1);
        let mut msbs = 0x80u8;

        for (i, byte) in bytes.iter().enumerate() {
            if byte & 0x80 != 0 {
                msbs |= 1 << i;
            }
        }

        encoded.push(msbs);
        encoded.extend(bytes.iter().map(|b| b | 0x80));

        self.alloc(&encoded)
    }

    /// Releases a slot. Out-of-range handles are ignored, and freeing twice is harmless.
    pub fn free(&mut self, handle: Handle) {
        if let Some(slot) = self.slots.get_mut(handle.index()) {
            slot[0] = 0;
        }
    }

    /// Releases a slot if there is one.
    pub fn free_opt(&mut self, handle: Option<Handle>) {
        if let Some(handle) = handle {
            self.free(handle);
        }
    }

    /// Returns `true` if the slot of `handle` holds a value.
    pub fn is_allocated(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index())
            .map(|slot| slot[0] != 0)
            .unwrap_or(false)
    }

    /// The logical content of a slot: the stored bytes up to the first `00` or the slot end.
    /// Free and out-of-range slots read as empty.
    pub fn get(&self, handle: Handle) -> &[u8] {
        match self.slots.get(handle.index()) {
            Some(slot) => {
                let len = slot.iter().position(|&b| b == 0).unwrap_or(SLOT_SIZE);
                &slot[..len]
            }
            None => &[],
        }
    }

    /// Lossy text view of a slot.
    pub fn get_str(&self, handle: Handle) -> String {
        String::from_utf8_lossy(self.get(handle)).into_owned()
    }

    /// The text of `handle` padded with spaces to `minlen` characters. `None` yields `minlen`
    /// spaces, mirroring the reserved slot 0.
    pub fn get_padded(&self, handle: Option<Handle>, minlen: usize) -> String {
        let text = handle.map(|h| self.get_str(h)).unwrap_or_default();
        format!("{:<width$}", text, width = minlen)
    }

    /// Decodes a slot written by [alloc_raw](StringArena::alloc_raw).
    pub fn get_raw(&self, handle: Handle) -> Vec<u8> {
        let encoded = self.get(handle);

        let (msbs, payload) = match encoded.split_first() {
            Some(split) => split,
            None => return Vec::new(),
        };

        payload
            .iter()
            .enumerate()
            .map(|(i, byte)| {
                if i < 8 && msbs & (1 << i) != 0 {
                    byte | 0x80
                } else {
                    byte & 0x7F
                }
            })
            .collect()
    }

    /// Value equality of the logical contents of two slots.
    pub fn equals(&self, a: Handle, b: Handle) -> bool {
        self.get(a) == self.get(b)
    }

    /// Number of free allocatable slots.
    pub fn free_count(&self) -> usize {
        self.slots[1..].iter().filter(|slot| slot[0] == 0).count()
    }

    /// Number of slots in use.
    pub fn used_count(&self) -> usize {
        self.capacity() - 1 - self.free_count()
    }

    /// Iterates over the allocated slots in ascending slot order.
    pub fn slots(&self) -> impl Iterator<Item = Handle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, slot)| slot[0] != 0)
            .filter_map(|(index, _)| Handle::from_slot(index))
    }
}

impl fmt::Debug for StringArena {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_map();

        for handle in self.slots() {
            builder.entry(&handle.index(), &self.get_str(handle));
        }

        builder.finish()
    }
}
