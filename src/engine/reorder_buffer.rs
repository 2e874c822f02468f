// engine/reorder_buffer.rs
//
// The reorder buffer: a circular array tracking in-flight instructions in
// program order. Per the design notes, "full" and "empty" are both
// head == tail, disambiguated by whether the head slot is busy.

use crate::engine::reservation_station::Tag;

#[derive(Debug, Clone)]
pub struct ReorderBufferEntry {
    pub busy: bool,
    pub instruction_id: usize,
    pub destination_register: Option<String>,
    pub ready: bool,
    pub store_data_dependency: Tag,
}

impl ReorderBufferEntry {
    fn free() -> Self {
        Self {
            busy: false,
            instruction_id: 0,
            destination_register: None,
            ready: false,
            store_data_dependency: Tag::Ready,
        }
    }

    fn reset(&mut self) {
        *self = Self::free();
    }
}

#[derive(Debug, Clone)]
pub struct ReorderBuffer {
    entries: Vec<ReorderBufferEntry>,
    head: usize,
    tail: usize,
}

impl ReorderBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            entries: (0..size).map(|_| ReorderBufferEntry::free()).collect(),
            head: 0,
            tail: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn get(&self, index: usize) -> &ReorderBufferEntry {
        &self.entries[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut ReorderBufferEntry {
        &mut self.entries[index]
    }

    pub fn is_full(&self) -> bool {
        self.head == self.tail && self.entries[self.tail].busy
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail && !self.entries[self.tail].busy
    }

    /// Iterates busy entries starting at `head`, in program order, yielding
    /// `(rob_index, entry)`.
    pub fn iter_in_order(&self) -> impl Iterator<Item = (usize, &ReorderBufferEntry)> {
        let len = self.entries.len();
        let head = self.head;
        let count = if self.is_full() {
            len
        } else if head <= self.tail {
            self.tail - head
        } else {
            len - head + self.tail
        };
        (0..count).map(move |offset| {
            let idx = (head + offset) % len;
            (idx, &self.entries[idx])
        })
    }

    /// Allocates the entry at `tail`, returning its index, and advances
    /// `tail`. Caller must have already checked `!is_full()`.
    pub fn allocate(&mut self, instruction_id: usize, destination_register: Option<String>) -> usize {
        let idx = self.tail;
        let entry = &mut self.entries[idx];
        entry.busy = true;
        entry.instruction_id = instruction_id;
        entry.destination_register = destination_register;
        entry.ready = false;
        entry.store_data_dependency = Tag::Ready;
        self.tail = (self.tail + 1) % self.entries.len();
        idx
    }

    /// Frees the head entry and advances `head`. Caller must have already
    /// checked the head is busy and ready.
    pub fn retire_head(&mut self) {
        let head = self.head;
        self.entries[head].reset();
        self.head = (self.head + 1) % self.entries.len();
    }

    /// Clears every RS-style tag (here, `store_data_dependency` fields)
    /// pointing at `rob_index`.
    pub fn broadcast_clear(&mut self, rob_index: usize) {
        for entry in &mut self.entries {
            if entry.busy {
                entry.store_data_dependency.clear_if_matches(rob_index);
            }
        }
    }
}
