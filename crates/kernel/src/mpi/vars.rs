// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Bounded, name-indexed stacks for MPI variables and user-defined functions.
//!
//! Lookups scan from the top down, so the most recent definition of a name shadows older ones.
//! Entries are only ever removed by truncating back to a previously recorded depth.

use thiserror::Error;
use unicase::UniCase;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum PushError {
    #[error("name too long")]
    NameTooLong,
    #[error("table full")]
    Full,
}

#[derive(Debug, Clone)]
pub struct NamedStack<T> {
    entries: Vec<(UniCase<String>, T)>,
    capacity: usize,
    max_name_len: usize,
}

impl<T> NamedStack<T> {
    pub fn new(capacity: usize, max_name_len: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            max_name_len,
        }
    }

    /// Push a new binding, returning its slot.
    pub fn push(&mut self, name: &str, value: T) -> Result<usize, PushError> {
        if name.len() > self.max_name_len {
            return Err(PushError::NameTooLong);
        }
        if self.entries.len() >= self.capacity {
            return Err(PushError::Full);
        }
        self.entries.push((UniCase::new(name.to_string()), value));
        Ok(self.entries.len() - 1)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        let name = UniCase::new(name);
        self.entries
            .iter()
            .rposition(|(n, _)| UniCase::new(n.as_str()) == name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.find(name).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.find(name).map(|i| &mut self.entries[i].1)
    }

    /// Replace the value held in `slot`. Slots that have since been popped are ignored.
    pub fn set(&mut self, slot: usize, value: T) {
        if let Some(entry) = self.entries.get_mut(slot) {
            entry.1 = value;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything above `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.entries.truncate(depth);
    }
}
