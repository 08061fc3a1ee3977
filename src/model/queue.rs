// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Media player queue management.
//!
//! This module provides the playback queue: an ordered list of media items
//! with a cursor to the active one, a loop mode and a reversible shuffle.
//!
//! The queue is a plain state machine. It never starts playback itself,
//! instead it tells its [`QueueDelegate`] whenever the current item changes
//! (or has to be restarted) and the delegate arranges for the item to be
//! loaded.
//!
//! Every operation is total: out-of-range input is clamped or ignored, and
//! operations that cannot move the cursor return `None`.

use std::collections::HashSet;

use rand::{rng, seq::SliceRandom};

use crate::model::{LoopMode, MediaItem, SavedQueue};

/// Receives queue notifications, typically to drive the playback engine.
pub(crate) trait QueueDelegate {
    /// The current item changed, `None` when the queue became empty.
    fn on_current_item_changed(&self, item: Option<&MediaItem>);

    /// The current item did not change but should play again from the start.
    fn on_restart_current(&self, item: &MediaItem);
}

/// A read-only copy of the queue state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueueState {
    pub items: Vec<MediaItem>,
    pub original_items: Vec<MediaItem>,
    pub current_index: Option<usize>,
    pub loop_mode: LoopMode,
    pub is_shuffled: bool,
}

pub(crate) struct Queue<D: QueueDelegate> {
    /// Items in playback order.
    items: Vec<MediaItem>,
    /// Items in the order they were queued, used to undo a shuffle.
    original_items: Vec<MediaItem>,
    /// For each entry of `items`, its position in `original_items`.
    origin: Vec<usize>,
    /// `None` if and only if `items` is empty.
    current_index: Option<usize>,
    loop_mode: LoopMode,
    is_shuffled: bool,
    delegate: D,
}

impl<D: QueueDelegate> Queue<D> {
    pub(crate) fn new(delegate: D) -> Self {
        Self {
            items: Vec::new(),
            original_items: Vec::new(),
            origin: Vec::new(),
            current_index: None,
            loop_mode: LoopMode::None,
            is_shuffled: false,
            delegate,
        }
    }

    /// Replaces the queue with `items`, starting at `start_index`.
    ///
    /// The start index is clamped to the last item. Shuffle is switched off
    /// and the delegate is told about the new current item.
    pub(crate) fn set_queue(&mut self, items: Vec<MediaItem>, start_index: usize) {
        self.original_items = items.clone();
        self.origin = (0..items.len()).collect();
        self.current_index = if items.is_empty() {
            None
        } else {
            Some(start_index.min(items.len() - 1))
        };
        self.items = items;
        self.is_shuffled = false;

        self.notify_current();
    }

    /// Reinstates a previously saved queue without notifying the delegate.
    pub(crate) fn restore(&mut self, saved: SavedQueue) {
        let len = saved.items.len();

        self.original_items = saved.items.clone();
        self.items = saved.items;
        self.origin = (0..len).collect();
        self.current_index = if len == 0 {
            None
        } else {
            Some(saved.current.unwrap_or(0).min(len - 1))
        };
        self.loop_mode = saved.loop_mode;
        self.is_shuffled = false;

        if saved.shuffled && len > 0 {
            self.shuffle_on();
        }
    }

    /// Captures the queue in its unshuffled order, for persistence.
    pub(crate) fn saved(&self) -> SavedQueue {
        SavedQueue {
            items: self.original_items.clone(),
            current: self.current_index.map(|idx| self.origin[idx]),
            loop_mode: self.loop_mode,
            shuffled: self.is_shuffled,
        }
    }

    /// Appends items to the end of the queue.
    ///
    /// When the queue was empty the first appended item becomes current.
    pub(crate) fn append(&mut self, items: Vec<MediaItem>) {
        if items.is_empty() {
            return;
        }

        let was_empty = self.items.is_empty();
        let base = self.original_items.len();

        self.origin.extend(base..base + items.len());
        self.original_items.extend(items.iter().cloned());
        self.items.extend(items);

        if was_empty {
            self.current_index = Some(0);
            self.notify_current();
        }
    }

    /// Removes every occurrence of the items with the given ids.
    ///
    /// If the current item is removed the cursor stays at the same position,
    /// now occupied by the following item (or the new last item), and the
    /// delegate is notified.
    pub(crate) fn remove(&mut self, ids: Vec<i64>) {
        let ids: HashSet<i64> = ids.into_iter().collect();

        if !self.original_items.iter().any(|item| ids.contains(&item.id)) {
            return;
        }

        let mut remap = vec![None; self.original_items.len()];
        let mut original_items = Vec::with_capacity(self.original_items.len());
        for (idx, item) in std::mem::take(&mut self.original_items).into_iter().enumerate() {
            if !ids.contains(&item.id) {
                remap[idx] = Some(original_items.len());
                original_items.push(item);
            }
        }

        let old_current = self.current_index;
        let mut items = Vec::with_capacity(original_items.len());
        let mut origin = Vec::with_capacity(original_items.len());
        let mut new_current = None;
        let mut kept_before_current = 0;

        let old_items = std::mem::take(&mut self.items);
        let old_origin = std::mem::take(&mut self.origin);
        for (pos, (item, from)) in old_items.into_iter().zip(old_origin).enumerate() {
            let Some(to) = remap[from] else {
                continue;
            };

            if old_current == Some(pos) {
                new_current = Some(items.len());
            } else if old_current.is_some_and(|current| pos < current) {
                kept_before_current += 1;
            }

            items.push(item);
            origin.push(to);
        }

        let current_removed = old_current.is_some() && new_current.is_none();
        if current_removed && !items.is_empty() {
            new_current = Some(kept_before_current.min(items.len() - 1));
        }

        self.items = items;
        self.origin = origin;
        self.original_items = original_items;
        self.current_index = new_current;

        if self.items.is_empty() {
            self.is_shuffled = false;
        }

        if current_removed {
            self.notify_current();
        }
    }

    /// Advances to the next item.
    ///
    /// With [`LoopMode::One`] the cursor does not move, the current item is
    /// restarted instead. At the end of a queue that does not loop nothing
    /// happens and `None` is returned, the caller should stop playback.
    pub(crate) fn next(&mut self) -> Option<&MediaItem> {
        let current = self.current_index?;

        let next = match self.loop_mode {
            LoopMode::One => return self.restart_current(),
            _ if current + 1 < self.items.len() => current + 1,
            LoopMode::All => 0,
            LoopMode::None => return None,
        };

        self.move_to(next)
    }

    /// Moves back to the previous item, the mirror image of [`Queue::next`].
    ///
    /// This does not look at the playback position, callers that want
    /// "restart if well into the item" behaviour check that first.
    pub(crate) fn previous(&mut self) -> Option<&MediaItem> {
        let current = self.current_index?;

        let previous = match self.loop_mode {
            LoopMode::One => return self.restart_current(),
            _ if current > 0 => current - 1,
            LoopMode::All => self.items.len() - 1,
            LoopMode::None => return None,
        };

        self.move_to(previous)
    }

    /// Asks the delegate to play the current item again from the start.
    pub(crate) fn restart_current(&self) -> Option<&MediaItem> {
        let item = self.current_item()?;
        self.delegate.on_restart_current(item);
        Some(item)
    }

    /// Makes the item at `index` current, out-of-range indices are ignored.
    pub(crate) fn jump_to_index(&mut self, index: usize) -> Option<&MediaItem> {
        if index >= self.items.len() {
            return None;
        }

        self.move_to(index)
    }

    /// Switches shuffle on or off, returning the new shuffle state.
    ///
    /// Switching on shuffles every item except the current one, which is
    /// pinned to the front so playback carries on uninterrupted. Switching off
    /// restores the queued order and keeps the same current item.
    pub(crate) fn toggle_shuffle(&mut self) -> bool {
        if self.is_shuffled {
            self.shuffle_off();
        } else {
            self.shuffle_on();
        }

        self.is_shuffled
    }

    pub(crate) fn set_loop_mode(&mut self, loop_mode: LoopMode) {
        self.loop_mode = loop_mode;
    }

    /// Empties the queue and tells the delegate there is no current item.
    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.original_items.clear();
        self.origin.clear();
        self.current_index = None;
        self.is_shuffled = false;

        self.notify_current();
    }

    pub(crate) fn has_next(&self) -> bool {
        match self.current_index {
            None => false,
            Some(_) if self.loop_mode != LoopMode::None => true,
            Some(current) => current + 1 < self.items.len(),
        }
    }

    pub(crate) fn has_previous(&self) -> bool {
        match self.current_index {
            None => false,
            Some(_) if self.loop_mode != LoopMode::None => true,
            Some(current) => current > 0,
        }
    }

    pub(crate) fn current_item(&self) -> Option<&MediaItem> {
        self.current_index.and_then(|idx| self.items.get(idx))
    }

    pub(crate) fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub(crate) fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub(crate) fn is_shuffled(&self) -> bool {
        self.is_shuffled
    }

    pub(crate) fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn state(&self) -> QueueState {
        QueueState {
            items: self.items.clone(),
            original_items: self.original_items.clone(),
            current_index: self.current_index,
            loop_mode: self.loop_mode,
            is_shuffled: self.is_shuffled,
        }
    }

    #[cfg(test)]
    pub(crate) fn delegate(&self) -> &D {
        &self.delegate
    }

    fn move_to(&mut self, index: usize) -> Option<&MediaItem> {
        self.current_index = Some(index);
        self.notify_current();
        self.current_item()
    }

    fn notify_current(&self) {
        self.delegate.on_current_item_changed(self.current_item());
    }

    fn shuffle_on(&mut self) {
        // The unshuffled order is the snapshot to come back to.
        self.original_items = self.items.clone();

        let mut order: Vec<usize> = (0..self.items.len()).collect();
        let pinned = self.current_index.map(|current| order.remove(current));

        order.shuffle(&mut rng());

        if let Some(pinned) = pinned {
            order.insert(0, pinned);
            self.current_index = Some(0);
        }

        self.items = order.iter().map(|&idx| self.original_items[idx].clone()).collect();
        self.origin = order;
        self.is_shuffled = true;
    }

    fn shuffle_off(&mut self) {
        self.current_index = self.current_index.map(|current| self.origin[current]);
        self.items = self.original_items.clone();
        self.origin = (0..self.items.len()).collect();
        self.is_shuffled = false;
    }
}
