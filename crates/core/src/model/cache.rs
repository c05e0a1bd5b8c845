//! Ordered cache behind a [`ResultModel`](super::ResultModel).
//!
//! Every mutation records the [`ModelChange`]s a presentation layer needs to
//! follow along; [`Cache::replace`] turns a fresh batch into block moves,
//! inserts and a trailing removal instead of a reset.

use std::cmp::Ordering;

use serde::Serialize;

use crate::resultset::{LinkStatus, OrderingSpec, ResultRecord};

/// Edit notification for the presentation layer.
///
/// Indices are absolute rows. For `Moved`, `to` is the index of the first
/// moved row after the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "kebab-case")]
pub enum ModelChange {
    Inserted { at: usize, count: usize },
    Removed { at: usize, count: usize },
    Moved { from: usize, count: usize, to: usize },
    DataChanged { at: usize },
}

#[derive(Debug)]
pub struct Cache {
    items: Vec<ResultRecord>,
    fixed: Vec<String>,
    ordering: OrderingSpec,
    /// Fixed positions only apply when linked items can be present.
    use_fixed: bool,
    changes: Vec<ModelChange>,
}

impl Cache {
    pub fn new(ordering: OrderingSpec, use_fixed: bool) -> Self {
        Self { items: Vec::new(), fixed: Vec::new(), ordering, use_fixed, changes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResultRecord> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[ResultRecord] {
        &self.items
    }

    pub fn find(&self, resource: &str) -> Option<usize> {
        self.items.iter().position(|r| r.resource == resource)
    }

    pub fn fixed(&self) -> &[String] {
        &self.fixed
    }

    pub fn set_fixed(&mut self, fixed: Vec<String>) {
        self.fixed = fixed;
    }

    pub fn take_changes(&mut self) -> Vec<ModelChange> {
        std::mem::take(&mut self.changes)
    }

    fn fixed_index(&self, resource: &str) -> Option<usize> {
        if !self.use_fixed {
            return None;
        }
        self.fixed.iter().position(|r| r == resource)
    }

    /// Link status, then fixed position, then the query's metric.
    ///
    /// Unfixed items sort after every fixed one.
    pub fn compare(&self, a: &ResultRecord, b: &ResultRecord) -> Ordering {
        b.link_status
            .cmp(&a.link_status)
            .then_with(|| match (self.fixed_index(&a.resource), self.fixed_index(&b.resource)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| self.ordering.compare_metric(a, b))
    }

    /// Stable sort of a store batch by link status and fixed position,
    /// keeping the store's order otherwise.
    pub fn sort_batch(&self, batch: &mut [ResultRecord]) {
        if !self.use_fixed || self.fixed.is_empty() {
            return;
        }
        batch.sort_by_key(|r| {
            (std::cmp::Reverse(r.link_status), self.fixed_index(&r.resource).unwrap_or(usize::MAX))
        });
    }

    /// Index `record` should occupy, ignoring its current row if cached.
    pub fn destination_for(&self, record: &ResultRecord) -> usize {
        self.items
            .iter()
            .filter(|item| item.resource != record.resource)
            .filter(|item| self.compare(item, record) == Ordering::Less)
            .count()
    }

    /// Diff `batch` into the cache starting at row `from`.
    ///
    /// Scans the batch left to right. A resource not found at or after its
    /// target row is inserted; a found one is extended into the longest
    /// block both sequences agree on and moved as a whole when it is not
    /// already in place. Rows past the batch are removed.
    pub fn replace(&mut self, batch: Vec<ResultRecord>, from: usize) {
        let from = from.min(self.items.len());
        let mut pos = 0;

        while pos < batch.len() {
            let target = from + pos;
            let found = self.items[target..]
                .iter()
                .position(|r| r.resource == batch[pos].resource)
                .map(|offset| offset + target);

            let Some(old_start) = found else {
                self.items.insert(target, batch[pos].clone());
                self.changes.push(ModelChange::Inserted { at: target, count: 1 });
                pos += 1;
                continue;
            };

            let mut len = 1;
            while pos + len < batch.len()
                && old_start + len < self.items.len()
                && self.items[old_start + len].resource == batch[pos + len].resource
            {
                len += 1;
            }

            if old_start != target {
                self.changes.push(ModelChange::Moved { from: old_start, count: len, to: target });
                let block: Vec<ResultRecord> = self.items.drain(old_start..old_start + len).collect();
                self.items.splice(target..target, block);
            }

            for k in 0..len {
                if self.items[target + k] != batch[pos + k] {
                    self.items[target + k] = batch[pos + k].clone();
                    self.changes.push(ModelChange::DataChanged { at: target + k });
                }
            }

            pos += len;
        }

        self.truncate(from + batch.len());
    }

    pub fn insert(&mut self, at: usize, record: ResultRecord) {
        let at = at.min(self.items.len());
        self.items.insert(at, record);
        self.changes.push(ModelChange::Inserted { at, count: 1 });
    }

    pub fn remove(&mut self, at: usize) -> Option<ResultRecord> {
        if at >= self.items.len() {
            return None;
        }
        self.changes.push(ModelChange::Removed { at, count: 1 });
        Some(self.items.remove(at))
    }

    /// Drop every row from `len` on.
    pub fn truncate(&mut self, len: usize) {
        if self.items.len() > len {
            self.changes.push(ModelChange::Removed { at: len, count: self.items.len() - len });
            self.items.truncate(len);
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Edit the row in place and report it changed.
    pub fn update(&mut self, at: usize, edit: impl FnOnce(&mut ResultRecord)) {
        if let Some(item) = self.items.get_mut(at) {
            edit(item);
            self.changes.push(ModelChange::DataChanged { at });
        }
    }

    /// Move the row at `at` to where it now belongs. Returns the new index.
    pub fn reposition(&mut self, at: usize) -> usize {
        let Some(record) = self.items.get(at) else {
            return at;
        };

        let destination = self.destination_for(record);
        if destination == at {
            self.changes.push(ModelChange::DataChanged { at });
        } else {
            let item = self.items.remove(at);
            self.items.insert(destination, item);
            self.changes.push(ModelChange::Moved { from: at, count: 1, to: destination });
            self.changes.push(ModelChange::DataChanged { at: destination });
        }
        destination
    }

    /// Resources of the leading run of linked rows.
    pub fn linked_prefix(&self) -> Vec<String> {
        self.items
            .iter()
            .take_while(|r| r.link_status == LinkStatus::Linked)
            .map(|r| r.resource.clone())
            .collect()
    }
}
