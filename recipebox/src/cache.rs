//! Collection cache
//!
//! Local ordered mirror of one owner's saved recipes. It is never patched:
//! every refresh replaces the whole list. Refreshes carry a ticket so that a
//! response arriving after a newer one has been applied is dropped.

use crate::database::Recipe;
use crate::session::OwnerId;

/// Sequence number handed out when a refresh starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

impl RefreshTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct CollectionCache {
    owner: Option<OwnerId>,
    records: Vec<Recipe>,
    next_seq: u64,
    applied_seq: u64,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    pub fn records(&self) -> &[Recipe] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Linear scan by remote id
    pub fn find(&self, remote_id: &str) -> Option<&Recipe> {
        self.records
            .iter()
            .find(|r| r.remote_id.as_deref() == Some(remote_id))
    }

    /// Clear and repopulate in one step
    pub fn replace_all(&mut self, owner: OwnerId, records: Vec<Recipe>) {
        self.owner = Some(owner);
        self.records = records;
    }

    pub fn clear(&mut self) {
        self.owner = None;
        self.records.clear();
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.next_seq += 1;
        RefreshTicket(self.next_seq)
    }

    /// Apply a refresh result unless a newer one already landed.
    /// Returns whether the records were applied.
    pub fn apply(&mut self, ticket: RefreshTicket, owner: OwnerId, records: Vec<Recipe>) -> bool {
        if ticket.0 <= self.applied_seq {
            return false;
        }
        self.applied_seq = ticket.0;
        self.replace_all(owner, records);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, title: &str) -> Recipe {
        Recipe {
            remote_id: Some(id.to_string()),
            title: title.to_string(),
            ..Recipe::new_custom()
        }
    }

    fn owner() -> OwnerId {
        OwnerId::new("uid-1").unwrap()
    }

    #[test]
    fn test_replace_all_and_find() {
        let mut cache = CollectionCache::new();
        assert!(cache.is_empty());

        cache.replace_all(owner(), vec![recipe("a", "Pasta"), recipe("b", "Soup")]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.find("b").unwrap().title, "Soup");
        assert!(cache.find("c").is_none());

        cache.replace_all(owner(), vec![recipe("c", "Salad")]);
        assert_eq!(cache.len(), 1);
        assert!(cache.find("a").is_none());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.owner().is_none());
    }

    #[test]
    fn test_stale_ticket_is_rejected() {
        let mut cache = CollectionCache::new();
        let first = cache.begin_refresh();
        let second = cache.begin_refresh();
        assert!(second > first);

        assert!(cache.apply(second, owner(), vec![recipe("new", "Newer")]));
        assert!(!cache.apply(first, owner(), vec![recipe("old", "Older")]));

        assert_eq!(cache.len(), 1);
        assert!(cache.find("new").is_some());
    }

    #[test]
    fn test_in_order_tickets_all_apply() {
        let mut cache = CollectionCache::new();
        let first = cache.begin_refresh();
        assert!(cache.apply(first, owner(), vec![]));

        let second = cache.begin_refresh();
        assert!(cache.apply(second, owner(), vec![recipe("a", "Pasta")]));
        assert_eq!(cache.len(), 1);

        assert!(!cache.apply(second, owner(), vec![]));
    }
}
