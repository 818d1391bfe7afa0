//! # Store Module
//!
//! The storage seam between the engine and the surrounding case-management
//! application. The engine sees two traits: [`CaseStore`] for read-side
//! candidate discovery and the re-entrancy guard, and [`CaseTransaction`]
//! for the atomic scope the merger runs in.
//!
//! [`MemoryStore`] is the in-memory implementation used by tests; its
//! snapshot-swap transactions are the reference semantics for commit and
//! rollback.

use crate::model::{Event, HousingOwnerLink, Note, Owner, OwnerId};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Partial update applied to the surviving owner after a merge.
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnerPatch {
    pub administrator: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub kind: Option<String>,
    pub kind_detail: Option<String>,
    pub raw_address: Option<Vec<String>>,
}

impl OwnerPatch {
    /// True when no field carries a value; the merger skips the update
    /// entirely in that case.
    pub fn is_empty(&self) -> bool {
        self.administrator.is_none()
            && self.birth_date.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.kind.is_none()
            && self.kind_detail.is_none()
            && self.raw_address.is_none()
    }
}

/// Read-side store operations used outside the merge transaction.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Owners sharing the exact same full name (case-sensitive), excluding
    /// the given owner itself.
    async fn find_owners_by_full_name(
        &self,
        full_name: &str,
        exclude: OwnerId,
    ) -> Result<Vec<Owner>>;

    /// Whether the owner row still exists. The merger uses this as its
    /// re-entrancy guard against sources already absorbed earlier in the
    /// run.
    async fn owner_exists(&self, id: OwnerId) -> Result<bool>;

    /// Open a transaction covering every table the merger touches.
    async fn begin(&self) -> Result<Box<dyn CaseTransaction>>;
}

/// Atomic scope over the owner, link, event, and note tables.
///
/// Nothing written through a transaction is visible until [`commit`];
/// dropping or rolling back discards every write.
///
/// [`commit`]: CaseTransaction::commit
#[async_trait]
pub trait CaseTransaction: Send {
    /// All links referencing any of the given owners.
    async fn links_by_owner_ids(&mut self, ids: &[OwnerId]) -> Result<Vec<HousingOwnerLink>>;

    /// Delete the given links; returns the number of rows removed.
    async fn delete_links(&mut self, links: &[HousingOwnerLink]) -> Result<u64>;

    /// Repoint links from the given owners to another owner.
    async fn reassign_links(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64>;

    /// Repoint events from the given owners to another owner.
    async fn reassign_events(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64>;

    /// Same as [`reassign_events`], for the archival event table kept from
    /// earlier campaigns.
    ///
    /// [`reassign_events`]: CaseTransaction::reassign_events
    async fn reassign_archived_events(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64>;

    /// Repoint notes from the given owners to another owner.
    async fn reassign_notes(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64>;

    /// Delete owner rows; returns the number of rows removed.
    async fn delete_owners(&mut self, ids: &[OwnerId]) -> Result<u64>;

    /// Apply a partial update to one owner.
    async fn update_owner(&mut self, id: OwnerId, patch: OwnerPatch) -> Result<()>;

    /// Publish every write of this transaction atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write of this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
struct Tables {
    owners: HashMap<OwnerId, Owner>,
    links: Vec<HousingOwnerLink>,
    events: Vec<Event>,
    archived_events: Vec<Event>,
    notes: Vec<Note>,
}

/// In-memory store backing tests and small batch runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_owner(&self, owner: Owner) {
        self.tables.write().owners.insert(owner.id, owner);
    }

    pub fn insert_link(&self, link: HousingOwnerLink) {
        self.tables.write().links.push(link);
    }

    pub fn insert_event(&self, event: Event) {
        self.tables.write().events.push(event);
    }

    pub fn insert_archived_event(&self, event: Event) {
        self.tables.write().archived_events.push(event);
    }

    pub fn insert_note(&self, note: Note) {
        self.tables.write().notes.push(note);
    }

    /// Get an owner by id
    pub fn owner(&self, id: OwnerId) -> Option<Owner> {
        self.tables.read().owners.get(&id).cloned()
    }

    /// All owners, ordered by id for deterministic assertions
    pub fn owners(&self) -> Vec<Owner> {
        let mut owners: Vec<Owner> = self.tables.read().owners.values().cloned().collect();
        owners.sort_by_key(|owner| owner.id);
        owners
    }

    pub fn owner_count(&self) -> usize {
        self.tables.read().owners.len()
    }

    pub fn links(&self) -> Vec<HousingOwnerLink> {
        self.tables.read().links.clone()
    }

    pub fn links_for_owner(&self, id: OwnerId) -> Vec<HousingOwnerLink> {
        self.tables
            .read()
            .links
            .iter()
            .filter(|link| link.owner_id == id)
            .cloned()
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.tables.read().events.clone()
    }

    pub fn archived_events(&self) -> Vec<Event> {
        self.tables.read().archived_events.clone()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.tables.read().notes.clone()
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn find_owners_by_full_name(
        &self,
        full_name: &str,
        exclude: OwnerId,
    ) -> Result<Vec<Owner>> {
        let mut candidates: Vec<Owner> = self
            .tables
            .read()
            .owners
            .values()
            .filter(|owner| owner.full_name == full_name && owner.id != exclude)
            .cloned()
            .collect();
        // Deterministic candidate order; callers re-sort by score anyway.
        candidates.sort_by_key(|owner| owner.id);
        Ok(candidates)
    }

    async fn owner_exists(&self, id: OwnerId) -> Result<bool> {
        Ok(self.tables.read().owners.contains_key(&id))
    }

    async fn begin(&self) -> Result<Box<dyn CaseTransaction>> {
        let working = self.tables.read().clone();
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            working,
        }))
    }
}

/// Snapshot-swap transaction: mutates a private copy of the tables and
/// publishes it in one swap on commit. Dropping it without committing
/// leaves the store untouched.
pub struct MemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    working: Tables,
}

#[async_trait]
impl CaseTransaction for MemoryTransaction {
    async fn links_by_owner_ids(&mut self, ids: &[OwnerId]) -> Result<Vec<HousingOwnerLink>> {
        Ok(self
            .working
            .links
            .iter()
            .filter(|link| ids.contains(&link.owner_id))
            .cloned()
            .collect())
    }

    async fn delete_links(&mut self, links: &[HousingOwnerLink]) -> Result<u64> {
        let before = self.working.links.len();
        self.working.links.retain(|link| !links.contains(link));
        Ok((before - self.working.links.len()) as u64)
    }

    async fn reassign_links(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64> {
        let mut updated = 0;
        for link in &mut self.working.links {
            if from.contains(&link.owner_id) {
                link.owner_id = to;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn reassign_events(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64> {
        let mut updated = 0;
        for event in &mut self.working.events {
            if from.contains(&event.owner_id) {
                event.owner_id = to;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn reassign_archived_events(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64> {
        let mut updated = 0;
        for event in &mut self.working.archived_events {
            if from.contains(&event.owner_id) {
                event.owner_id = to;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn reassign_notes(&mut self, from: &[OwnerId], to: OwnerId) -> Result<u64> {
        let mut updated = 0;
        for note in &mut self.working.notes {
            if from.contains(&note.owner_id) {
                note.owner_id = to;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_owners(&mut self, ids: &[OwnerId]) -> Result<u64> {
        let mut removed = 0;
        for id in ids {
            if self.working.owners.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn update_owner(&mut self, id: OwnerId, patch: OwnerPatch) -> Result<()> {
        let owner = self
            .working
            .owners
            .get_mut(&id)
            .ok_or_else(|| anyhow!("owner not found: {id}"))?;

        if let Some(administrator) = patch.administrator {
            owner.administrator = Some(administrator);
        }
        if let Some(birth_date) = patch.birth_date {
            owner.birth_date = Some(birth_date);
        }
        if let Some(email) = patch.email {
            owner.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            owner.phone = Some(phone);
        }
        if let Some(kind) = patch.kind {
            owner.kind = Some(kind);
        }
        if let Some(kind_detail) = patch.kind_detail {
            owner.kind_detail = Some(kind_detail);
        }
        if let Some(raw_address) = patch.raw_address {
            owner.raw_address = raw_address;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { tables, working } = *self;
        *tables.write() = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Dropping the working copy discards every write.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HousingId, HousingKey};

    fn owner(name: &str) -> Owner {
        Owner::new(name, vec!["17 RUE NEUVE".to_string()])
    }

    #[tokio::test]
    async fn test_find_owners_by_full_name_excludes_self() -> Result<()> {
        let store = MemoryStore::new();
        let a = owner("DURAND JEAN");
        let b = owner("DURAND JEAN");
        let c = owner("MARTIN PAUL");
        store.insert_owner(a.clone());
        store.insert_owner(b.clone());
        store.insert_owner(c);

        let candidates = store.find_owners_by_full_name("DURAND JEAN", a.id).await?;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, b.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_name_lookup_is_case_sensitive() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_owner(owner("Durand Jean"));

        let candidates = store
            .find_owners_by_full_name("DURAND JEAN", OwnerId::new())
            .await?;
        assert!(candidates.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() -> Result<()> {
        let store = MemoryStore::new();
        let a = owner("A");
        store.insert_owner(a.clone());

        let mut tx = store.begin().await?;
        tx.delete_owners(&[a.id]).await?;
        assert!(store.owner_exists(a.id).await?);

        tx.commit().await?;
        assert!(!store.owner_exists(a.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() -> Result<()> {
        let store = MemoryStore::new();
        let a = owner("A");
        store.insert_owner(a.clone());

        {
            let mut tx = store.begin().await?;
            tx.delete_owners(&[a.id]).await?;
            tx.rollback().await?;
        }
        assert!(store.owner_exists(a.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_reassign_and_delete_links() -> Result<()> {
        let store = MemoryStore::new();
        let a = owner("A");
        let b = owner("B");
        let housing = HousingKey::new(HousingId::new(), "33500");
        store.insert_owner(a.clone());
        store.insert_owner(b.clone());
        store.insert_link(HousingOwnerLink::new(a.id, housing.clone(), 1));
        store.insert_link(HousingOwnerLink::new(b.id, housing.clone(), 2));

        let mut tx = store.begin().await?;
        let loaded = tx.links_by_owner_ids(&[a.id, b.id]).await?;
        assert_eq!(loaded.len(), 2);

        let removed = tx
            .delete_links(&[HousingOwnerLink::new(b.id, housing.clone(), 2)])
            .await?;
        assert_eq!(removed, 1);

        let moved = tx.reassign_links(&[a.id], b.id).await?;
        assert_eq!(moved, 1);
        tx.commit().await?;

        let links = store.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].owner_id, b.id);
        assert_eq!(links[0].rank, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_owner_applies_only_present_fields() -> Result<()> {
        let store = MemoryStore::new();
        let a = owner("A").with_email("a@example.com");
        store.insert_owner(a.clone());

        let mut tx = store.begin().await?;
        tx.update_owner(
            a.id,
            OwnerPatch {
                phone: Some("0556000000".to_string()),
                ..OwnerPatch::default()
            },
        )
        .await?;
        tx.commit().await?;

        let updated = store.owner(a.id).expect("owner kept");
        assert_eq!(updated.email.as_deref(), Some("a@example.com"));
        assert_eq!(updated.phone.as_deref(), Some("0556000000"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_owner_fails() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let result = tx.update_owner(OwnerId::new(), OwnerPatch::default()).await;
        assert!(result.is_err());
        Ok(())
    }
}
