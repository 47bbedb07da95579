//! Durable memory of which reveals have already played.
//!
//! Two records live in local storage, each behind a single key and a single
//! JSON encoding:
//!
//! * [`AnimatedSet`] — submission ids whose row reveal finished. The feed
//!   uses it to decide novelty.
//! * [`AnimationLedger`] — per-field flags (`name`, `message`) for each id.
//!   The typing engine uses it so a field never types itself out twice.
//!
//! Both only ever grow. Writes merge with what is already stored, so two
//! clients sharing the same storage never drop each other's entries.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::FeedError;
use crate::storage::{ANIMATED_KEY, PLAYED_KEY, SharedStorage};

/// Which half of a row an animation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Message,
}

/// Idempotence key for one field of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationKey {
    pub id: Uuid,
    pub field: Field,
}

impl AnimationKey {
    pub fn name(id: Uuid) -> Self {
        Self { id, field: Field::Name }
    }

    pub fn message(id: Uuid) -> Self {
        Self {
            id,
            field: Field::Message,
        }
    }
}

// -- Animated-Set --

pub struct AnimatedSet {
    ids: HashSet<Uuid>,
    storage: SharedStorage,
}

impl AnimatedSet {
    /// Load once at startup. Unreadable state starts empty rather than failing.
    pub fn load(storage: SharedStorage) -> Self {
        let ids = read_ids(&storage).unwrap_or_else(|e| {
            warn!("Error loading animated messages: {}", e);
            HashSet::new()
        });
        Self { ids, storage }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record a finished reveal and write the set back.
    /// Returns false if the id was already present.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        if let Err(e) = self.persist() {
            warn!("Error saving animated messages: {}", e);
        }
        true
    }

    fn persist(&mut self) -> Result<(), FeedError> {
        // Pick up whatever another client stored since we loaded.
        if let Ok(stored) = read_ids(&self.storage) {
            self.ids.extend(stored);
        }
        let mut ids: Vec<&Uuid> = self.ids.iter().collect();
        ids.sort();
        self.storage.set(ANIMATED_KEY, &serde_json::to_string(&ids)?)
    }
}

fn read_ids(storage: &SharedStorage) -> Result<HashSet<Uuid>, FeedError> {
    match storage.get(ANIMATED_KEY)? {
        Some(raw) => Ok(serde_json::from_str::<Vec<Uuid>>(&raw)?.into_iter().collect()),
        None => Ok(HashSet::new()),
    }
}

// -- Played-animation ledger --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PlayedFields {
    #[serde(default)]
    name: bool,
    #[serde(default)]
    message: bool,
}

impl PlayedFields {
    fn get(&self, field: Field) -> bool {
        match field {
            Field::Name => self.name,
            Field::Message => self.message,
        }
    }

    fn set(&mut self, field: Field) {
        match field {
            Field::Name => self.name = true,
            Field::Message => self.message = true,
        }
    }

    fn merge(&mut self, other: PlayedFields) {
        self.name |= other.name;
        self.message |= other.message;
    }
}

type PlayedMap = BTreeMap<Uuid, PlayedFields>;

pub struct AnimationLedger {
    played: PlayedMap,
    storage: SharedStorage,
}

impl AnimationLedger {
    pub fn load(storage: SharedStorage) -> Self {
        let played = read_played(&storage).unwrap_or_else(|e| {
            warn!("Error loading typing animation state: {}", e);
            PlayedMap::new()
        });
        Self { played, storage }
    }

    /// Checks memory first, then storage, so a field played by another
    /// client sharing the storage is honored too.
    pub fn has_played(&mut self, key: AnimationKey) -> bool {
        if self.lookup(key) {
            return true;
        }
        match read_played(&self.storage) {
            Ok(stored) => {
                merge_into(&mut self.played, stored);
                self.lookup(key)
            }
            Err(e) => {
                warn!("Error reading typing animation state: {}", e);
                false
            }
        }
    }

    pub fn mark_played(&mut self, key: AnimationKey) {
        self.played.entry(key.id).or_default().set(key.field);
        if let Err(e) = self.persist() {
            warn!("Error saving typing animation state: {}", e);
        }
    }

    fn lookup(&self, key: AnimationKey) -> bool {
        self.played.get(&key.id).is_some_and(|f| f.get(key.field))
    }

    fn persist(&mut self) -> Result<(), FeedError> {
        if let Ok(stored) = read_played(&self.storage) {
            merge_into(&mut self.played, stored);
        }
        self.storage.set(PLAYED_KEY, &serde_json::to_string(&self.played)?)
    }
}

fn read_played(storage: &SharedStorage) -> Result<PlayedMap, FeedError> {
    match storage.get(PLAYED_KEY)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(PlayedMap::new()),
    }
}

fn merge_into(into: &mut PlayedMap, from: PlayedMap) {
    for (id, fields) in from {
        into.entry(id).or_default().merge(fields);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    fn storage() -> SharedStorage {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_animated_set_survives_reload() {
        let store = storage();
        let id = Uuid::new_v4();

        let mut set = AnimatedSet::load(store.clone());
        assert!(!set.contains(&id));
        assert!(set.insert(id));
        assert!(!set.insert(id));

        let reloaded = AnimatedSet::load(store);
        assert!(reloaded.contains(&id));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_animated_set_merges_concurrent_writers() {
        let store = storage();
        let (a_id, b_id) = (Uuid::new_v4(), Uuid::new_v4());

        let mut tab_a = AnimatedSet::load(store.clone());
        let mut tab_b = AnimatedSet::load(store.clone());
        tab_a.insert(a_id);
        tab_b.insert(b_id);

        let reloaded = AnimatedSet::load(store);
        assert!(reloaded.contains(&a_id));
        assert!(reloaded.contains(&b_id));
    }

    #[test]
    fn test_corrupt_set_starts_empty() {
        let store = storage();
        store.set(ANIMATED_KEY, "{broken").unwrap();
        let mut set = AnimatedSet::load(store.clone());
        assert!(set.is_empty());

        // The next write replaces the broken value.
        set.insert(Uuid::new_v4());
        assert_eq!(AnimatedSet::load(store).len(), 1);
    }

    #[test]
    fn test_ledger_keys_are_per_field() {
        let store = storage();
        let id = Uuid::new_v4();

        let mut ledger = AnimationLedger::load(store.clone());
        ledger.mark_played(AnimationKey::name(id));
        assert!(ledger.has_played(AnimationKey::name(id)));
        assert!(!ledger.has_played(AnimationKey::message(id)));

        let raw = store.get(PLAYED_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[id.to_string()]["name"], true);
        assert_eq!(value[id.to_string()]["message"], false);
    }

    #[test]
    fn test_ledger_sees_other_clients() {
        let store = storage();
        let id = Uuid::new_v4();

        let mut mine = AnimationLedger::load(store.clone());
        let mut theirs = AnimationLedger::load(store);
        theirs.mark_played(AnimationKey::message(id));

        assert!(mine.has_played(AnimationKey::message(id)));
        mine.mark_played(AnimationKey::name(id));
        assert!(theirs.has_played(AnimationKey::name(id)));
        assert!(theirs.has_played(AnimationKey::message(id)));
    }
}
