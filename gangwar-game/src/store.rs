//! Versioned record storage with atomic batch commits.
//!
//! Every record carries a version. Writers read snapshots, compute, and commit
//! a [`WriteBatch`] naming the version each write expects. A commit checks all
//! expectations and applies all writes under one lock, or changes nothing.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::state::{Gang, Member, MemberId};

pub type Version = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: Version,
    pub record: T,
}

/// Storage key for a gang. Names are unique regardless of case, so the key
/// folds case while the record keeps its display spelling.
#[must_use]
pub fn gang_key(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Gang(String),
    Member(MemberId),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gang(name) => write!(f, "gang:{name}"),
            Self::Member(id) => write!(f, "member:{id}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("version mismatch on {key}")]
    Conflict { key: RecordKey },
    #[error("store backend: {0}")]
    Backend(String),
}

/// One pending write. `expected: None` means the record must not exist yet.
#[derive(Debug, Clone, PartialEq)]
enum Write {
    PutGang {
        expected: Option<Version>,
        gang: Box<Gang>,
    },
    DeleteGang {
        name: String,
        expected: Version,
    },
    PutMember {
        expected: Option<Version>,
        member: Member,
    },
}

impl Write {
    fn key(&self) -> RecordKey {
        match self {
            Self::PutGang { gang, .. } => RecordKey::Gang(gang_key(&gang.name)),
            Self::DeleteGang { name, .. } => RecordKey::Gang(gang_key(name)),
            Self::PutMember { member, .. } => RecordKey::Member(member.id.clone()),
        }
    }

    const fn expected(&self) -> Option<Version> {
        match self {
            Self::PutGang { expected, .. } | Self::PutMember { expected, .. } => *expected,
            Self::DeleteGang { expected, .. } => Some(*expected),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_gang(&mut self, expected: Option<Version>, gang: Gang) -> &mut Self {
        self.writes.push(Write::PutGang {
            expected,
            gang: Box::new(gang),
        });
        self
    }

    pub fn delete_gang(&mut self, name: impl Into<String>, expected: Version) -> &mut Self {
        self.writes.push(Write::DeleteGang {
            name: name.into(),
            expected,
        });
        self
    }

    pub fn put_member(&mut self, expected: Option<Version>, member: Member) -> &mut Self {
        self.writes.push(Write::PutMember { expected, member });
        self
    }

    /// Gangs the batch would leave behind, for invariant checks before commit.
    pub fn gangs(&self) -> impl Iterator<Item = &Gang> {
        self.writes.iter().filter_map(|write| match write {
            Write::PutGang { gang, .. } => Some(gang.as_ref()),
            _ => None,
        })
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.writes.iter().filter_map(|write| match write {
            Write::PutMember { member, .. } => Some(member),
            _ => None,
        })
    }
}

/// Persistence seam for gang and member records.
pub trait Store: Send + Sync {
    /// Look a gang up by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn gang(&self, name: &str) -> Result<Option<Versioned<Gang>>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn member(&self, id: &MemberId) -> Result<Option<Versioned<Member>>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn gangs(&self) -> Result<Vec<Versioned<Gang>>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn members(&self) -> Result<Vec<Versioned<Member>>, StoreError>;

    /// Apply every write or none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when any record's version moved.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn gang(&self, name: &str) -> Result<Option<Versioned<Gang>>, StoreError> {
        (**self).gang(name)
    }

    fn member(&self, id: &MemberId) -> Result<Option<Versioned<Member>>, StoreError> {
        (**self).member(id)
    }

    fn gangs(&self) -> Result<Vec<Versioned<Gang>>, StoreError> {
        (**self).gangs()
    }

    fn members(&self) -> Result<Vec<Versioned<Member>>, StoreError> {
        (**self).members()
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }
}

#[derive(Debug, Default)]
struct Tables {
    last_version: Version,
    gangs: BTreeMap<String, Versioned<Gang>>,
    members: BTreeMap<MemberId, Versioned<Member>>,
}

impl Tables {
    fn current(&self, key: &RecordKey) -> Option<Version> {
        match key {
            RecordKey::Gang(name) => self.gangs.get(name).map(|v| v.version),
            RecordKey::Member(id) => self.members.get(id).map(|v| v.version),
        }
    }

    const fn bump(&mut self) -> Version {
        self.last_version += 1;
        self.last_version
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    gangs: Vec<Gang>,
    members: Vec<Member>,
}

/// In-process store guarded by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }

    /// Serialize every record. Versions are not persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or serialization fails.
    pub fn to_json(&self) -> Result<String, StoreError> {
        let tables = self.lock()?;
        let snapshot = Snapshot {
            gangs: tables.gangs.values().map(|v| v.record.clone()).collect(),
            members: tables.members.values().map(|v| v.record.clone()).collect(),
        };
        serde_json::to_string_pretty(&snapshot).map_err(|err| StoreError::Backend(err.to_string()))
    }

    /// Restore a store from [`MemoryStore::to_json`] output.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not parse.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let snapshot: Snapshot =
            serde_json::from_str(json).map_err(|err| StoreError::Backend(err.to_string()))?;
        let mut tables = Tables::default();
        for gang in snapshot.gangs {
            let version = tables.bump();
            tables.gangs.insert(
                gang_key(&gang.name),
                Versioned {
                    version,
                    record: gang,
                },
            );
        }
        for member in snapshot.members {
            let version = tables.bump();
            tables.members.insert(
                member.id.clone(),
                Versioned {
                    version,
                    record: member,
                },
            );
        }
        Ok(Self {
            tables: Mutex::new(tables),
        })
    }
}

impl Store for MemoryStore {
    fn gang(&self, name: &str) -> Result<Option<Versioned<Gang>>, StoreError> {
        Ok(self.lock()?.gangs.get(&gang_key(name)).cloned())
    }

    fn member(&self, id: &MemberId) -> Result<Option<Versioned<Member>>, StoreError> {
        Ok(self.lock()?.members.get(id).cloned())
    }

    fn gangs(&self) -> Result<Vec<Versioned<Gang>>, StoreError> {
        Ok(self.lock()?.gangs.values().cloned().collect())
    }

    fn members(&self) -> Result<Vec<Versioned<Member>>, StoreError> {
        Ok(self.lock()?.members.values().cloned().collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let mut seen = BTreeSet::new();
        for write in &batch.writes {
            let key = write.key();
            if tables.current(&key) != write.expected() {
                return Err(StoreError::Conflict { key });
            }
            if !seen.insert(key.clone()) {
                return Err(StoreError::Backend(format!("{key} written twice in one batch")));
            }
        }
        for write in batch.writes {
            let version = tables.bump();
            match write {
                Write::PutGang { gang, .. } => {
                    tables.gangs.insert(
                        gang_key(&gang.name),
                        Versioned {
                            version,
                            record: *gang,
                        },
                    );
                }
                Write::DeleteGang { name, .. } => {
                    tables.gangs.remove(&gang_key(&name));
                }
                Write::PutMember { member, .. } => {
                    tables.members.insert(
                        member.id.clone(),
                        Versioned {
                            version,
                            record: member,
                        },
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gang(name: &str) -> Gang {
        Gang::new(name.into(), MemberId::from("boss"), 0)
    }

    #[test]
    fn insert_then_update_bumps_version() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put_gang(None, gang("Crows"));
        store.commit(batch).expect("insert");
        let first = store.gang("Crows").unwrap().expect("stored");

        let mut updated = first.record.clone();
        updated.vault = 500;
        let mut batch = WriteBatch::new();
        batch.put_gang(Some(first.version), updated);
        store.commit(batch).expect("update");
        let second = store.gang("Crows").unwrap().expect("stored");
        assert!(second.version > first.version);
        assert_eq!(second.record.vault, 500);
    }

    #[test]
    fn stale_version_rejects_whole_batch() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put_gang(None, gang("Crows"));
        store.commit(batch).unwrap();
        let stale = store.gang("Crows").unwrap().unwrap();

        let mut bump = WriteBatch::new();
        bump.put_gang(Some(stale.version), stale.record.clone());
        store.commit(bump).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put_member(None, Member::new(MemberId::from("new")))
            .delete_gang("Crows", stale.version);
        let err = store.commit(batch).unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                key: RecordKey::Gang("crows".into())
            }
        );
        assert!(store.member(&MemberId::from("new")).unwrap().is_none());
        assert!(store.gang("Crows").unwrap().is_some());
    }

    #[test]
    fn insert_over_existing_conflicts() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put_gang(None, gang("Crows"));
        store.commit(batch.clone()).unwrap();
        assert!(matches!(store.commit(batch), Err(StoreError::Conflict { .. })));
    }

    #[test]
    fn names_differing_in_case_share_a_key() {
        let store = MemoryStore::new();
        let mut first = WriteBatch::new();
        first.put_gang(None, gang("Crows"));
        let mut second = WriteBatch::new();
        second.put_gang(None, gang("crows"));
        store.commit(first).unwrap();
        assert_eq!(
            store.commit(second),
            Err(StoreError::Conflict {
                key: RecordKey::Gang("crows".into())
            })
        );
        let stored = store.gang("CROWS").unwrap().expect("case-insensitive lookup");
        assert_eq!(stored.record.name, "Crows");
        assert_eq!(store.gangs().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch
            .put_member(None, Member::new(MemberId::from("a")))
            .put_member(None, Member::new(MemberId::from("a")));
        assert!(matches!(store.commit(batch), Err(StoreError::Backend(_))));
        assert!(store.members().unwrap().is_empty());
    }

    #[test]
    fn json_snapshot_restores_records() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        let mut crows = gang("Crows");
        crows.vault = 1_234;
        batch
            .put_gang(None, crows)
            .put_member(None, Member::new(MemberId::from("boss")));
        store.commit(batch).unwrap();

        let json = store.to_json().unwrap();
        let restored = MemoryStore::from_json(&json).unwrap();
        let gang = restored.gang("Crows").unwrap().expect("restored gang");
        assert_eq!(gang.record.vault, 1_234);
        assert_eq!(restored.members().unwrap().len(), 1);
        assert!(MemoryStore::from_json("not json").is_err());
    }
}
