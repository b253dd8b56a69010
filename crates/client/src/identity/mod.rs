//! Local cache of the server-assigned player identity.
//!
//! The pair lives in two independent storage entries. Reads never fail and an
//! empty entry counts as absent.

use std::rc::Rc;

use gang_protocol::PlayerIdentity;

use crate::ports::outbound::{storage_keys, StorageProvider};

/// What the store currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredIdentity {
    Complete(PlayerIdentity),
    NameOnly(String),
    IdOnly(String),
    Absent,
}

impl StoredIdentity {
    pub fn name(&self) -> Option<&str> {
        match self {
            StoredIdentity::Complete(identity) => Some(&identity.name),
            StoredIdentity::NameOnly(name) => Some(name),
            StoredIdentity::IdOnly(_) | StoredIdentity::Absent => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            StoredIdentity::Complete(identity) => Some(&identity.id),
            StoredIdentity::IdOnly(id) => Some(id),
            StoredIdentity::NameOnly(_) | StoredIdentity::Absent => None,
        }
    }

    /// The identity, only if both halves are present.
    pub fn complete(&self) -> Option<&PlayerIdentity> {
        match self {
            StoredIdentity::Complete(identity) => Some(identity),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct IdentityStore {
    storage: Rc<dyn StorageProvider>,
}

impl IdentityStore {
    pub fn new(storage: Rc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    pub fn read(&self) -> StoredIdentity {
        let name = self.load_non_empty(storage_keys::PLAYER_NAME);
        let id = self.load_non_empty(storage_keys::PLAYER_ID);

        match (name, id) {
            (Some(name), Some(id)) => StoredIdentity::Complete(PlayerIdentity { name, id }),
            (Some(name), None) => StoredIdentity::NameOnly(name),
            (None, Some(id)) => StoredIdentity::IdOnly(id),
            (None, None) => StoredIdentity::Absent,
        }
    }

    /// Overwrite both entries. Last write wins.
    pub fn write(&self, identity: &PlayerIdentity) {
        self.storage.save(storage_keys::PLAYER_NAME, &identity.name);
        self.storage.save(storage_keys::PLAYER_ID, &identity.id);
        tracing::debug!(player_id = %identity.id, "Stored player identity");
    }

    fn load_non_empty(&self, key: &str) -> Option<String> {
        self.storage.load(key).filter(|value| !value.is_empty())
    }
}
