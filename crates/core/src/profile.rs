//! Self-declared customer contact and delivery details.

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, PROFILE_KEY, get_json, set_json};

/// Errors raised when saving a profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The profile could not be encoded for storage.
    #[error("could not store profile: {0}")]
    Storage(String),
}

/// Name, phone and address. All required; none format-validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl UserProfile {
    /// Build a profile, trimming fields and rejecting blanks.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::MissingField` naming the first blank field.
    pub fn new(name: &str, phone: &str, address: &str) -> Result<Self, ProfileError> {
        let field = |value: &str, label: &'static str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ProfileError::MissingField(label))
            } else {
                Ok(trimmed.to_string())
            }
        };

        Ok(Self {
            name: field(name, "name")?,
            phone: field(phone, "phone")?,
            address: field(address, "address")?,
        })
    }

    /// Read the saved profile, if any.
    #[must_use]
    pub fn load(store: &impl KeyValueStore) -> Option<Self> {
        get_json(store, PROFILE_KEY)
    }

    /// Save, overwriting any previous profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Storage` if encoding fails.
    pub fn save(&self, store: &mut impl KeyValueStore) -> Result<(), ProfileError> {
        set_json(store, PROFILE_KEY, self).map_err(|err| ProfileError::Storage(err.to_string()))
    }

    /// Forget the saved profile.
    pub fn clear(store: &mut impl KeyValueStore) {
        store.remove(PROFILE_KEY);
    }
}
