//! Where profiles come from.
//!
//! The analysis core never opens files; batch entry points take a
//! [`ProfileSource`] instead. [`InMemorySource`] serves profiles that are
//! already loaded, [`crate::io::TextDirSource`] reads a directory of text
//! exports.

use crate::error::ProfileError;
use crate::types::RowProfile;

pub trait ProfileSource: Send + Sync {
    /// Identifiers in processing order.
    fn ids(&self) -> Result<Vec<String>, ProfileError>;

    fn load(&self, id: &str) -> Result<RowProfile, ProfileError>;
}

/// Profiles held in memory, served in insertion order.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    profiles: Vec<RowProfile>,
}

impl InMemorySource {
    pub fn new(profiles: Vec<RowProfile>) -> Self {
        Self { profiles }
    }

    pub fn push(&mut self, profile: RowProfile) {
        self.profiles.push(profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<RowProfile> for InMemorySource {
    fn from_iter<I: IntoIterator<Item = RowProfile>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl ProfileSource for InMemorySource {
    fn ids(&self) -> Result<Vec<String>, ProfileError> {
        Ok(self.profiles.iter().map(|p| p.id().to_string()).collect())
    }

    fn load(&self, id: &str) -> Result<RowProfile, ProfileError> {
        self.profiles
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| ProfileError::Source {
                id: id.to_string(),
                reason: "unknown profile id".to_string(),
            })
    }
}
