// 👤 Identity Registry - Immutable (age, gender) profile per identity
// A profile is bound on an identity's first successful borrow and never
// changes afterwards. There is no unregister operation.

use crate::animals::Gender;
use crate::lending::LendingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// USER PROFILE
// ============================================================================

/// The (age, gender) pair bound to an identity.
///
/// Once bound, every later borrow by the same identity must present the
/// identical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: u8,
    pub gender: Gender,
}

impl UserProfile {
    pub fn new(age: u8, gender: Gender) -> Self {
        UserProfile { age, gender }
    }
}

// ============================================================================
// PROFILE REGISTRY
// ============================================================================

/// Per-identity profile records, keyed by the opaque identity string.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<String, UserProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        ProfileRegistry {
            profiles: HashMap::new(),
        }
    }

    /// Rebuild a registry from stored (identity, profile) rows
    pub fn from_profiles(rows: impl IntoIterator<Item = (String, UserProfile)>) -> Self {
        ProfileRegistry {
            profiles: rows.into_iter().collect(),
        }
    }

    /// Profile bound to an identity, if any
    pub fn get(&self, identity: &str) -> Option<UserProfile> {
        self.profiles.get(identity).copied()
    }

    /// Read-only consistency check: succeeds when the identity is unknown
    /// or its bound profile matches exactly. Never mutates.
    pub fn check(&self, identity: &str, profile: UserProfile) -> Result<(), LendingError> {
        match self.profiles.get(identity) {
            None => Ok(()),
            Some(existing) if *existing == profile => Ok(()),
            Some(_) => Err(LendingError::ProfileMismatch),
        }
    }

    /// Bind a profile to an identity if none is bound yet.
    /// Existing profiles are left untouched.
    pub fn bind(&mut self, identity: &str, profile: UserProfile) {
        self.profiles
            .entry(identity.to_string())
            .or_insert(profile);
    }

    /// Single-call form: create the profile on first sight, or verify an
    /// exact match against the bound one.
    pub fn bind_or_check(
        &mut self,
        identity: &str,
        profile: UserProfile,
    ) -> Result<(), LendingError> {
        self.check(identity, profile)?;
        self.bind(identity, profile);
        Ok(())
    }

    /// Snapshot of all bound profiles, sorted by identity
    pub fn profiles(&self) -> Vec<(String, UserProfile)> {
        let mut rows: Vec<_> = self
            .profiles
            .iter()
            .map(|(id, p)| (id.clone(), *p))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

// ============================================================================
// TESTS
// ============================================================================
