use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{User, UserId};
use super::error::ListingError;
use super::store::{ListingStore, StoreError};
use crate::identity::VerifiedIdentity;

/// Optional self-declared profile supplied at registration. Absent fields fall back to the
/// attributes asserted by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

pub struct AccountService<S> {
    store: Arc<S>,
}

impl<S> AccountService<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn register(
        &self,
        identity: &VerifiedIdentity,
        profile: Option<RegistrationProfile>,
    ) -> Result<User, ListingError> {
        if self.store.user_by_subject(&identity.subject)?.is_some() {
            return Err(ListingError::AlreadyExists(
                "an account is already registered for this identity".to_string(),
            ));
        }

        let profile = profile.unwrap_or_default();
        let name = profile
            .name
            .or_else(|| identity.name.clone())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ListingError::validation("name", "a display name is required"))?;

        let now = Utc::now();
        let user = User {
            id: UserId::random(),
            subject: identity.subject.clone(),
            name,
            email: profile.email.or_else(|| identity.email.clone()),
            phone: profile.phone.or_else(|| identity.phone.clone()),
            avatar_url: profile.avatar_url.or_else(|| identity.picture.clone()),
            created_at: now,
            updated_at: now,
        };

        let user = self.store.insert_user(user).map_err(|err| match err {
            StoreError::Conflict(_) => ListingError::AlreadyExists(
                "an account is already registered for this identity".to_string(),
            ),
            other => ListingError::Store(other),
        })?;
        info!(user_id = %user.id, "registered marketplace account");
        Ok(user)
    }

    pub fn me(&self, identity: &VerifiedIdentity) -> Result<User, ListingError> {
        resolve_caller(self.store.as_ref(), identity)
    }
}

/// Looks up the account behind a verified identity.
pub(crate) fn resolve_caller<S>(store: &S, identity: &VerifiedIdentity) -> Result<User, ListingError>
where
    S: ListingStore + ?Sized,
{
    store
        .user_by_subject(&identity.subject)?
        .ok_or_else(|| ListingError::not_found("user", &identity.subject))
}
