//! Session manager
//!
//! Login/logout and the self profile. Authentication is delegated to the
//! [`Authenticator`] collaborator; this service only keeps the profile
//! directory of logged-in users.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{LoginUserInfo, UserId};

/// Identity backend validating `(sdk_app_id, user_id, user_sig)` triples.
/// Opaque to this layer; implementations typically call a remote service.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, sdk_app_id: u32, user_id: &UserId, user_sig: &str) -> Result<()>;
}

/// Authenticator that accepts any non-empty signature. For development
/// and tests.
#[derive(Debug, Default)]
pub struct AcceptAnySig;

#[async_trait]
impl Authenticator for AcceptAnySig {
    async fn authenticate(&self, _sdk_app_id: u32, _user_id: &UserId, user_sig: &str) -> Result<()> {
        if user_sig.is_empty() {
            return Err(Error::InvalidParameter("empty user signature".to_string()));
        }
        Ok(())
    }
}

/// Session service
#[derive(Clone)]
pub struct SessionService {
    authenticator: Arc<dyn Authenticator>,
    profiles: DashMap<UserId, LoginUserInfo>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("logged_in", &self.profiles.len())
            .finish()
    }
}

impl SessionService {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            profiles: DashMap::new(),
        }
    }

    /// Validate credentials and register the user's profile
    pub async fn login(
        &self,
        sdk_app_id: u32,
        user_id: UserId,
        user_sig: &str,
    ) -> Result<LoginUserInfo> {
        if user_id.as_str().is_empty() {
            return Err(Error::InvalidParameter("empty user id".to_string()));
        }
        self.authenticator
            .authenticate(sdk_app_id, &user_id, user_sig)
            .await?;

        let profile = self
            .profiles
            .entry(user_id.clone())
            .or_insert_with(|| LoginUserInfo {
                user_id: user_id.clone(),
                user_name: user_id.to_string(),
                avatar_url: String::new(),
            })
            .clone();
        tracing::info!(user_id = %user_id, "user logged in");
        Ok(profile)
    }

    pub fn logout(&self, user_id: &UserId) -> Result<()> {
        if self.profiles.remove(user_id).is_none() {
            return Err(Error::SdkNotInitialized);
        }
        tracing::info!(user_id = %user_id, "user logged out");
        Ok(())
    }

    pub fn is_logged_in(&self, user_id: &UserId) -> bool {
        self.profiles.contains_key(user_id)
    }

    pub fn get_self_info(&self, user_id: &UserId) -> Result<LoginUserInfo> {
        self.profiles
            .get(user_id)
            .map(|profile| profile.clone())
            .ok_or(Error::SdkNotInitialized)
    }

    /// Update the self profile; synced to rooms on the next entry
    pub fn set_self_info(
        &self,
        user_id: &UserId,
        user_name: &str,
        avatar_url: &str,
    ) -> Result<LoginUserInfo> {
        if user_name.is_empty() {
            return Err(Error::InvalidParameter("empty user name".to_string()));
        }
        let mut profile = self
            .profiles
            .get_mut(user_id)
            .ok_or(Error::SdkNotInitialized)?;
        profile.user_name = user_name.to_string();
        profile.avatar_url = avatar_url.to_string();
        Ok(profile.clone())
    }
}
