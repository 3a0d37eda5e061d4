//! Dual-session authentication state
//!
//! The app carries two independent login contexts: an app *role*
//! (database-level rights for search and place mutation) and a personal
//! *account* (lists, groups). Either can be present without the other,
//! and no flow may infer one from the other.

pub mod store;

use crate::api::PlacesApi;
use crate::Result;
use std::sync::Arc;
use store::{CredentialSlot, CredentialStore};

/// Active app-role context from `/auth/check`
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSession {
    pub role: String,
    pub permissions: Vec<String>,
}

/// Active personal-account context from `/api/users/profile`
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSession {
    pub user_id: i64,
    pub username: String,
    pub email: Option<String>,
}

/// Both sessions plus the credential store they persist through
pub struct SessionState {
    role: Option<RoleSession>,
    account: Option<AccountSession>,
    credentials: Arc<dyn CredentialStore>,
}

impl SessionState {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            role: None,
            account: None,
            credentials,
        }
    }

    pub fn role(&self) -> Option<&RoleSession> {
        self.role.as_ref()
    }

    pub fn account(&self) -> Option<&AccountSession> {
        self.account.as_ref()
    }

    fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.role.as_str())
    }

    /// Either session is enough to call the app "logged in"
    pub fn is_usable(&self) -> bool {
        self.role.is_some() || self.account.is_some()
    }

    pub fn has_account(&self) -> bool {
        self.account.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role_name() == Some("admin_user")
    }

    /// Roles allowed to add individual places
    pub fn can_add_places(&self) -> bool {
        matches!(
            self.role_name(),
            Some("admin_user" | "app_user" | "curator_user")
        )
    }

    /// Membership test against the role's permission list
    pub fn can(&self, permission: &str) -> bool {
        self.role
            .as_ref()
            .map(|r| r.permissions.iter().any(|p| p == permission))
            .unwrap_or(false)
    }

    /// Re-validates the stored role credential.
    ///
    /// Any failure (no credential, network error, or
    /// `authenticated: false`) clears both the session and the stored
    /// credential; the caller only sees the resulting `bool`.
    pub async fn check_role(&mut self, api: &dyn PlacesApi) -> bool {
        if self.credentials.get(CredentialSlot::Role).is_none() {
            self.role = None;
            return false;
        }
        match api.check_role_auth().await {
            Ok(check) if check.authenticated => {
                if let Some(role) = check.effective_role() {
                    self.role = Some(RoleSession {
                        role: role.to_string(),
                        permissions: check.permissions,
                    });
                    return true;
                }
                log::warn!("auth check succeeded without a role name");
                self.drop_role();
                false
            }
            Ok(_) => {
                self.drop_role();
                false
            }
            Err(e) => {
                log::warn!("role auth check failed: {e}");
                self.drop_role();
                false
            }
        }
    }

    /// Re-validates the stored account credential via the profile endpoint.
    pub async fn check_account(&mut self, api: &dyn PlacesApi) -> bool {
        if self.credentials.get(CredentialSlot::Account).is_none() {
            self.account = None;
            return false;
        }
        match api.profile().await {
            Ok(profile) => {
                self.account = Some(AccountSession {
                    user_id: profile.user.user_id,
                    username: profile.user.username,
                    email: profile.user.email,
                });
                true
            }
            Err(e) => {
                log::warn!("account check failed: {e}");
                self.drop_account();
                false
            }
        }
    }

    pub async fn login_role(
        &mut self,
        api: &dyn PlacesApi,
        username: &str,
        password: &str,
    ) -> Result<RoleSession> {
        let login = api.login_role(username, password).await?;
        let token = login.token.as_deref().ok_or_else(|| {
            crate::Error::Validation("login succeeded but no token was returned".to_string())
        })?;
        self.credentials.set(CredentialSlot::Role, token);

        // The login response carries role and permissions, but the
        // follow-up check keeps the session consistent with what the
        // token actually resolves to.
        if self.check_role(api).await {
            self.role.clone().ok_or_else(|| {
                crate::Error::Validation("role check lost the session".to_string())
            })
        } else {
            Err(crate::Error::api(401, "Invalid username or password"))
        }
    }

    pub async fn login_account(
        &mut self,
        api: &dyn PlacesApi,
        username: &str,
        password: &str,
    ) -> Result<AccountSession> {
        let login = api.login_account(username, password).await?;
        let token = login.token.as_deref().ok_or_else(|| {
            crate::Error::Validation("login succeeded but no token was returned".to_string())
        })?;
        self.credentials.set(CredentialSlot::Account, token);

        if let Some(user) = login.user {
            let session = AccountSession {
                user_id: user.user_id,
                username: user.username,
                email: user.email,
            };
            self.account = Some(session.clone());
            Ok(session)
        } else if self.check_account(api).await {
            self.account.clone().ok_or_else(|| {
                crate::Error::Validation("account check lost the session".to_string())
            })
        } else {
            Err(crate::Error::api(401, "Invalid username or password"))
        }
    }

    /// Registers a new account, then logs straight into it
    pub async fn register_account(
        &mut self,
        api: &dyn PlacesApi,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountSession> {
        let registered = api.register_account(username, email, password).await?;
        log::info!("registered account {}", registered.user.username);
        self.login_account(api, username, password).await
    }

    /// Best-effort server logout, then unconditional local teardown
    pub async fn logout_role(&mut self, api: &dyn PlacesApi) {
        if let Err(e) = api.logout_role().await {
            log::debug!("role logout request failed: {e}");
        }
        self.drop_role();
    }

    /// Purely local teardown: the account system has no server-side
    /// logout endpoint, the token is simply discarded
    pub fn logout_account(&mut self) {
        log::debug!("dropping account session");
        self.drop_account();
    }

    fn drop_role(&mut self) {
        self.credentials.clear(CredentialSlot::Role);
        self.role = None;
    }

    fn drop_account(&mut self) {
        self.credentials.clear(CredentialSlot::Account);
        self.account = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryCredentialStore;

    fn state_with_role(role: &str, permissions: &[&str]) -> SessionState {
        let mut state = SessionState::new(Arc::new(MemoryCredentialStore::new()));
        state.role = Some(RoleSession {
            role: role.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        });
        state
    }

    #[test]
    fn test_predicates_without_sessions() {
        let state = SessionState::new(Arc::new(MemoryCredentialStore::new()));
        assert!(!state.is_usable());
        assert!(!state.is_admin());
        assert!(!state.can_add_places());
        assert!(!state.can("SELECT"));
        assert!(!state.has_account());
    }

    #[test]
    fn test_add_rights_by_role() {
        assert!(state_with_role("admin_user", &[]).can_add_places());
        assert!(state_with_role("app_user", &[]).can_add_places());
        assert!(state_with_role("curator_user", &[]).can_add_places());
        assert!(!state_with_role("viewer_user", &[]).can_add_places());
    }

    #[test]
    fn test_admin_is_only_admin_user() {
        assert!(state_with_role("admin_user", &[]).is_admin());
        assert!(!state_with_role("app_user", &[]).is_admin());
    }

    #[test]
    fn test_permission_membership() {
        let state = state_with_role("app_user", &["SELECT", "INSERT"]);
        assert!(state.can("SELECT"));
        assert!(!state.can("DELETE"));
    }

    #[test]
    fn test_account_logout_is_local_only() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set(CredentialSlot::Account, "account-token");
        let mut state = SessionState::new(store.clone());
        state.account = Some(AccountSession {
            user_id: 1,
            username: "sam".to_string(),
            email: None,
        });

        // No API handle involved; the token is discarded client-side
        state.logout_account();
        assert!(!state.has_account());
        assert!(store.get(CredentialSlot::Account).is_none());
    }

    #[test]
    fn test_account_session_does_not_grant_role_rights() {
        let mut state = SessionState::new(Arc::new(MemoryCredentialStore::new()));
        state.account = Some(AccountSession {
            user_id: 1,
            username: "sam".to_string(),
            email: None,
        });
        assert!(state.is_usable());
        assert!(state.has_account());
        assert!(!state.can_add_places());
        assert!(!state.is_admin());
    }
}
