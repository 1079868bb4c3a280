use crate::common::Identity;
use crate::error::{LoginError, StoreError};
use crate::network::ApiClient;
use crate::storage::SessionDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

/// Exchange username and password for a token and persist the identity.
pub async fn sign_in(
    api: &ApiClient,
    store: &SessionDatabase,
    mode: AuthMode,
    username: &str,
    password: &str,
) -> Result<Identity, LoginError> {
    let identity = match mode {
        AuthMode::Login => api.login(username, password).await?,
        AuthMode::Signup => api.signup(username, password).await?,
    };
    store.save_identity(&identity)?;
    Ok(identity)
}

/// Forget the stored identity. A connected session notices on its next send.
pub fn sign_out(store: &SessionDatabase) -> Result<(), StoreError> {
    store.clear_identity()
}
