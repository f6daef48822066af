use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters kept from the username digest.
const USER_ID_LEN: usize = 16;

/// The identity carried by a token. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub username: String,
}

impl UserIdentity {
    /// Builds the identity for an already-normalized username. The same
    /// username always maps to the same id; there is no uniqueness store.
    pub fn from_username(username: &str) -> Self {
        Self {
            id: derive_user_id(username),
            username: username.to_string(),
        }
    }
}

pub fn derive_user_id(username: &str) -> String {
    let digest = Sha256::digest(username.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(USER_ID_LEN);
    id
}
