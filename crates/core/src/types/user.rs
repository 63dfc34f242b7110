//! Signed-in user as reported by the identity provider.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::Uid;

/// The session user: present only while authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: Uid,
    pub email: Email,
}
