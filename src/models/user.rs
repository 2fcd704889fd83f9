use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String, // bcrypt hash, never the plain password
    pub project_seq: u64,      // counter used to mint this user's project ids
}
