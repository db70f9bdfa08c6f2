use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Agent,
    Admin,
}

impl UserRole {
    /// Parse the role claim carried in the JWT. Unknown values degrade to
    /// the least privileged role.
    pub fn from_claim(role: &str) -> Self {
        match role {
            "admin" => UserRole::Admin,
            "agent" => UserRole::Agent,
            _ => UserRole::Customer,
        }
    }
}
