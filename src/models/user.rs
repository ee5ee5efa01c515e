use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace roles. A user may hold both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Helper,
}

/// Stored user document. `password` holds the bcrypt hash and never leaves
/// the server; responses use `UserProfile` or `UserSummary` instead.
///
/// The posted/applied task lists are deliberately not stored here. They are
/// derived views over the task collection (`posted_by` / `applicants`) and
/// are computed on read by the profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<Role>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_photo: String,
    pub created_at: DateTime<Utc>,
}

/// Password-free projection returned by the auth endpoints.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub bio: String,
    pub profile_photo: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            bio: user.bio.clone(),
            profile_photo: user.profile_photo.clone(),
        }
    }
}

/// Snapshot embedded in enriched task reads: id, display name and avatar.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub name: String,
    pub profile_photo: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            profile_photo: user.profile_photo.clone(),
        }
    }
}
