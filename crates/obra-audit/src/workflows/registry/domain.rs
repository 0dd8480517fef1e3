use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteId(pub String);

impl SiteId {
    pub fn generate() -> Self {
        Self(format!("site-{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Construction site under inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub address: String,
    pub contractor: String,
    pub created_at: DateTime<Utc>,
}

/// Payload accepted when registering a site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSite {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contractor: String,
}

impl NewSite {
    pub fn into_site(self, created_at: DateTime<Utc>) -> Site {
        Site {
            id: SiteId::generate(),
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            contractor: self.contractor.trim().to_string(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(format!("usr-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Auditor,
    Client,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::Auditor => "Auditor",
            UserRole::Client => "Client",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub site_ids: BTreeSet<SiteId>,
}

impl User {
    /// Flip membership of `site_id`; returns whether the site is now linked.
    pub fn toggle_site(&mut self, site_id: SiteId) -> bool {
        if self.site_ids.remove(&site_id) {
            false
        } else {
            self.site_ids.insert(site_id);
            true
        }
    }

    pub fn follows(&self, site_id: &SiteId) -> bool {
        self.site_ids.contains(site_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub site_ids: BTreeSet<SiteId>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: UserId::generate(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_ascii_lowercase(),
            role: self.role,
            site_ids: self.site_ids,
        }
    }
}
