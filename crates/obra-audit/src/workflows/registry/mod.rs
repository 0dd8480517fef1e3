//! Sites ("obras") and the users who audit or follow them.

pub mod domain;
pub mod repository;
pub mod router;

pub use domain::{NewSite, NewUser, Site, SiteId, User, UserId, UserRole};
pub use repository::{RepositoryError, SiteRepository, UserRepository};
pub use router::registry_router;
