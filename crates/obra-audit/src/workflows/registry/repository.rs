use super::domain::{Site, SiteId, User, UserId};

/// Storage for registered sites.
pub trait SiteRepository: Send + Sync {
    fn list(&self) -> Result<Vec<Site>, RepositoryError>;
    fn create(&self, site: Site) -> Result<Site, RepositoryError>;
    fn fetch(&self, id: &SiteId) -> Result<Option<Site>, RepositoryError>;
}

/// Storage for users and their site memberships.
pub trait UserRepository: Send + Sync {
    fn list(&self) -> Result<Vec<User>, RepositoryError>;
    fn create(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn update(&self, user: User) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
