//! Capability set the migration engine needs from a destination directory.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::directory::{DirectoryGroup, DirectoryUser, NewGroup, NewUser};

/// Destination directory operations. Implementations hold no domain state.
///
/// `get_user` distinguishes three cases: `Ok(Some(_))` found, `Ok(None)`
/// not found, and `Err(_)` for every other failure, which callers must not
/// read as absence.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>>;
    async fn get_user(&self, principal_name: &str) -> Result<Option<DirectoryUser>>;
    async fn create_user(&self, user: &NewUser) -> Result<DirectoryUser>;
    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>>;
    async fn create_group(&self, group: &NewGroup) -> Result<DirectoryGroup>;
    async fn add_member(&self, group_id: &str, user_id: &str) -> Result<()>;
}
