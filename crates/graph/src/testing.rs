//! In-memory `DirectoryClient` used by engine tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use cloudlift_core::directory::DirectoryClient;
use cloudlift_core::error::{CloudliftError, Result};
use cloudlift_core::models::directory::{DirectoryGroup, DirectoryUser, NewGroup, NewUser};

#[derive(Default)]
pub struct FakeState {
    pub users: Vec<DirectoryUser>,
    pub created_users: Vec<NewUser>,
    pub groups: Vec<DirectoryGroup>,
    pub members: Vec<(String, String)>,
    pub list_users_calls: usize,
    pub get_user_calls: usize,
    pub create_user_calls: usize,
    pub list_groups_calls: usize,
    pub create_group_calls: usize,
    pub add_member_calls: usize,
    /// Write-side calls in order, stamped with the (possibly paused) clock.
    pub timeline: Vec<(&'static str, Instant)>,
    /// Principal names whose lookup fails with a server error.
    pub failing_lookups: HashSet<String>,
    /// Principal names whose creation is rejected.
    pub failing_creates: HashSet<String>,
    /// The next N `add_member` calls report the user as not found.
    pub invisible_adds: u32,
    /// Every `add_member` call fails with this error.
    pub add_member_error: Option<(u16, String)>,
    /// Group that exists but only shows up in listings after a create attempt.
    pub racing_group: Option<DirectoryGroup>,
}

#[derive(Default)]
pub struct FakeDirectory {
    pub state: Mutex<FakeState>,
}

impl FakeDirectory {
    pub fn with_users(principal_names: &[&str]) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            for (i, upn) in principal_names.iter().enumerate() {
                state.users.push(DirectoryUser {
                    id: format!("existing-{i}"),
                    principal_name: upn.to_string(),
                });
            }
        }
        fake
    }

    pub fn with_state(self, f: impl FnOnce(&mut FakeState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&FakeState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }
}

fn api_error(status: u16, code: &str, message: &str) -> CloudliftError {
    CloudliftError::DirectoryApi {
        status,
        code: code.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        let mut state = self.state.lock().unwrap();
        state.list_users_calls += 1;
        Ok(state.users.clone())
    }

    async fn get_user(&self, principal_name: &str) -> Result<Option<DirectoryUser>> {
        let mut state = self.state.lock().unwrap();
        state.get_user_calls += 1;
        if state.failing_lookups.contains(principal_name) {
            return Err(api_error(503, "ServiceUnavailable", "try later"));
        }
        Ok(state
            .users
            .iter()
            .find(|u| u.principal_name.eq_ignore_ascii_case(principal_name))
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<DirectoryUser> {
        let mut state = self.state.lock().unwrap();
        state.create_user_calls += 1;
        state.timeline.push(("create_user", Instant::now()));
        if state.failing_creates.contains(&user.principal_name) {
            return Err(api_error(
                400,
                "Request_BadRequest",
                "Property userPrincipalName is invalid.",
            ));
        }
        let created = DirectoryUser {
            id: format!("new-{}", state.created_users.len()),
            principal_name: user.principal_name.clone(),
        };
        state.users.push(created.clone());
        state.created_users.push(user.clone());
        Ok(created)
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        let mut state = self.state.lock().unwrap();
        state.list_groups_calls += 1;
        Ok(state.groups.clone())
    }

    async fn create_group(&self, group: &NewGroup) -> Result<DirectoryGroup> {
        let mut state = self.state.lock().unwrap();
        state.create_group_calls += 1;
        if let Some(racing) = state.racing_group.take() {
            if racing.display_name == group.display_name {
                state.groups.push(racing);
                return Err(api_error(
                    400,
                    "Request_BadRequest",
                    "Another object with the same value for property displayName already exists.",
                ));
            }
            state.racing_group = Some(racing);
        }
        let created = DirectoryGroup {
            id: format!("group-{}", state.groups.len()),
            display_name: group.display_name.clone(),
        };
        state.groups.push(created.clone());
        Ok(created)
    }

    async fn add_member(&self, group_id: &str, user_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.add_member_calls += 1;
        state.timeline.push(("add_member", Instant::now()));
        if state.invisible_adds > 0 {
            state.invisible_adds -= 1;
            return Err(api_error(
                404,
                "Request_ResourceNotFound",
                "Resource does not exist or one of its queried reference-property objects are not present.",
            ));
        }
        if let Some((status, message)) = &state.add_member_error {
            return Err(api_error(*status, "Authorization_RequestDenied", message));
        }
        let pair = (group_id.to_string(), user_id.to_string());
        if state.members.contains(&pair) {
            return Err(api_error(
                400,
                "Request_BadRequest",
                "One or more added object references already exist for the following modified properties: 'members'.",
            ));
        }
        state.members.push(pair);
        Ok(())
    }
}
