use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use shared_types::{AppError, Role, SessionDefaults};
use uuid::Uuid;

use super::store::{
    AccessSnapshot, AccessStore, ClientGrant, ClientRecord, DefaultRef, UserRecord,
    WorkspaceGrant, WorkspaceRecord,
};

#[derive(Default)]
struct MemoryState {
    next_user_id: i64,
    users: HashMap<i64, UserRecord>,
    clients: HashMap<Uuid, ClientRecord>,
    workspaces: HashMap<Uuid, WorkspaceRecord>,
    client_access: HashMap<(i64, Uuid), Option<Role>>,
    workspace_access: HashMap<(i64, Uuid), Option<Role>>,
    defaults: HashMap<i64, SessionDefaults>,
}

/// In-process access store used by tests and local runs without Postgres.
///
/// Mirrors the relational schema: deleting a client or workspace removes
/// its grants but leaves stored defaults pointing at it.
#[derive(Default)]
pub struct MemoryAccessStore {
    state: RwLock<MemoryState>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_user(&self, email: &str, display_name: &str, super_admin: bool) -> i64 {
        let mut state = self.write();
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.users.insert(
            id,
            UserRecord {
                id,
                email: email.to_string(),
                display_name: display_name.to_string(),
                super_admin,
            },
        );
        id
    }

    pub fn insert_client(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.write().clients.insert(
            id,
            ClientRecord {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// Panics if the client does not exist; seeding helper only.
    pub fn insert_workspace(&self, client_id: Uuid, name: &str) -> Uuid {
        let mut state = self.write();
        assert!(
            state.clients.contains_key(&client_id),
            "workspace must belong to an existing client"
        );
        let id = Uuid::new_v4();
        state.workspaces.insert(
            id,
            WorkspaceRecord {
                id,
                client_id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn delete_workspace(&self, workspace_id: Uuid) {
        let mut state = self.write();
        state.workspaces.remove(&workspace_id);
        state
            .workspace_access
            .retain(|(_, ws), _| *ws != workspace_id);
    }

    pub fn delete_client(&self, client_id: Uuid) {
        let mut state = self.write();
        state.clients.remove(&client_id);
        state.client_access.retain(|(_, c), _| *c != client_id);
        let orphaned: Vec<Uuid> = state
            .workspaces
            .values()
            .filter(|ws| ws.client_id == client_id)
            .map(|ws| ws.id)
            .collect();
        for ws in orphaned {
            state.workspaces.remove(&ws);
            state.workspace_access.retain(|(_, w), _| *w != ws);
        }
    }

    /// The raw stored defaults, including dangling ids.
    pub fn stored_defaults(&self, user_id: i64) -> Option<SessionDefaults> {
        self.read().defaults.get(&user_id).copied()
    }
}

impl AccessStore for MemoryAccessStore {
    async fn load_snapshot(&self, user_id: i64) -> Result<Option<AccessSnapshot>, AppError> {
        let state = self.read();
        let Some(user) = state.users.get(&user_id).cloned() else {
            return Ok(None);
        };

        let clients = state
            .client_access
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .filter_map(|((_, client_id), role)| {
                state.clients.get(client_id).map(|client| ClientGrant {
                    client_id: client.id,
                    client_name: client.name.clone(),
                    role: *role,
                })
            })
            .collect();

        let workspaces = state
            .workspace_access
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .filter_map(|((_, workspace_id), role)| {
                state.workspaces.get(workspace_id).map(|ws| WorkspaceGrant {
                    workspace_id: ws.id,
                    client_id: ws.client_id,
                    workspace_name: ws.name.clone(),
                    role: *role,
                })
            })
            .collect();

        let stored = state.defaults.get(&user_id).copied().unwrap_or_default();
        let default_client = DefaultRef::from_lookup(
            stored.client_id,
            stored
                .client_id
                .is_some_and(|id| state.clients.contains_key(&id)),
        );
        let default_workspace = DefaultRef::from_lookup(
            stored.workspace_id,
            stored
                .workspace_id
                .is_some_and(|id| state.workspaces.contains_key(&id)),
        );

        Ok(Some(AccessSnapshot {
            user,
            clients,
            workspaces,
            default_client,
            default_workspace,
        }))
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, AppError> {
        Ok(self.read().users.get(&user_id).cloned())
    }

    async fn find_client(&self, client_id: Uuid) -> Result<Option<ClientRecord>, AppError> {
        Ok(self.read().clients.get(&client_id).cloned())
    }

    async fn find_workspace(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<WorkspaceRecord>, AppError> {
        Ok(self.read().workspaces.get(&workspace_id).cloned())
    }

    async fn has_client_access(&self, user_id: i64, client_id: Uuid) -> Result<bool, AppError> {
        Ok(self.read().client_access.contains_key(&(user_id, client_id)))
    }

    async fn has_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .read()
            .workspace_access
            .contains_key(&(user_id, workspace_id)))
    }

    async fn upsert_defaults(
        &self,
        user_id: i64,
        defaults: SessionDefaults,
    ) -> Result<(), AppError> {
        self.write().defaults.insert(user_id, defaults);
        Ok(())
    }

    async fn clear_defaults(&self, user_id: i64) -> Result<(), AppError> {
        self.write().defaults.remove(&user_id);
        Ok(())
    }

    async fn set_client_access(
        &self,
        user_id: i64,
        client_id: Uuid,
        role: Option<Role>,
    ) -> Result<(), AppError> {
        let mut state = self.write();
        if !state.users.contains_key(&user_id) {
            return Err(AppError::not_found("User not found").with_resource("user"));
        }
        if !state.clients.contains_key(&client_id) {
            return Err(AppError::not_found("Client not found").with_resource("client"));
        }
        state.client_access.insert((user_id, client_id), role);
        Ok(())
    }

    async fn remove_client_access(&self, user_id: i64, client_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .write()
            .client_access
            .remove(&(user_id, client_id))
            .is_some())
    }

    async fn set_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
        role: Option<Role>,
    ) -> Result<(), AppError> {
        let mut state = self.write();
        if !state.users.contains_key(&user_id) {
            return Err(AppError::not_found("User not found").with_resource("user"));
        }
        if !state.workspaces.contains_key(&workspace_id) {
            return Err(AppError::not_found("Workspace not found").with_resource("workspace"));
        }
        state.workspace_access.insert((user_id, workspace_id), role);
        Ok(())
    }

    async fn remove_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> Result<bool, AppError> {
        Ok(self
            .write()
            .workspace_access
            .remove(&(user_id, workspace_id))
            .is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
