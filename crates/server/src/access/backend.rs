use std::sync::Arc;

use shared_types::{AppError, Role, SessionDefaults};
use uuid::Uuid;

use super::memory::MemoryAccessStore;
use super::pg::PgAccessStore;
use super::store::{AccessSnapshot, AccessStore, ClientRecord, UserRecord, WorkspaceRecord};

/// The store handed to request handlers.
///
/// Handlers extract `State<AccessBackend>`; the variant is chosen at startup.
#[derive(Clone)]
pub enum AccessBackend {
    Postgres(PgAccessStore),
    Memory(Arc<MemoryAccessStore>),
}

impl From<PgAccessStore> for AccessBackend {
    fn from(store: PgAccessStore) -> Self {
        AccessBackend::Postgres(store)
    }
}

impl From<Arc<MemoryAccessStore>> for AccessBackend {
    fn from(store: Arc<MemoryAccessStore>) -> Self {
        AccessBackend::Memory(store)
    }
}

impl AccessStore for AccessBackend {
    async fn load_snapshot(&self, user_id: i64) -> Result<Option<AccessSnapshot>, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.load_snapshot(user_id).await,
            AccessBackend::Memory(s) => s.load_snapshot(user_id).await,
        }
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.find_user(user_id).await,
            AccessBackend::Memory(s) => s.find_user(user_id).await,
        }
    }

    async fn find_client(&self, client_id: Uuid) -> Result<Option<ClientRecord>, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.find_client(client_id).await,
            AccessBackend::Memory(s) => s.find_client(client_id).await,
        }
    }

    async fn find_workspace(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<WorkspaceRecord>, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.find_workspace(workspace_id).await,
            AccessBackend::Memory(s) => s.find_workspace(workspace_id).await,
        }
    }

    async fn has_client_access(&self, user_id: i64, client_id: Uuid) -> Result<bool, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.has_client_access(user_id, client_id).await,
            AccessBackend::Memory(s) => s.has_client_access(user_id, client_id).await,
        }
    }

    async fn has_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> Result<bool, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.has_workspace_access(user_id, workspace_id).await,
            AccessBackend::Memory(s) => s.has_workspace_access(user_id, workspace_id).await,
        }
    }

    async fn upsert_defaults(
        &self,
        user_id: i64,
        defaults: SessionDefaults,
    ) -> Result<(), AppError> {
        match self {
            AccessBackend::Postgres(s) => s.upsert_defaults(user_id, defaults).await,
            AccessBackend::Memory(s) => s.upsert_defaults(user_id, defaults).await,
        }
    }

    async fn clear_defaults(&self, user_id: i64) -> Result<(), AppError> {
        match self {
            AccessBackend::Postgres(s) => s.clear_defaults(user_id).await,
            AccessBackend::Memory(s) => s.clear_defaults(user_id).await,
        }
    }

    async fn set_client_access(
        &self,
        user_id: i64,
        client_id: Uuid,
        role: Option<Role>,
    ) -> Result<(), AppError> {
        match self {
            AccessBackend::Postgres(s) => s.set_client_access(user_id, client_id, role).await,
            AccessBackend::Memory(s) => s.set_client_access(user_id, client_id, role).await,
        }
    }

    async fn remove_client_access(&self, user_id: i64, client_id: Uuid) -> Result<bool, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.remove_client_access(user_id, client_id).await,
            AccessBackend::Memory(s) => s.remove_client_access(user_id, client_id).await,
        }
    }

    async fn set_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
        role: Option<Role>,
    ) -> Result<(), AppError> {
        match self {
            AccessBackend::Postgres(s) => s.set_workspace_access(user_id, workspace_id, role).await,
            AccessBackend::Memory(s) => s.set_workspace_access(user_id, workspace_id, role).await,
        }
    }

    async fn remove_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> Result<bool, AppError> {
        match self {
            AccessBackend::Postgres(s) => s.remove_workspace_access(user_id, workspace_id).await,
            AccessBackend::Memory(s) => s.remove_workspace_access(user_id, workspace_id).await,
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        match self {
            AccessBackend::Postgres(s) => s.ping().await,
            AccessBackend::Memory(s) => s.ping().await,
        }
    }
}
