use shared_types::{AppError, Role, SessionDefaults};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::store::{
    parse_stored_role, AccessSnapshot, AccessStore, ClientGrant, ClientRecord, DefaultRef,
    UserRecord, WorkspaceGrant, WorkspaceRecord,
};
use crate::error_convert::SqlxErrorExt;

/// Postgres-backed access store.
#[derive(Clone)]
pub struct PgAccessStore {
    pool: Pool<Postgres>,
}

impl PgAccessStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    display_name: String,
    super_admin: bool,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            super_admin: row.super_admin,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ClientGrantRow {
    client_id: Uuid,
    client_name: String,
    role: Option<String>,
}

#[derive(sqlx::FromRow)]
struct WorkspaceGrantRow {
    workspace_id: Uuid,
    client_id: Uuid,
    workspace_name: String,
    role: Option<String>,
}

#[derive(sqlx::FromRow)]
struct DefaultsRow {
    default_client_id: Option<Uuid>,
    default_workspace_id: Option<Uuid>,
    client_exists: bool,
    workspace_exists: bool,
}

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: Uuid,
    client_id: Uuid,
    name: String,
}

impl AccessStore for PgAccessStore {
    async fn load_snapshot(&self, user_id: i64) -> Result<Option<AccessSnapshot>, AppError> {
        let mut tx = self.pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

        // All four reads see the same snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, super_admin FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        let Some(user) = user else {
            tx.rollback().await.map_err(SqlxErrorExt::into_app_error)?;
            return Ok(None);
        };

        let clients = sqlx::query_as::<_, ClientGrantRow>(
            r#"SELECT ca.client_id, c.name AS client_name, ca.role
               FROM client_access ca
               JOIN clients c ON c.id = ca.client_id
               WHERE ca.user_id = $1"#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        let workspaces = sqlx::query_as::<_, WorkspaceGrantRow>(
            r#"SELECT wa.workspace_id, w.client_id, w.name AS workspace_name, wa.role
               FROM workspace_access wa
               JOIN workspaces w ON w.id = wa.workspace_id
               WHERE wa.user_id = $1"#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        let defaults = sqlx::query_as::<_, DefaultsRow>(
            r#"SELECT ds.default_client_id,
                      ds.default_workspace_id,
                      (c.id IS NOT NULL) AS client_exists,
                      (w.id IS NOT NULL) AS workspace_exists
               FROM default_selections ds
               LEFT JOIN clients c ON c.id = ds.default_client_id
               LEFT JOIN workspaces w ON w.id = ds.default_workspace_id
               WHERE ds.user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

        let (default_client, default_workspace) = match defaults {
            Some(row) => (
                DefaultRef::from_lookup(row.default_client_id, row.client_exists),
                DefaultRef::from_lookup(row.default_workspace_id, row.workspace_exists),
            ),
            None => (DefaultRef::Unset, DefaultRef::Unset),
        };

        Ok(Some(AccessSnapshot {
            user: user.into(),
            clients: clients
                .into_iter()
                .map(|row| ClientGrant {
                    role: parse_stored_role(row.role.as_deref()),
                    client_id: row.client_id,
                    client_name: row.client_name,
                })
                .collect(),
            workspaces: workspaces
                .into_iter()
                .map(|row| WorkspaceGrant {
                    role: parse_stored_role(row.role.as_deref()),
                    workspace_id: row.workspace_id,
                    client_id: row.client_id,
                    workspace_name: row.workspace_name,
                })
                .collect(),
            default_client,
            default_workspace,
        }))
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, super_admin FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_client(&self, client_id: Uuid) -> Result<Option<ClientRecord>, AppError> {
        let row = sqlx::query_as::<_, ClientRow>("SELECT id, name FROM clients WHERE id = $1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

        Ok(row.map(|r| ClientRecord {
            id: r.id,
            name: r.name,
        }))
    }

    async fn find_workspace(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<WorkspaceRecord>, AppError> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT id, client_id, name FROM workspaces WHERE id = $1",
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(row.map(|r| WorkspaceRecord {
            id: r.id,
            client_id: r.client_id,
            name: r.name,
        }))
    }

    async fn has_client_access(&self, user_id: i64, client_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM client_access WHERE user_id = $1 AND client_id = $2)",
        )
        .bind(user_id)
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
    }

    async fn has_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM workspace_access WHERE user_id = $1 AND workspace_id = $2)",
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
    }

    async fn upsert_defaults(
        &self,
        user_id: i64,
        defaults: SessionDefaults,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO default_selections (user_id, default_client_id, default_workspace_id, updated_at)
               VALUES ($1, $2, $3, NOW())
               ON CONFLICT (user_id) DO UPDATE
               SET default_client_id = EXCLUDED.default_client_id,
                   default_workspace_id = EXCLUDED.default_workspace_id,
                   updated_at = NOW()"#,
        )
        .bind(user_id)
        .bind(defaults.client_id)
        .bind(defaults.workspace_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(())
    }

    async fn clear_defaults(&self, user_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM default_selections WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

        Ok(())
    }

    async fn set_client_access(
        &self,
        user_id: i64,
        client_id: Uuid,
        role: Option<Role>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO client_access (user_id, client_id, role)
               VALUES ($1, $2, $3)
               ON CONFLICT (user_id, client_id) DO UPDATE SET role = EXCLUDED.role"#,
        )
        .bind(user_id)
        .bind(client_id)
        .bind(role.map(|r| r.as_str()))
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(())
    }

    async fn remove_client_access(&self, user_id: i64, client_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM client_access WHERE user_id = $1 AND client_id = $2")
            .bind(user_id)
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
        role: Option<Role>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO workspace_access (user_id, workspace_id, role)
               VALUES ($1, $2, $3)
               ON CONFLICT (user_id, workspace_id) DO UPDATE SET role = EXCLUDED.role"#,
        )
        .bind(user_id)
        .bind(workspace_id)
        .bind(role.map(|r| r.as_str()))
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(())
    }

    async fn remove_workspace_access(
        &self,
        user_id: i64,
        workspace_id: Uuid,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM workspace_access WHERE user_id = $1 AND workspace_id = $2")
                .bind(user_id)
                .bind(workspace_id)
                .execute(&self.pool)
                .await
                .map_err(SqlxErrorExt::into_app_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

        Ok(())
    }
}
