use shared_types::AppError;

/// Convert a sqlx::Error into an AppError.
pub fn sqlx_to_app_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::RowNotFound => AppError::not_found("Resource not found"),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => {
                let detail = db_err.message();
                let friendly = if detail.contains("email") {
                    "A user with this email already exists"
                } else if detail.contains("default_selections") {
                    "Defaults were written concurrently; retry"
                } else {
                    "A record with this value already exists"
                };
                AppError::conflict(friendly)
            }
            // foreign_key_violation: the referenced user, client or workspace is gone
            Some("23503") => {
                let resource = db_err.constraint().and_then(resource_for_constraint);
                let err = AppError::not_found("Referenced record does not exist");
                match resource {
                    Some(resource) => err.with_resource(resource),
                    None => err,
                }
            }
            _ => AppError::database(err.to_string()),
        },
        sqlx::Error::PoolTimedOut => AppError::database("Database connection pool exhausted"),
        _ => AppError::database(err.to_string()),
    }
}

/// Map a Postgres-generated `<table>_<column>_fkey` name to the entity it references.
fn resource_for_constraint(constraint: &str) -> Option<&'static str> {
    if constraint.ends_with("workspace_id_fkey") {
        Some("workspace")
    } else if constraint.ends_with("client_id_fkey") {
        Some("client")
    } else if constraint.ends_with("user_id_fkey") {
        Some("user")
    } else {
        None
    }
}

/// Extension trait providing `.into_app_error()` on sqlx::Error.
pub trait SqlxErrorExt {
    fn into_app_error(self) -> AppError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_app_error(self) -> AppError {
        sqlx_to_app_error(self)
    }
}
