//! Transaction helpers shared by the handler layer.

use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

use crate::error::AppError;

/// Begin a database transaction.
///
/// Dropping the returned handle without [`commit_transaction`] rolls every
/// change back, including any audit entry written inside it.
pub async fn begin_transaction(db: &PgPool) -> Result<PgTransaction<'_>, AppError> {
    db.begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Commit a transaction.
pub async fn commit_transaction(tx: PgTransaction<'_>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}
