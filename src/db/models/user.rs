use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Denormalized user info attached to expanded review responses.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}
