use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Denormalized product info attached to expanded review responses.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub category: Option<String>,
}
