use axum::{
    extract::{Extension, Path as AxumPath, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::models::product::ProductSummary;
use crate::db::models::review::{
    NewReview, ProductReviewsResponse, Review, ReviewResponse, ReviewStats, UpdateReview,
};
use crate::db::models::user::UserSummary;
use crate::middleware::auth::Claims;
use crate::utils::api_response::ApiResponse;

//
// Flat row for the JOIN-expanded queries. Foreign keys are expanded into
// product/user summaries instead of being returned as bare UUIDs.
//

#[derive(FromRow)]
struct ExpandedReviewRow {
    id: Uuid,
    product_id: Uuid,
    rating: i32,
    comment: String,
    recommended: bool,
    created_by: Uuid,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
    product_name: String,
    product_price: f64,
    product_category: Option<String>,
    username: String,
    email: Option<String>,
}

impl From<ExpandedReviewRow> for ReviewResponse {
    fn from(row: ExpandedReviewRow) -> Self {
        ReviewResponse {
            review: Review {
                id: row.id,
                product_id: row.product_id,
                rating: row.rating,
                comment: row.comment,
                recommended: row.recommended,
                created_by: row.created_by,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            product: ProductSummary {
                id: row.product_id,
                name: row.product_name,
                price: row.product_price,
                category: row.product_category,
            },
            author: UserSummary {
                id: row.created_by,
                username: row.username,
                email: row.email,
            },
        }
    }
}

const EXPANDED_SELECT: &str = r#"
    SELECT r.id, r.product_id, r.rating, r.comment, r.recommended, r.created_by,
           r.created_at, r.updated_at,
           p.name  AS product_name,
           p.price AS product_price,
           p.category AS product_category,
           u.username, u.email
      FROM reviews r
      JOIN products p ON p.id = r.product_id
      JOIN users u ON u.id = r.created_by
"#;

//
// REVIEW CRUD FUNCTIONS
//

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/products/{product_id}/reviews",
    tag = "Reviews",
    params(
        ("product_id" = Uuid, Path, description = "ID of the product being reviewed"),
    ),
    request_body = NewReview,
    responses(
        (status = 201, description = "Successfully created review", body = Review),
        (status = 400, description = "Validation failure (per-field errors)"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(product_id): AxumPath<Uuid>,
    Json(payload): Json<NewReview>,
) -> Result<ApiResponse<Review>, ApiResponse<()>> {
    let user_id = claims.sub.parse::<Uuid>().map_err(|_| {
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Invalid user ID in token", None)
    })?;

    // The product existence check runs before validation so a review against a
    // missing product is always a 404, never a 400.
    let product = sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&db_pool)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to look up product",
                Some(json!({ "message": e.to_string() })),
            )
        })?;
    if product.is_none() {
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "Product not found",
            None,
        ));
    }

    let validated = payload.validate().map_err(|errors| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            Some(json!(errors)),
        )
    })?;

    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (id, product_id, rating, comment, recommended, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
        RETURNING id, product_id, rating, comment, recommended, created_by, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(validated.rating)
    .bind(&validated.comment)
    .bind(validated.recommended)
    .bind(user_id)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create review",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    tracing::info!(review_id = %review.id, product_id = %product_id, "review created");

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Review created successfully",
        review,
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/products/{product_id}/reviews",
    tag = "Reviews",
    params(
        ("product_id" = Uuid, Path, description = "Product ID of the reviews"),
    ),
    responses(
        (status = 200, description = "Reviews and aggregate stats for the product", body = ProductReviewsResponse),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn get_reviews_for_product(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<Uuid>,
) -> Result<ApiResponse<ProductReviewsResponse>, ApiResponse<()>> {
    let rows = sqlx::query_as::<_, ExpandedReviewRow>(&format!(
        "{EXPANDED_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC"
    ))
    .bind(product_id)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve reviews",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    // A product with no reviews is an empty 200, with zeroed stats.
    let stats = ReviewStats::from_ratings(rows.iter().map(|r| r.rating));
    let reviews: Vec<ReviewResponse> = rows.into_iter().map(ReviewResponse::from).collect();

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Reviews retrieved successfully",
        ProductReviewsResponse {
            count: reviews.len(),
            stats,
            reviews,
        },
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("review_id" = Uuid, Path, description = "ID of the review being retrieved"),
    ),
    responses(
        (status = 200, description = "Review retrieved successfully", body = ReviewResponse),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn get_review(
    State(db_pool): State<PgPool>,
    AxumPath(review_id): AxumPath<Uuid>,
) -> Result<ApiResponse<ReviewResponse>, ApiResponse<()>> {
    let row = sqlx::query_as::<_, ExpandedReviewRow>(&format!(
        "{EXPANDED_SELECT} WHERE r.id = $1"
    ))
    .bind(review_id)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve review",
            Some(json!({ "message": e.to_string() })),
        )
    })?
    .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Review not found", None))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review retrieved successfully",
        ReviewResponse::from(row),
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("review_id" = Uuid, Path, description = "ID of the review to be updated"),
    ),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated successfully", body = Review),
        (status = 400, description = "No fields provided for update or validation failure"),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_review(
    State(db_pool): State<PgPool>,
    AxumPath(review_id): AxumPath<Uuid>,
    Json(payload): Json<UpdateReview>,
) -> Result<ApiResponse<Review>, ApiResponse<()>> {
    if payload.is_empty() {
        return Err(ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "No fields provided for update",
            None,
        ));
    }

    let current = sqlx::query_as::<_, Review>(
        "SELECT id, product_id, rating, comment, recommended, created_by, created_at, updated_at
           FROM reviews WHERE id = $1",
    )
    .bind(review_id)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve review",
            Some(json!({ "message": e.to_string() })),
        )
    })?
    .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Review not found", None))?;

    // Merge the provided fields onto the stored record, then re-run every
    // field constraint before touching the row.
    let validated = payload.apply_to(&current).validate().map_err(|errors| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            Some(json!(errors)),
        )
    })?;

    let updated = sqlx::query_as::<_, Review>(
        r#"
        UPDATE reviews
           SET rating = $1, comment = $2, recommended = $3, updated_at = NOW()
         WHERE id = $4
        RETURNING id, product_id, rating, comment, recommended, created_by, created_at, updated_at
        "#,
    )
    .bind(validated.rating)
    .bind(&validated.comment)
    .bind(validated.recommended)
    .bind(review_id)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to update review",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review updated successfully",
        updated,
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("review_id" = Uuid, Path, description = "ID of the review to be deleted"),
    ),
    responses(
        (status = 200, description = "Review deleted successfully", body = Review),
        (status = 404, description = "Review not found"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_review(
    State(db_pool): State<PgPool>,
    AxumPath(review_id): AxumPath<Uuid>,
) -> Result<ApiResponse<Review>, ApiResponse<()>> {
    // RETURNING hands back the row's prior state, which the contract echoes.
    let deleted = sqlx::query_as::<_, Review>(
        r#"
        DELETE FROM reviews
         WHERE id = $1
        RETURNING id, product_id, rating, comment, recommended, created_by, created_at, updated_at
        "#,
    )
    .bind(review_id)
    .fetch_optional(&db_pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete review",
            Some(json!({ "message": e.to_string() })),
        )
    })?
    .ok_or_else(|| ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Review not found", None))?;

    tracing::info!(review_id = %review_id, "review deleted");

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review deleted successfully",
        deleted,
    ))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;
use utoipa::OpenApi;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_review,
        get_reviews_for_product,
        get_review,
        update_review,
        delete_review
    ),
    components(
        schemas(
            Review,
            NewReview,
            UpdateReview,
            ReviewResponse,
            ProductReviewsResponse,
            ReviewStats,
            ProductSummary,
            UserSummary
        )
    ),
    tags(
        (name = "Reviews", description = "Review Management Endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ReviewDoc;
