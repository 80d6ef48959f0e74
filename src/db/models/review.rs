use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::product::ProductSummary;
use crate::db::models::user::UserSummary;

/// ✅ **Review Record Stored in PostgreSQL**
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,       // Always an integer in [1, 5]
    pub comment: String,   // Trimmed, 5-1000 characters
    pub recommended: bool, // Defaults to true
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// ✅ **New Review Request (Frontend Sends This)**
///
/// Every field is optional at the wire level so that a missing field produces a
/// per-field validation error rather than a deserialization failure. `rating`
/// deserializes as a float for the same reason: `3.5` must fail the integer
/// rule with a field message, not die in serde as a type mismatch.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub recommended: Option<bool>,
}

/// ✅ **Update Review Request**
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReview {
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub recommended: Option<bool>,
}

impl UpdateReview {
    /// Checks if all fields are `None`, indicating no updates were provided.
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none() && self.recommended.is_none()
    }

    /// Overlays the provided fields onto the stored record, yielding a full
    /// candidate that goes back through `NewReview::validate`.
    pub fn apply_to(&self, current: &Review) -> NewReview {
        NewReview {
            rating: self.rating.or(Some(f64::from(current.rating))),
            comment: self
                .comment
                .clone()
                .or_else(|| Some(current.comment.clone())),
            recommended: self.recommended.or(Some(current.recommended)),
        }
    }
}

/// A review payload that passed every field constraint. Only this type is
/// handed to the INSERT/UPDATE queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReview {
    pub rating: i32,
    pub comment: String,
    pub recommended: bool,
}

/// Per-field validation failure, surfaced in the `errors` array of the 400 response.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl NewReview {
    /// Validates every field constraint, collecting one error per failed field.
    ///
    /// Rating must be present, a whole number, and within [1, 5]. The comment
    /// is trimmed before its character count is checked against [5, 1000].
    /// `recommended` defaults to true when omitted.
    pub fn validate(&self) -> Result<ValidatedReview, Vec<FieldError>> {
        let mut errors = Vec::new();

        let rating = match self.rating {
            None => {
                errors.push(FieldError::new("rating", "Rating is required"));
                None
            }
            Some(r) if r.fract() != 0.0 => {
                errors.push(FieldError::new(
                    "rating",
                    "Rating must be an integer between 1 and 5",
                ));
                None
            }
            Some(r) if r < 1.0 => {
                errors.push(FieldError::new("rating", "Rating must be at least 1"));
                None
            }
            Some(r) if r > 5.0 => {
                errors.push(FieldError::new("rating", "Rating cannot exceed 5"));
                None
            }
            Some(r) => Some(r as i32),
        };

        let comment = match self.comment.as_deref().map(str::trim) {
            None => {
                errors.push(FieldError::new("comment", "Comment is required"));
                None
            }
            Some("") => {
                errors.push(FieldError::new("comment", "Comment is required"));
                None
            }
            Some(c) if c.chars().count() < 5 => {
                errors.push(FieldError::new(
                    "comment",
                    "Comment must be at least 5 characters long",
                ));
                None
            }
            Some(c) if c.chars().count() > 1000 => {
                errors.push(FieldError::new(
                    "comment",
                    "Comment cannot exceed 1000 characters",
                ));
                None
            }
            Some(c) => Some(c.to_string()),
        };

        match (rating, comment) {
            (Some(rating), Some(comment)) if errors.is_empty() => Ok(ValidatedReview {
                rating,
                comment,
                recommended: self.recommended.unwrap_or(true),
            }),
            _ => Err(errors),
        }
    }
}

/// ✅ **Aggregate Rating Stats for a Product**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: f64,
    pub total_reviews: i64,
}

impl ReviewStats {
    /// Folds a set of ratings into mean and count. Zero reviews yields
    /// `{averageRating: 0, totalReviews: 0}` rather than a division by zero.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0i64, 0i64), |(sum, count), r| (sum + i64::from(r), count + 1));

        let average_rating = if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        };

        ReviewStats {
            average_rating,
            total_reviews: count,
        }
    }
}

/// ✅ **Review Response (Foreign Keys Expanded)**
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[serde(flatten)]
    pub review: Review,
    pub product: ProductSummary, // Denormalized from the referenced product
    pub author: UserSummary,     // Denormalized from the referencing user
}

/// ✅ **List Response for a Product's Reviews**
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ProductReviewsResponse {
    pub count: usize,
    pub stats: ReviewStats,
    pub reviews: Vec<ReviewResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn payload(rating: Option<f64>, comment: Option<&str>) -> NewReview {
        NewReview {
            rating,
            comment: comment.map(str::to_string),
            recommended: None,
        }
    }

    fn stored_review() -> Review {
        let ts = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap();
        Review {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            rating: 4,
            comment: "Solid build quality".to_string(),
            recommended: true,
            created_by: Uuid::new_v4(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn valid_payload_echoes_fields_and_defaults_recommended() {
        let validated = payload(Some(4.0), Some("Works great")).validate().unwrap();
        assert_eq!(
            validated,
            ValidatedReview {
                rating: 4,
                comment: "Works great".to_string(),
                recommended: true,
            }
        );
    }

    #[test]
    fn rating_boundaries() {
        assert_eq!(payload(Some(1.0), Some("Works great")).validate().unwrap().rating, 1);
        assert_eq!(payload(Some(5.0), Some("Works great")).validate().unwrap().rating, 5);

        let low = payload(Some(0.0), Some("Works great")).validate().unwrap_err();
        assert_eq!(low, vec![FieldError::new("rating", "Rating must be at least 1")]);

        let high = payload(Some(6.0), Some("Works great")).validate().unwrap_err();
        assert_eq!(high, vec![FieldError::new("rating", "Rating cannot exceed 5")]);
    }

    #[test]
    fn fractional_rating_is_a_field_error_not_a_type_error() {
        let errors = payload(Some(3.5), Some("Works great")).validate().unwrap_err();
        assert_eq!(
            errors,
            vec![FieldError::new(
                "rating",
                "Rating must be an integer between 1 and 5"
            )]
        );
    }

    #[test]
    fn comment_length_boundaries_after_trim() {
        assert!(payload(Some(3.0), Some("abcd")).validate().is_err());
        assert!(payload(Some(3.0), Some("abcde")).validate().is_ok());
        assert!(payload(Some(3.0), Some(&"x".repeat(1000))).validate().is_ok());

        let long = payload(Some(3.0), Some(&"x".repeat(1001))).validate().unwrap_err();
        assert_eq!(
            long,
            vec![FieldError::new("comment", "Comment cannot exceed 1000 characters")]
        );

        // "  abcde  " trims to exactly 5 characters
        assert_eq!(
            payload(Some(3.0), Some("  abcde  ")).validate().unwrap().comment,
            "abcde"
        );
        // Padding does not rescue a too-short comment
        assert!(payload(Some(3.0), Some("  ab  ")).validate().is_err());
    }

    #[test]
    fn missing_fields_produce_one_error_each() {
        let errors = payload(None, None).validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("rating", "Rating is required"),
                FieldError::new("comment", "Comment is required"),
            ]
        );
    }

    #[test]
    fn whitespace_only_comment_counts_as_missing() {
        let errors = payload(Some(3.0), Some("   ")).validate().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("comment", "Comment is required")]);
    }

    #[test]
    fn explicit_recommended_false_is_kept() {
        let validated = NewReview {
            rating: Some(2.0),
            comment: Some("Not worth the price".to_string()),
            recommended: Some(false),
        }
        .validate()
        .unwrap();
        assert!(!validated.recommended);
    }

    #[test]
    fn update_overlays_only_provided_fields() {
        let current = stored_review();
        let update = UpdateReview {
            rating: Some(2.0),
            comment: None,
            recommended: None,
        };
        let merged = update.apply_to(&current).validate().unwrap();
        assert_eq!(merged.rating, 2);
        assert_eq!(merged.comment, current.comment);
        assert!(merged.recommended);
    }

    #[test]
    fn update_revalidates_merged_candidate() {
        let current = stored_review();
        let update = UpdateReview {
            rating: Some(9.0),
            comment: Some("ok".to_string()),
            recommended: None,
        };
        let errors = update.apply_to(&current).validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("rating", "Rating cannot exceed 5"),
                FieldError::new("comment", "Comment must be at least 5 characters long"),
            ]
        );
    }

    #[test]
    fn stats_over_zero_reviews_is_zeroed_not_nan() {
        let stats = ReviewStats::from_ratings([]);
        assert_eq!(
            stats,
            ReviewStats {
                average_rating: 0.0,
                total_reviews: 0
            }
        );
    }

    #[test]
    fn stats_mean_and_count() {
        let stats = ReviewStats::from_ratings([4, 5, 3]);
        assert_eq!(
            stats,
            ReviewStats {
                average_rating: 4.0,
                total_reviews: 3
            }
        );

        let uneven = ReviewStats::from_ratings([4, 5]);
        assert_eq!(uneven.average_rating, 4.5);
        assert_eq!(uneven.total_reviews, 2);
    }

    #[test]
    fn stats_serialize_with_contract_field_names() {
        let value = serde_json::to_value(ReviewStats::from_ratings([4, 5, 3])).unwrap();
        assert_eq!(value["averageRating"], serde_json::json!(4.0));
        assert_eq!(value["totalReviews"], serde_json::json!(3));
    }

    #[test]
    fn review_serializes_camel_case() {
        let value = serde_json::to_value(stored_review()).unwrap();
        assert!(value.get("productId").is_some());
        assert!(value.get("createdBy").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("product_id").is_none());
    }
}
