use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub currency: String,
    pub is_for_rent: bool,
    pub location: Option<String>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub square_feet: Option<i64>,
    pub contact_phone: Option<String>,
    pub created_at: String,
    /// Image rows joined in by the store, insertion order.
    pub images: Vec<PropertyImageRecord>,
}

impl PropertyRecord {
    /// The designated display image: the flagged primary one, or the first
    /// inserted image when none is flagged.
    pub fn primary_image(&self) -> Option<&PropertyImageRecord> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyImageRecord {
    pub id: String,
    pub property_id: String,
    pub image_url: String,
    pub is_primary: bool,
    pub created_at: String,
}

/// One (user, property) pair; at most one row per pair exists in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRecord {
    pub user_id: String,
    pub property_id: String,
    pub created_at: String,
}

/// A comment joined with its author's display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub property_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    pub author_name: Option<String>,
    pub author_picture: Option<String>,
}

/// Input for creating a property; the store assigns id and created_at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub currency: String,
    pub is_for_rent: bool,
    pub location: Option<String>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub square_feet: Option<i64>,
    pub contact_phone: Option<String>,
}

/// Session-local feed constraints. An absent field leaves that dimension
/// unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub location: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub is_for_rent: Option<bool>,
    pub min_square_feet: Option<i64>,
    pub max_square_feet: Option<i64>,
    pub posted_within_days: Option<i64>,
    pub currency: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.bedrooms.is_none()
            && self.bathrooms.is_none()
            && self.is_for_rent.is_none()
            && self.min_square_feet.is_none()
            && self.max_square_feet.is_none()
            && self.posted_within_days.is_none()
            && self.currency.is_none()
    }

    /// The earliest admissible created_at for the recency window, if set.
    pub fn created_after(&self) -> Option<String> {
        self.posted_within_days
            .map(|days| (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339())
    }

    /// Whether a property satisfies every present predicate. The store-side
    /// query applies the same constraints; this is the client-side check
    /// used for owner views and tests.
    pub fn matches(&self, property: &PropertyRecord) -> bool {
        if let Some(location) = &self.location {
            if property.location.as_deref() != Some(location.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if property.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if property.price > max {
                return false;
            }
        }
        if let Some(bedrooms) = self.bedrooms {
            if property.bedrooms != Some(bedrooms) {
                return false;
            }
        }
        if let Some(bathrooms) = self.bathrooms {
            if property.bathrooms != Some(bathrooms) {
                return false;
            }
        }
        if let Some(is_for_rent) = self.is_for_rent {
            if property.is_for_rent != is_for_rent {
                return false;
            }
        }
        if let Some(min) = self.min_square_feet {
            if !property.square_feet.is_some_and(|sqft| sqft >= min) {
                return false;
            }
        }
        if let Some(max) = self.max_square_feet {
            if !property.square_feet.is_some_and(|sqft| sqft <= max) {
                return false;
            }
        }
        if let Some(cutoff) = self.created_after() {
            // Timestamps share one RFC 3339 UTC format, so string order is
            // chronological order.
            if property.created_at < cutoff {
                return false;
            }
        }
        if let Some(currency) = &self.currency {
            if &property.currency != currency {
                return false;
            }
        }
        true
    }
}

/// Keyset cursor over `(created_at DESC, id DESC)` feed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    pub created_at: String,
    pub id: String,
}

#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub after: Option<FeedCursor>,
    pub limit: usize,
}

impl FeedPage {
    pub fn first(limit: usize) -> Self {
        Self { after: None, limit }
    }

    pub fn after(cursor: FeedCursor, limit: usize) -> Self {
        Self {
            after: Some(cursor),
            limit,
        }
    }
}
