//! Billing detail models

use serde::{Deserialize, Serialize};

/// The editable billing field set accepted by the update operation
///
/// Every field arrives as string-or-null from the form. The owning purchaser
/// is bound from the authenticated caller and is never part of this set;
/// unknown fields in the request body are dropped on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingDetailInput {
    pub full_name: Option<String>,
    pub business_name: Option<String>,
    pub business_id: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country_code: Option<String>,
    pub additional_notes: Option<String>,
}
