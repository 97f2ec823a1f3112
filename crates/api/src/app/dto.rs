use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use allocation_inventory::Batch;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    #[serde(rename = "ref")]
    pub reference: String,
    pub sku: String,
    pub qty: u32,
    #[serde(default)]
    pub eta: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub order_id: String,
    pub sku: String,
    pub qty: u32,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub reference: String,
    pub sku: String,
    pub eta: Option<NaiveDate>,
    pub purchased_quantity: u32,
    pub available_quantity: u32,
}

impl From<&Batch> for BatchResponse {
    fn from(batch: &Batch) -> Self {
        Self {
            reference: batch.reference().to_string(),
            sku: batch.sku().to_string(),
            eta: batch.eta(),
            purchased_quantity: batch.purchased_quantity(),
            available_quantity: batch.available_quantity(),
        }
    }
}
