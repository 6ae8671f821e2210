//! Snapshots supplied by the catalog and identity subsystems at creation time.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub price: Option<BigDecimal>,
    pub price_type: String,
    pub currency: String,
    pub unit: Option<String>,
    pub quantity: Option<i32>,
    pub is_active: bool,
    pub is_available: bool,
    pub seller_id: Uuid,
}

/// Contact and verification info for one party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub verification_level: String,
}

pub type SellerInfo = PartyInfo;
pub type BuyerInfo = PartyInfo;

/// Frozen copy of product and party details, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub product_title: String,
    pub product_category: String,
    pub price_type: String,
    pub seller: PartyInfo,
    pub buyer: PartyInfo,
}

impl TransactionMetadata {
    pub fn freeze(product: &ProductInfo, seller: &SellerInfo, buyer: &BuyerInfo) -> Self {
        Self {
            product_title: product.title.clone(),
            product_category: product.category.clone(),
            price_type: product.price_type.clone(),
            seller: seller.clone(),
            buyer: buyer.clone(),
        }
    }
}
