//! Pre-sale inquiry entity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryType {
    General,
    Price,
    Availability,
    Logistics,
    Quality,
}

impl InquiryType {
    pub const ALL: [InquiryType; 5] = [
        InquiryType::General,
        InquiryType::Price,
        InquiryType::Availability,
        InquiryType::Logistics,
        InquiryType::Quality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryType::General => "general",
            InquiryType::Price => "price",
            InquiryType::Availability => "availability",
            InquiryType::Logistics => "logistics",
            InquiryType::Quality => "quality",
        }
    }
}

impl fmt::Display for InquiryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInquiry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub inquiry_type: InquiryType,
    pub subject: Option<String>,
    pub message: String,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub is_responded: bool,
    pub whatsapp_sent: bool,
    pub whatsapp_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductInquiry {
    pub fn new(
        product_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
        inquiry_type: InquiryType,
        subject: Option<String>,
        message: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            product_id,
            buyer_id,
            seller_id,
            inquiry_type,
            subject,
            message,
            response: None,
            responded_at: None,
            is_responded: false,
            whatsapp_sent: false,
            whatsapp_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
