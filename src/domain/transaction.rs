//! Transaction domain entity.
//! Framework-agnostic representation of a buyer/seller agreement.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::snapshot::TransactionMetadata;

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Disputed,
    Cancelled,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 6] = [
        TransactionStatus::Pending,
        TransactionStatus::Confirmed,
        TransactionStatus::InProgress,
        TransactionStatus::Completed,
        TransactionStatus::Disputed,
        TransactionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::InProgress => "in_progress",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Disputed => "disputed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Cancelled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Completed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Partial,
        PaymentStatus::Completed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Sale,
    Rental,
    Service,
}

impl TransactionType {
    pub const ALL: [TransactionType; 3] = [
        TransactionType::Sale,
        TransactionType::Rental,
        TransactionType::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Rental => "rental",
            TransactionType::Service => "service",
        }
    }
}

/// Which side of a transaction a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Buyer,
    Seller,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Buyer => "buyer",
            PartyRole::Seller => "seller",
        }
    }
}

/// Pickup or delivery details. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticsPoint {
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date: Option<DateTime<Utc>>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
}

impl LogisticsPoint {
    /// Overlays the fields set in `update`, keeping the rest.
    pub fn merged(&self, update: &LogisticsPoint) -> LogisticsPoint {
        LogisticsPoint {
            address: update.address.clone().or_else(|| self.address.clone()),
            latitude: update.latitude.or(self.latitude),
            longitude: update.longitude.or(self.longitude),
            date: update.date.or(self.date),
            contact_name: update.contact_name.clone().or_else(|| self.contact_name.clone()),
            contact_phone: update
                .contact_phone
                .clone()
                .or_else(|| self.contact_phone.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageChannel {
    Platform,
    Whatsapp,
}

/// One entry of the append-only communication log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationEntry {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: PartyRole,
    pub message: String,
    pub channel: MessageChannel,
    pub sent_at: DateTime<Utc>,
}

/// A rating left by one party, written at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyReview {
    pub rating: i16,
    pub text: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// Review slots addressed by the reviewer's role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSlots {
    pub by_buyer: Option<PartyReview>,
    pub by_seller: Option<PartyReview>,
}

impl ReviewSlots {
    pub fn slot(&self, role: PartyRole) -> Option<&PartyReview> {
        match role {
            PartyRole::Buyer => self.by_buyer.as_ref(),
            PartyRole::Seller => self.by_seller.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, role: PartyRole) -> &mut Option<PartyReview> {
        match role {
            PartyRole::Buyer => &mut self.by_buyer,
            PartyRole::Seller => &mut self.by_seller,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub reason: Option<String>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

/// Domain entity representing a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub original_price: Option<BigDecimal>,
    pub negotiated_price: Option<BigDecimal>,
    pub final_price: BigDecimal,
    pub currency: String,
    pub quantity: i32,
    pub unit: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub pickup: LogisticsPoint,
    pub delivery: LogisticsPoint,
    pub notes: Option<String>,
    pub whatsapp_thread_id: Option<String>,
    pub communication_log: Vec<CommunicationEntry>,
    pub reviews: ReviewSlots,
    pub dispute: Dispute,
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl Transaction {
    /// Returns the role `user_id` plays in this transaction, if any.
    pub fn party_role(&self, user_id: Uuid) -> Option<PartyRole> {
        if user_id == self.buyer_id {
            Some(PartyRole::Buyer)
        } else if user_id == self.seller_id {
            Some(PartyRole::Seller)
        } else {
            None
        }
    }

    /// True while the settled price is a placeholder zero: no listed and no negotiated price.
    pub fn awaiting_price(&self) -> bool {
        self.original_price.is_none() && self.negotiated_price.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
        assert!(!TransactionStatus::Disputed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
    }

    #[test]
    fn logistics_merge_keeps_unset_fields() {
        let current = LogisticsPoint {
            address: Some("Ruta 5 km 120".to_string()),
            contact_name: Some("Marta".to_string()),
            ..Default::default()
        };
        let update = LogisticsPoint {
            contact_name: Some("Julio".to_string()),
            latitude: Some(-34.6),
            ..Default::default()
        };

        let merged = current.merged(&update);
        assert_eq!(merged.address.as_deref(), Some("Ruta 5 km 120"));
        assert_eq!(merged.contact_name.as_deref(), Some("Julio"));
        assert_eq!(merged.latitude, Some(-34.6));
        assert!(merged.longitude.is_none());
    }

    #[test]
    fn review_slots_are_addressed_by_role() {
        let mut slots = ReviewSlots::default();
        *slots.slot_mut(PartyRole::Seller) = Some(PartyReview {
            rating: 4,
            text: None,
            reviewed_at: Utc::now(),
        });

        assert!(slots.slot(PartyRole::Buyer).is_none());
        assert_eq!(slots.slot(PartyRole::Seller).map(|r| r.rating), Some(4));
    }
}
