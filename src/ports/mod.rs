//! Persistence ports for transactions and inquiries.
//!
//! Adapters must honor the write guards carried by the patches: a patch with
//! `expected_status` only applies while the stored status still matches, a
//! review only lands in an empty slot, and an inquiry response with
//! `require_unanswered` only lands once. A failed guard is a `Conflict`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    CommunicationEntry, LogisticsPoint, PartyReview, PartyRole, PaymentStatus, ProductInquiry,
    Transaction, TransactionStatus,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("stored record is invalid: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Partial field set for a transaction write. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub expected_status: Option<TransactionStatus>,
    pub status: Option<TransactionStatus>,
    pub negotiated_price: Option<BigDecimal>,
    pub final_price: Option<BigDecimal>,
    pub payment_method: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_date: Option<DateTime<Utc>>,
    pub pickup: Option<LogisticsPoint>,
    pub delivery: Option<LogisticsPoint>,
    pub notes: Option<String>,
    pub whatsapp_thread_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub dispute_reason: Option<String>,
    pub dispute_resolution: Option<String>,
    pub dispute_resolved_at: Option<DateTime<Utc>>,
    pub dispute_resolved_by: Option<Uuid>,
    pub review: Option<(PartyRole, PartyReview)>,
    pub append_messages: Vec<CommunicationEntry>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.negotiated_price.is_none()
            && self.final_price.is_none()
            && self.payment_method.is_none()
            && self.payment_status.is_none()
            && self.payment_date.is_none()
            && self.pickup.is_none()
            && self.delivery.is_none()
            && self.notes.is_none()
            && self.whatsapp_thread_id.is_none()
            && self.completed_at.is_none()
            && self.cancelled_at.is_none()
            && self.cancellation_reason.is_none()
            && self.dispute_reason.is_none()
            && self.dispute_resolution.is_none()
            && self.dispute_resolved_at.is_none()
            && self.dispute_resolved_by.is_none()
            && self.review.is_none()
            && self.append_messages.is_empty()
    }

    /// Checks the write guards against the current record.
    pub fn check_guards(&self, tx: &Transaction) -> RepositoryResult<()> {
        if let Some(expected) = self.expected_status {
            if tx.status != expected {
                return Err(RepositoryError::Conflict(format!(
                    "transaction {} is {}, expected {}",
                    tx.id, tx.status, expected
                )));
            }
        }
        if let Some((role, _)) = &self.review {
            if tx.reviews.slot(*role).is_some() {
                return Err(RepositoryError::Conflict(format!(
                    "transaction {} already has a {} review",
                    tx.id,
                    role.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Applies the patch to an in-memory record. Guards are not checked here.
    pub fn apply_to(&self, tx: &mut Transaction, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            tx.status = status;
        }
        if let Some(price) = &self.negotiated_price {
            tx.negotiated_price = Some(price.clone());
        }
        if let Some(price) = &self.final_price {
            tx.final_price = price.clone();
        }
        if let Some(method) = &self.payment_method {
            tx.payment_method = Some(method.clone());
        }
        if let Some(payment_status) = self.payment_status {
            tx.payment_status = payment_status;
        }
        if let Some(date) = self.payment_date {
            tx.payment_date = Some(date);
        }
        if let Some(pickup) = &self.pickup {
            tx.pickup = pickup.clone();
        }
        if let Some(delivery) = &self.delivery {
            tx.delivery = delivery.clone();
        }
        if let Some(notes) = &self.notes {
            tx.notes = Some(notes.clone());
        }
        if let Some(thread) = &self.whatsapp_thread_id {
            tx.whatsapp_thread_id = Some(thread.clone());
        }
        if let Some(at) = self.completed_at {
            tx.completed_at = Some(at);
        }
        if let Some(at) = self.cancelled_at {
            tx.cancelled_at = Some(at);
        }
        if let Some(reason) = &self.cancellation_reason {
            tx.cancellation_reason = Some(reason.clone());
        }
        if let Some(reason) = &self.dispute_reason {
            tx.dispute.reason = Some(reason.clone());
        }
        if let Some(resolution) = &self.dispute_resolution {
            tx.dispute.resolution = Some(resolution.clone());
        }
        if let Some(at) = self.dispute_resolved_at {
            tx.dispute.resolved_at = Some(at);
        }
        if let Some(by) = self.dispute_resolved_by {
            tx.dispute.resolved_by = Some(by);
        }
        if let Some((role, review)) = &self.review {
            *tx.reviews.slot_mut(*role) = Some(review.clone());
        }
        tx.communication_log
            .extend(self.append_messages.iter().cloned());
        tx.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub product_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    /// Matches records where the user is either buyer or seller.
    pub user_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.status.map_or(true, |s| tx.status == s)
            && self.product_id.map_or(true, |id| tx.product_id == id)
            && self.buyer_id.map_or(true, |id| tx.buyer_id == id)
            && self.seller_id.map_or(true, |id| tx.seller_id == id)
            && self
                .user_id
                .map_or(true, |id| tx.buyer_id == id || tx.seller_id == id)
            && self.date_from.map_or(true, |from| tx.created_at >= from)
            && self.date_to.map_or(true, |to| tx.created_at <= to)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    FinalPrice,
    CompletedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::FinalPrice => "final_price",
            SortField::CompletedAt => "completed_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsFilter {
    pub user_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl StatsFilter {
    pub fn as_transaction_filter(&self) -> TransactionFilter {
        TransactionFilter {
            user_id: self.user_id,
            date_from: self.date_from,
            date_to: self.date_to,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: TransactionStatus,
    pub count: i64,
}

/// `YYYY-MM` bucket key used for monthly revenue.
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM` of the completion date.
    pub month: String,
    pub revenue: BigDecimal,
    pub transactions: i64,
}

/// Raw aggregates as returned by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAggregates {
    pub by_status: Vec<StatusCount>,
    pub completed_count: i64,
    pub total_revenue: BigDecimal,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction>;

    /// Applies `patch` atomically, returning the updated record.
    async fn update(&self, id: Uuid, patch: &TransactionPatch) -> RepositoryResult<Transaction>;

    async fn list(
        &self,
        filter: &TransactionFilter,
        sort: SortSpec,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<Transaction>, i64)>;

    async fn stats(&self, filter: &StatsFilter) -> RepositoryResult<TransactionAggregates>;
}

#[derive(Debug, Clone, Default)]
pub struct InquiryPatch {
    pub require_unanswered: bool,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub whatsapp_message_id: Option<String>,
}

impl InquiryPatch {
    pub fn check_guards(&self, inquiry: &ProductInquiry) -> RepositoryResult<()> {
        if self.require_unanswered && inquiry.is_responded {
            return Err(RepositoryError::Conflict(format!(
                "inquiry {} already has a response",
                inquiry.id
            )));
        }
        Ok(())
    }

    pub fn apply_to(&self, inquiry: &mut ProductInquiry, now: DateTime<Utc>) {
        if let Some(response) = &self.response {
            inquiry.response = Some(response.clone());
            inquiry.is_responded = true;
            inquiry.responded_at = Some(self.responded_at.unwrap_or(now));
        }
        if let Some(message_id) = &self.whatsapp_message_id {
            inquiry.whatsapp_sent = true;
            inquiry.whatsapp_message_id = Some(message_id.clone());
        }
        inquiry.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InquiryFilter {
    pub product_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub is_responded: Option<bool>,
}

impl InquiryFilter {
    pub fn matches(&self, inquiry: &ProductInquiry) -> bool {
        self.product_id.map_or(true, |id| inquiry.product_id == id)
            && self.buyer_id.map_or(true, |id| inquiry.buyer_id == id)
            && self.seller_id.map_or(true, |id| inquiry.seller_id == id)
            && self
                .is_responded
                .map_or(true, |responded| inquiry.is_responded == responded)
    }
}

#[async_trait]
pub trait InquiryRepository: Send + Sync {
    async fn create(&self, inquiry: &ProductInquiry) -> RepositoryResult<ProductInquiry>;

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<ProductInquiry>;

    async fn update(&self, id: Uuid, patch: &InquiryPatch) -> RepositoryResult<ProductInquiry>;

    async fn list(
        &self,
        filter: &InquiryFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<ProductInquiry>, i64)>;
}
