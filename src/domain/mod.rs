pub mod inquiry;
pub mod snapshot;
pub mod transaction;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use inquiry::{InquiryType, ProductInquiry};
pub use snapshot::{BuyerInfo, PartyInfo, ProductInfo, SellerInfo, TransactionMetadata};
pub use transaction::{
    CommunicationEntry, Dispute, LogisticsPoint, MessageChannel, PartyReview, PartyRole,
    PaymentStatus, ReviewSlots, Transaction, TransactionStatus, TransactionType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Member,
    Admin,
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn member(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: ActorRole::Member,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: ActorRole::Admin,
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.role == ActorRole::Admin
    }
}
