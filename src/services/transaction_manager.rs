//! Orchestrates transaction creation, status changes, detail edits, reviews
//! and reporting against a [`TransactionRepository`].
//!
//! Every mutating call re-loads the record, validates against it, then writes
//! a guarded patch. Nothing is written when a check fails.

use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    Actor, BuyerInfo, CommunicationEntry, Dispute, LogisticsPoint, MessageChannel, PaymentStatus,
    ProductInfo, ReviewSlots, SellerInfo, Transaction, TransactionMetadata, TransactionStatus,
};
use crate::error::{CoreError, CoreResult};
use crate::ports::{
    MonthlyRevenue, RepositoryError, SortSpec, StatsFilter, StatusCount, TransactionFilter,
    TransactionPatch, TransactionRepository,
};
use crate::services::{pricing, review_gate, state_machine};
use crate::utils::pagination::{Page, PageRequest};
use crate::validation::{self, MESSAGE_MAX_LEN};

/// Buyer-supplied part of a new transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub product_id: Uuid,
    pub transaction_type: String,
    pub quantity: i32,
    pub negotiated_price: Option<BigDecimal>,
    pub payment_method: Option<String>,
    pub pickup: Option<LogisticsPoint>,
    pub delivery: Option<LogisticsPoint>,
    pub notes: Option<String>,
    pub whatsapp_thread_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub reason: Option<String>,
}

/// Amendments either party may make. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionDetailsUpdate {
    pub negotiated_price: Option<BigDecimal>,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub pickup: Option<LogisticsPoint>,
    pub delivery: Option<LogisticsPoint>,
    pub notes: Option<String>,
    pub whatsapp_thread_id: Option<String>,
    pub status: Option<String>,
    pub status_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub rating: i32,
    pub review: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub message: String,
    pub channel: Option<MessageChannel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTransactionsQuery {
    #[serde(default)]
    pub filter: TransactionFilter,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_transactions: i64,
    pub by_status: Vec<StatusCount>,
    pub completed_transactions: i64,
    pub total_revenue: BigDecimal,
    pub average_revenue: BigDecimal,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

pub struct TransactionManager {
    repository: Arc<dyn TransactionRepository>,
}

impl TransactionManager {
    pub fn new(repository: Arc<dyn TransactionRepository>) -> Self {
        Self { repository }
    }

    #[tracing::instrument(
        skip(self, request, product, seller, buyer),
        fields(product_id = %product.id, quantity = request.quantity)
    )]
    pub async fn create(
        &self,
        buyer_id: Uuid,
        request: CreateTransactionRequest,
        product: &ProductInfo,
        seller: &SellerInfo,
        buyer: &BuyerInfo,
    ) -> CoreResult<Transaction> {
        if request.product_id != product.id {
            return Err(validation::ValidationError::new(
                "product_id",
                "does not match the supplied product",
            )
            .into());
        }
        let transaction_type = validation::parse_transaction_type(&request.transaction_type)?;
        validation::validate_quantity(request.quantity)?;
        if let Some(price) = &request.negotiated_price {
            validation::validate_non_negative_amount("negotiated_price", price)?;
        }
        let notes =
            validation::clean_optional_text("notes", request.notes.as_deref(), MESSAGE_MAX_LEN)?;

        if buyer_id == product.seller_id {
            tracing::warn!("buyer attempted to transact on own product");
            return Err(CoreError::SelfTransaction);
        }
        if !product.is_active || !product.is_available {
            return Err(CoreError::ProductNotAvailable);
        }
        if let Some(available) = product.quantity {
            if request.quantity > available {
                return Err(CoreError::InsufficientQuantity {
                    requested: request.quantity,
                    available,
                });
            }
        }

        let final_price = pricing::resolve(
            request.negotiated_price.as_ref(),
            product.price.as_ref(),
            request.quantity,
        );

        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            product_id: product.id,
            buyer_id,
            seller_id: product.seller_id,
            status: TransactionStatus::Pending,
            transaction_type,
            original_price: product.price.clone(),
            negotiated_price: request.negotiated_price,
            final_price,
            currency: product.currency.clone(),
            quantity: request.quantity,
            unit: product.unit.clone(),
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_date: None,
            pickup: request.pickup.unwrap_or_default(),
            delivery: request.delivery.unwrap_or_default(),
            notes,
            whatsapp_thread_id: request.whatsapp_thread_id,
            communication_log: Vec::new(),
            reviews: ReviewSlots::default(),
            dispute: Dispute::default(),
            metadata: TransactionMetadata::freeze(product, seller, buyer),
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        };

        let created = self.repository.create(&tx).await?;
        tracing::info!(
            transaction_id = %created.id,
            final_price = %created.final_price,
            "transaction created"
        );
        Ok(created)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> CoreResult<Transaction> {
        let tx = self.repository.get_by_id(id).await?;
        authorize_access(&tx, actor)?;
        Ok(tx)
    }

    #[tracing::instrument(skip(self, actor, change), fields(actor = %actor.user_id, to = %change.status))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        change: StatusChange,
    ) -> CoreResult<Transaction> {
        let to = validation::parse_transaction_status(&change.status)?;
        let tx = self.repository.get_by_id(id).await?;
        authorize_access(&tx, actor)?;

        let mut patch = TransactionPatch::default();
        state_machine::plan_transition(
            &tx,
            actor,
            to,
            change.reason.as_deref(),
            Utc::now(),
            &mut patch,
        )?;

        let updated = self.repository.update(id, &patch).await?;
        tracing::info!(transaction_id = %id, from = %tx.status, to = %updated.status, "status changed");
        Ok(updated)
    }

    #[tracing::instrument(skip(self, actor, update), fields(actor = %actor.user_id))]
    pub async fn update_details(
        &self,
        actor: &Actor,
        id: Uuid,
        update: TransactionDetailsUpdate,
    ) -> CoreResult<Transaction> {
        let payment_status = update
            .payment_status
            .as_deref()
            .map(validation::parse_payment_status)
            .transpose()?;
        let status = update
            .status
            .as_deref()
            .map(validation::parse_transaction_status)
            .transpose()?;
        if let Some(price) = &update.negotiated_price {
            validation::validate_non_negative_amount("negotiated_price", price)?;
        }
        let notes =
            validation::clean_optional_text("notes", update.notes.as_deref(), MESSAGE_MAX_LEN)?;
        let payment_method =
            validation::clean_optional_text("payment_method", update.payment_method.as_deref(), 100)?;

        let tx = self.repository.get_by_id(id).await?;
        authorize_access(&tx, actor)?;

        let now = Utc::now();
        let mut patch = TransactionPatch {
            expected_status: Some(tx.status),
            payment_method,
            notes,
            whatsapp_thread_id: update.whatsapp_thread_id,
            ..Default::default()
        };

        if let Some(price) = update.negotiated_price {
            if tx.status.is_terminal() {
                return Err(CoreError::InvalidPrecondition(format!(
                    "price cannot change once the transaction is {}",
                    tx.status
                )));
            }
            patch.final_price = Some(pricing::resolve(Some(&price), None, tx.quantity));
            patch.negotiated_price = Some(price);
        }

        if let Some(payment_status) = payment_status {
            if payment_status == PaymentStatus::Completed
                && tx.payment_status != PaymentStatus::Completed
            {
                patch.payment_date = Some(now);
            }
            patch.payment_status = Some(payment_status);
        }

        patch.pickup = update.pickup.map(|pickup| tx.pickup.merged(&pickup));
        patch.delivery = update.delivery.map(|delivery| tx.delivery.merged(&delivery));

        if let Some(to) = status {
            // Guards see the record as it will be after the detail changes.
            let mut staged = tx.clone();
            patch.apply_to(&mut staged, now);
            state_machine::plan_transition(
                &staged,
                actor,
                to,
                update.status_reason.as_deref(),
                now,
                &mut patch,
            )?;
        }

        if patch.is_empty() {
            return Ok(tx);
        }

        let updated = self.repository.update(id, &patch).await?;
        tracing::info!(transaction_id = %id, status = %updated.status, "transaction details updated");
        Ok(updated)
    }

    /// Records the acting party's review. Each party reviews at most once,
    /// and only after completion.
    #[tracing::instrument(skip(self, actor, review), fields(actor = %actor.user_id, rating = review.rating))]
    pub async fn add_review(
        &self,
        actor: &Actor,
        id: Uuid,
        review: ReviewRequest,
    ) -> CoreResult<Transaction> {
        review_gate::check_rating(review.rating)?;

        let tx = self.repository.get_by_id(id).await?;
        let patch = review_gate::plan_review(
            &tx,
            actor,
            review.rating,
            review.review.as_deref(),
            Utc::now(),
        )?;

        let updated = self
            .repository
            .update(id, &patch)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => CoreError::ReviewAlreadyExists,
                other => CoreError::from(other),
            })?;

        tracing::info!(transaction_id = %id, "review recorded");
        Ok(updated)
    }

    /// Appends to the communication log. Entries are never edited.
    #[tracing::instrument(skip(self, actor, message), fields(actor = %actor.user_id))]
    pub async fn add_message(
        &self,
        actor: &Actor,
        id: Uuid,
        message: NewMessage,
    ) -> CoreResult<Transaction> {
        let text = validation::clean_text("message", &message.message, MESSAGE_MAX_LEN)?;

        let tx = self.repository.get_by_id(id).await?;
        let sender_role = tx.party_role(actor.user_id).ok_or_else(|| {
            CoreError::NotAuthorized("only the buyer or seller can post messages".to_string())
        })?;

        let patch = TransactionPatch {
            append_messages: vec![CommunicationEntry {
                id: Uuid::new_v4(),
                sender_id: actor.user_id,
                sender_role,
                message: text,
                channel: message.channel.unwrap_or(MessageChannel::Platform),
                sent_at: Utc::now(),
            }],
            ..Default::default()
        };

        Ok(self.repository.update(id, &patch).await?)
    }

    pub async fn list(&self, query: &ListTransactionsQuery) -> CoreResult<Page<Transaction>> {
        let (items, total) = self
            .repository
            .list(
                &query.filter,
                query.sort,
                query.page.limit(),
                query.page.offset(),
            )
            .await?;
        Ok(Page::new(items, total, query.page))
    }

    pub async fn stats(&self, filter: &StatsFilter) -> CoreResult<TransactionStats> {
        let aggregates = self.repository.stats(filter).await?;

        let by_status: Vec<StatusCount> = TransactionStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: aggregates
                    .by_status
                    .iter()
                    .find(|entry| entry.status == *status)
                    .map_or(0, |entry| entry.count),
            })
            .collect();
        let total_transactions: i64 = by_status.iter().map(|entry| entry.count).sum();

        let average_revenue = if aggregates.completed_count > 0 {
            (&aggregates.total_revenue / BigDecimal::from(aggregates.completed_count)).round(2)
        } else {
            BigDecimal::from(0)
        };

        Ok(TransactionStats {
            total_transactions,
            by_status,
            completed_transactions: aggregates.completed_count,
            total_revenue: aggregates.total_revenue,
            average_revenue,
            monthly_revenue: aggregates.monthly_revenue,
        })
    }
}

/// Parties and elevated actors may act on a transaction; nobody else.
fn authorize_access(tx: &Transaction, actor: &Actor) -> CoreResult<()> {
    if tx.party_role(actor.user_id).is_some() || actor.is_elevated() {
        return Ok(());
    }
    Err(CoreError::NotAuthorized(
        "actor is not a party to this transaction".to_string(),
    ))
}
