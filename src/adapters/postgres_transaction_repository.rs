//! Postgres implementation of TransactionRepository.
//!
//! Guarded writes are a single `UPDATE ... WHERE id = $1 AND status = $expected`
//! so two callers racing on the same record cannot both commit a transition.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{
    CommunicationEntry, Dispute, LogisticsPoint, PartyReview, PartyRole, ReviewSlots, Transaction,
    TransactionMetadata,
};
use crate::ports::{
    MonthlyRevenue, RepositoryError, RepositoryResult, SortOrder, SortSpec, StatsFilter,
    StatusCount, TransactionAggregates, TransactionFilter, TransactionPatch,
    TransactionRepository,
};
use crate::validation;

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn missing_or_conflict(&self, id: Uuid) -> RepositoryError {
        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        match exists {
            Ok(Some(_)) => RepositoryError::Conflict(format!(
                "transaction {} changed concurrently",
                id
            )),
            Ok(None) => RepositoryError::NotFound(format!("transaction {}", id)),
            Err(e) => RepositoryError::from(e),
        }
    }
}

fn rating_columns(role: PartyRole) -> (&'static str, &'static str, &'static str) {
    match role {
        PartyRole::Buyer => ("buyer_rating", "buyer_review", "buyer_review_date"),
        PartyRole::Seller => ("seller_rating", "seller_review", "seller_review_date"),
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(product_id) = filter.product_id {
        qb.push(" AND product_id = ").push_bind(product_id);
    }
    if let Some(buyer_id) = filter.buyer_id {
        qb.push(" AND buyer_id = ").push_bind(buyer_id);
    }
    if let Some(seller_id) = filter.seller_id {
        qb.push(" AND seller_id = ").push_bind(seller_id);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND (buyer_id = ")
            .push_bind(user_id)
            .push(" OR seller_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let buyer_review = tx.reviews.by_buyer.as_ref();
        let seller_review = tx.reviews.by_seller.as_ref();

        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, product_id, buyer_id, seller_id, status, transaction_type,
                original_price, negotiated_price, final_price, currency, quantity, unit,
                payment_method, payment_status, payment_date, pickup, delivery, notes,
                whatsapp_thread_id, communication_log,
                buyer_rating, buyer_review, buyer_review_date,
                seller_rating, seller_review, seller_review_date,
                dispute_reason, dispute_resolution, dispute_resolved_at, dispute_resolved_by,
                metadata, created_at, updated_at, completed_at, cancelled_at, cancellation_reason
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34,
                $35, $36
            )
            RETURNING *
            "#,
        )
        .bind(tx.id)
        .bind(tx.product_id)
        .bind(tx.buyer_id)
        .bind(tx.seller_id)
        .bind(tx.status.as_str())
        .bind(tx.transaction_type.as_str())
        .bind(&tx.original_price)
        .bind(&tx.negotiated_price)
        .bind(&tx.final_price)
        .bind(&tx.currency)
        .bind(tx.quantity)
        .bind(&tx.unit)
        .bind(&tx.payment_method)
        .bind(tx.payment_status.as_str())
        .bind(tx.payment_date)
        .bind(Json(&tx.pickup))
        .bind(Json(&tx.delivery))
        .bind(&tx.notes)
        .bind(&tx.whatsapp_thread_id)
        .bind(Json(&tx.communication_log))
        .bind(buyer_review.map(|r| r.rating))
        .bind(buyer_review.and_then(|r| r.text.clone()))
        .bind(buyer_review.map(|r| r.reviewed_at))
        .bind(seller_review.map(|r| r.rating))
        .bind(seller_review.and_then(|r| r.text.clone()))
        .bind(seller_review.map(|r| r.reviewed_at))
        .bind(&tx.dispute.reason)
        .bind(&tx.dispute.resolution)
        .bind(tx.dispute.resolved_at)
        .bind(tx.dispute.resolved_by)
        .bind(Json(&tx.metadata))
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .bind(tx.completed_at)
        .bind(tx.cancelled_at)
        .bind(&tx.cancellation_reason)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("transaction {}", id)))?
            .into_domain()
    }

    async fn update(&self, id: Uuid, patch: &TransactionPatch) -> RepositoryResult<Transaction> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE transactions SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(price) = &patch.negotiated_price {
            qb.push(", negotiated_price = ").push_bind(price.clone());
        }
        if let Some(price) = &patch.final_price {
            qb.push(", final_price = ").push_bind(price.clone());
        }
        if let Some(method) = &patch.payment_method {
            qb.push(", payment_method = ").push_bind(method.clone());
        }
        if let Some(payment_status) = patch.payment_status {
            qb.push(", payment_status = ").push_bind(payment_status.as_str());
        }
        if let Some(date) = patch.payment_date {
            qb.push(", payment_date = ").push_bind(date);
        }
        if let Some(pickup) = &patch.pickup {
            qb.push(", pickup = ").push_bind(Json(pickup.clone()));
        }
        if let Some(delivery) = &patch.delivery {
            qb.push(", delivery = ").push_bind(Json(delivery.clone()));
        }
        if let Some(notes) = &patch.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        if let Some(thread) = &patch.whatsapp_thread_id {
            qb.push(", whatsapp_thread_id = ").push_bind(thread.clone());
        }
        if let Some(at) = patch.completed_at {
            qb.push(", completed_at = ").push_bind(at);
        }
        if let Some(at) = patch.cancelled_at {
            qb.push(", cancelled_at = ").push_bind(at);
        }
        if let Some(reason) = &patch.cancellation_reason {
            qb.push(", cancellation_reason = ").push_bind(reason.clone());
        }
        if let Some(reason) = &patch.dispute_reason {
            qb.push(", dispute_reason = ").push_bind(reason.clone());
        }
        if let Some(resolution) = &patch.dispute_resolution {
            qb.push(", dispute_resolution = ").push_bind(resolution.clone());
        }
        if let Some(at) = patch.dispute_resolved_at {
            qb.push(", dispute_resolved_at = ").push_bind(at);
        }
        if let Some(by) = patch.dispute_resolved_by {
            qb.push(", dispute_resolved_by = ").push_bind(by);
        }
        if let Some((role, review)) = &patch.review {
            let (rating, text, date) = rating_columns(*role);
            qb.push(format!(", {} = ", rating)).push_bind(review.rating);
            qb.push(format!(", {} = ", text)).push_bind(review.text.clone());
            qb.push(format!(", {} = ", date)).push_bind(review.reviewed_at);
        }
        if !patch.append_messages.is_empty() {
            qb.push(", communication_log = communication_log || ")
                .push_bind(Json(patch.append_messages.clone()))
                .push("::jsonb");
        }

        qb.push(" WHERE id = ").push_bind(id);
        if let Some(expected) = patch.expected_status {
            qb.push(" AND status = ").push_bind(expected.as_str());
        }
        if let Some((role, _)) = &patch.review {
            let (rating, _, _) = rating_columns(*role);
            qb.push(format!(" AND {} IS NULL", rating));
        }
        qb.push(" RETURNING *");

        let row = qb
            .build_query_as::<TransactionRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => row.into_domain(),
            None => Err(self.missing_or_conflict(id).await),
        }
    }

    async fn list(
        &self,
        filter: &TransactionFilter,
        sort: SortSpec,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<Transaction>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let direction = match sort.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM transactions");
        push_filters(&mut select, filter);
        select.push(format!(
            " ORDER BY {} {} NULLS LAST, id {} LIMIT ",
            sort.field.column(),
            direction,
            direction
        ));
        select.push_bind(limit).push(" OFFSET ").push_bind(offset);

        let rows = select
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let items = rows
            .into_iter()
            .map(TransactionRow::into_domain)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn stats(&self, filter: &StatsFilter) -> RepositoryResult<TransactionAggregates> {
        let filter = filter.as_transaction_filter();

        let mut by_status_query =
            QueryBuilder::<Postgres>::new("SELECT status, COUNT(*) FROM transactions");
        push_filters(&mut by_status_query, &filter);
        by_status_query.push(" GROUP BY status");
        let by_status = by_status_query
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?
            .into_iter()
            .map(|(status, count)| {
                validation::parse_transaction_status(&status)
                    .map(|status| StatusCount { status, count })
                    .map_err(|e| RepositoryError::Corrupt(e.to_string()))
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        let mut revenue_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*), COALESCE(SUM(final_price), 0) FROM transactions",
        );
        push_filters(&mut revenue_query, &filter);
        revenue_query.push(" AND status = 'completed'");
        let (completed_count, total_revenue) = revenue_query
            .build_query_as::<(i64, BigDecimal)>()
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let mut monthly_query = QueryBuilder::<Postgres>::new(
            "SELECT to_char(completed_at AT TIME ZONE 'UTC', 'YYYY-MM') AS month, \
             COALESCE(SUM(final_price), 0), COUNT(*) FROM transactions",
        );
        push_filters(&mut monthly_query, &filter);
        monthly_query.push(" AND status = 'completed' AND completed_at IS NOT NULL GROUP BY 1 ORDER BY 1");
        let monthly_revenue = monthly_query
            .build_query_as::<(String, BigDecimal, i64)>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?
            .into_iter()
            .map(|(month, revenue, transactions)| MonthlyRevenue {
                month,
                revenue,
                transactions,
            })
            .collect();

        Ok(TransactionAggregates {
            by_status,
            completed_count,
            total_revenue,
            monthly_revenue,
        })
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    product_id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    status: String,
    transaction_type: String,
    original_price: Option<BigDecimal>,
    negotiated_price: Option<BigDecimal>,
    final_price: BigDecimal,
    currency: String,
    quantity: i32,
    unit: Option<String>,
    payment_method: Option<String>,
    payment_status: String,
    payment_date: Option<DateTime<Utc>>,
    pickup: Json<LogisticsPoint>,
    delivery: Json<LogisticsPoint>,
    notes: Option<String>,
    whatsapp_thread_id: Option<String>,
    communication_log: Json<Vec<CommunicationEntry>>,
    buyer_rating: Option<i16>,
    buyer_review: Option<String>,
    buyer_review_date: Option<DateTime<Utc>>,
    seller_rating: Option<i16>,
    seller_review: Option<String>,
    seller_review_date: Option<DateTime<Utc>>,
    dispute_reason: Option<String>,
    dispute_resolution: Option<String>,
    dispute_resolved_at: Option<DateTime<Utc>>,
    dispute_resolved_by: Option<Uuid>,
    metadata: Json<TransactionMetadata>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
}

fn review_from_columns(
    rating: Option<i16>,
    text: Option<String>,
    date: Option<DateTime<Utc>>,
    fallback: DateTime<Utc>,
) -> Option<PartyReview> {
    rating.map(|rating| PartyReview {
        rating,
        text,
        reviewed_at: date.unwrap_or(fallback),
    })
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let corrupt = |e: validation::ValidationError| {
            RepositoryError::Corrupt(format!("transaction {}: {}", self.id, e))
        };
        let status = validation::parse_transaction_status(&self.status).map_err(corrupt)?;
        let transaction_type =
            validation::parse_transaction_type(&self.transaction_type).map_err(corrupt)?;
        let payment_status =
            validation::parse_payment_status(&self.payment_status).map_err(corrupt)?;

        Ok(Transaction {
            id: self.id,
            product_id: self.product_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            status,
            transaction_type,
            original_price: self.original_price,
            negotiated_price: self.negotiated_price,
            final_price: self.final_price,
            currency: self.currency,
            quantity: self.quantity,
            unit: self.unit,
            payment_method: self.payment_method,
            payment_status,
            payment_date: self.payment_date,
            pickup: self.pickup.0,
            delivery: self.delivery.0,
            notes: self.notes,
            whatsapp_thread_id: self.whatsapp_thread_id,
            communication_log: self.communication_log.0,
            reviews: ReviewSlots {
                by_buyer: review_from_columns(
                    self.buyer_rating,
                    self.buyer_review,
                    self.buyer_review_date,
                    self.updated_at,
                ),
                by_seller: review_from_columns(
                    self.seller_rating,
                    self.seller_review,
                    self.seller_review_date,
                    self.updated_at,
                ),
            },
            dispute: Dispute {
                reason: self.dispute_reason,
                resolution: self.dispute_resolution,
                resolved_at: self.dispute_resolved_at,
                resolved_by: self.dispute_resolved_by,
            },
            metadata: self.metadata.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            cancellation_reason: self.cancellation_reason,
        })
    }
}
