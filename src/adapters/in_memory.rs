//! In-process repositories.
//!
//! Each write takes the map's write lock for the whole check-and-apply, which
//! gives the same per-record serialization the Postgres guards provide.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ProductInquiry, Transaction, TransactionStatus};
use crate::ports::{
    month_key, InquiryFilter, InquiryPatch, InquiryRepository, MonthlyRevenue, RepositoryError,
    RepositoryResult, SortField, SortOrder, SortSpec, StatsFilter, StatusCount,
    TransactionAggregates, TransactionFilter, TransactionPatch, TransactionRepository,
};

#[derive(Clone, Default)]
pub struct InMemoryTransactionRepository {
    records: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &Transaction, b: &Transaction, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::FinalPrice => a.final_price.cmp(&b.final_price),
        SortField::CompletedAt => a.completed_at.cmp(&b.completed_at),
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut records = self.records.write().await;
        if records.contains_key(&tx.id) {
            return Err(RepositoryError::Conflict(format!(
                "transaction {} already exists",
                tx.id
            )));
        }
        records.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transaction> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("transaction {}", id)))
    }

    async fn update(&self, id: Uuid, patch: &TransactionPatch) -> RepositoryResult<Transaction> {
        let mut records = self.records.write().await;
        let tx = records
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("transaction {}", id)))?;

        patch.check_guards(tx)?;
        patch.apply_to(tx, Utc::now());
        Ok(tx.clone())
    }

    async fn list(
        &self,
        filter: &TransactionFilter,
        sort: SortSpec,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<Transaction>, i64)> {
        let records = self.records.read().await;
        let mut matching: Vec<&Transaction> =
            records.values().filter(|tx| filter.matches(tx)).collect();

        matching.sort_by(|a, b| {
            let ordering = compare(a, b, sort.field).then_with(|| a.id.cmp(&b.id));
            match sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn stats(&self, filter: &StatsFilter) -> RepositoryResult<TransactionAggregates> {
        let filter = filter.as_transaction_filter();
        let records = self.records.read().await;

        let mut by_status: BTreeMap<TransactionStatus, i64> = BTreeMap::new();
        let mut completed_count = 0;
        let mut total_revenue = BigDecimal::from(0);
        let mut monthly: BTreeMap<String, (BigDecimal, i64)> = BTreeMap::new();

        for tx in records.values().filter(|tx| filter.matches(tx)) {
            *by_status.entry(tx.status).or_insert(0) += 1;

            if tx.status == TransactionStatus::Completed {
                completed_count += 1;
                total_revenue += tx.final_price.clone();

                let month = month_key(tx.completed_at.unwrap_or(tx.updated_at));
                let bucket = monthly
                    .entry(month)
                    .or_insert_with(|| (BigDecimal::from(0), 0));
                bucket.0 += tx.final_price.clone();
                bucket.1 += 1;
            }
        }

        Ok(TransactionAggregates {
            by_status: by_status
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            completed_count,
            total_revenue,
            monthly_revenue: monthly
                .into_iter()
                .map(|(month, (revenue, transactions))| MonthlyRevenue {
                    month,
                    revenue,
                    transactions,
                })
                .collect(),
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryInquiryRepository {
    records: Arc<RwLock<HashMap<Uuid, ProductInquiry>>>,
}

impl InMemoryInquiryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InquiryRepository for InMemoryInquiryRepository {
    async fn create(&self, inquiry: &ProductInquiry) -> RepositoryResult<ProductInquiry> {
        let mut records = self.records.write().await;
        if records.contains_key(&inquiry.id) {
            return Err(RepositoryError::Conflict(format!(
                "inquiry {} already exists",
                inquiry.id
            )));
        }
        records.insert(inquiry.id, inquiry.clone());
        Ok(inquiry.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<ProductInquiry> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("inquiry {}", id)))
    }

    async fn update(&self, id: Uuid, patch: &InquiryPatch) -> RepositoryResult<ProductInquiry> {
        let mut records = self.records.write().await;
        let inquiry = records
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("inquiry {}", id)))?;

        patch.check_guards(inquiry)?;
        patch.apply_to(inquiry, Utc::now());
        Ok(inquiry.clone())
    }

    async fn list(
        &self,
        filter: &InquiryFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<ProductInquiry>, i64)> {
        let records = self.records.read().await;
        let mut matching: Vec<&ProductInquiry> = records
            .values()
            .filter(|inquiry| filter.matches(inquiry))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }
}
