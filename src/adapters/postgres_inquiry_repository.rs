//! Postgres implementation of InquiryRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::ProductInquiry;
use crate::ports::{
    InquiryFilter, InquiryPatch, InquiryRepository, RepositoryError, RepositoryResult,
};
use crate::validation;

#[derive(Clone)]
pub struct PostgresInquiryRepository {
    pool: PgPool,
}

impl PostgresInquiryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &InquiryFilter) {
    qb.push(" WHERE TRUE");
    if let Some(product_id) = filter.product_id {
        qb.push(" AND product_id = ").push_bind(product_id);
    }
    if let Some(buyer_id) = filter.buyer_id {
        qb.push(" AND buyer_id = ").push_bind(buyer_id);
    }
    if let Some(seller_id) = filter.seller_id {
        qb.push(" AND seller_id = ").push_bind(seller_id);
    }
    if let Some(responded) = filter.is_responded {
        qb.push(" AND is_responded = ").push_bind(responded);
    }
}

#[async_trait]
impl InquiryRepository for PostgresInquiryRepository {
    async fn create(&self, inquiry: &ProductInquiry) -> RepositoryResult<ProductInquiry> {
        let row = sqlx::query_as::<_, InquiryRow>(
            r#"
            INSERT INTO product_inquiries (
                id, product_id, buyer_id, seller_id, inquiry_type, subject, message,
                response, responded_at, is_responded, whatsapp_sent, whatsapp_message_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(inquiry.id)
        .bind(inquiry.product_id)
        .bind(inquiry.buyer_id)
        .bind(inquiry.seller_id)
        .bind(inquiry.inquiry_type.as_str())
        .bind(&inquiry.subject)
        .bind(&inquiry.message)
        .bind(&inquiry.response)
        .bind(inquiry.responded_at)
        .bind(inquiry.is_responded)
        .bind(inquiry.whatsapp_sent)
        .bind(&inquiry.whatsapp_message_id)
        .bind(inquiry.created_at)
        .bind(inquiry.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<ProductInquiry> {
        let row =
            sqlx::query_as::<_, InquiryRow>("SELECT * FROM product_inquiries WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("inquiry {}", id)))?
            .into_domain()
    }

    async fn update(&self, id: Uuid, patch: &InquiryPatch) -> RepositoryResult<ProductInquiry> {
        let now = Utc::now();
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE product_inquiries SET updated_at = ");
        qb.push_bind(now);

        if let Some(response) = &patch.response {
            qb.push(", response = ")
                .push_bind(response.clone())
                .push(", is_responded = TRUE, responded_at = ")
                .push_bind(patch.responded_at.unwrap_or(now));
        }
        if let Some(message_id) = &patch.whatsapp_message_id {
            qb.push(", whatsapp_sent = TRUE, whatsapp_message_id = ")
                .push_bind(message_id.clone());
        }

        qb.push(" WHERE id = ").push_bind(id);
        if patch.require_unanswered {
            qb.push(" AND is_responded = FALSE");
        }
        qb.push(" RETURNING *");

        let row = qb
            .build_query_as::<InquiryRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => row.into_domain(),
            None => {
                // Either the id is unknown or the guard rejected the write.
                let existing = self.get_by_id(id).await?;
                Err(RepositoryError::Conflict(format!(
                    "inquiry {} already has a response",
                    existing.id
                )))
            }
        }
    }

    async fn list(
        &self,
        filter: &InquiryFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<ProductInquiry>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM product_inquiries");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM product_inquiries");
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<InquiryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let items = rows
            .into_iter()
            .map(InquiryRow::into_domain)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok((items, total))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InquiryRow {
    id: Uuid,
    product_id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    inquiry_type: String,
    subject: Option<String>,
    message: String,
    response: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    is_responded: bool,
    whatsapp_sent: bool,
    whatsapp_message_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InquiryRow {
    fn into_domain(self) -> RepositoryResult<ProductInquiry> {
        let inquiry_type = validation::parse_inquiry_type(&self.inquiry_type)
            .map_err(|e| RepositoryError::Corrupt(format!("inquiry {}: {}", self.id, e)))?;

        Ok(ProductInquiry {
            id: self.id,
            product_id: self.product_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            inquiry_type,
            subject: self.subject,
            message: self.message,
            response: self.response,
            responded_at: self.responded_at,
            is_responded: self.is_responded,
            whatsapp_sent: self.whatsapp_sent,
            whatsapp_message_id: self.whatsapp_message_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
