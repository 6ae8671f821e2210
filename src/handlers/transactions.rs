use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Actor, BuyerInfo, ProductInfo, SellerInfo};
use crate::error::{AppError, CoreError};
use crate::ports::{SortField, SortOrder, SortSpec, StatsFilter, TransactionFilter};
use crate::services::{
    CreateTransactionRequest, ListTransactionsQuery, NewMessage, ReviewRequest, StatusChange,
    TransactionDetailsUpdate,
};
use crate::utils::pagination::PageRequest;
use crate::validation;
use crate::AppState;

/// The buyer's request plus the snapshots fetched by the catalog and identity services.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionPayload {
    pub transaction: CreateTransactionRequest,
    pub product: ProductInfo,
    pub seller: SellerInfo,
    pub buyer: BuyerInfo,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub product_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub user_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// Members only ever see their own records.
fn scope_user(actor: &Actor, requested: Option<Uuid>) -> Option<Uuid> {
    if actor.is_elevated() {
        requested
    } else {
        Some(actor.user_id)
    }
}

pub async fn create_transaction(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state
        .transactions
        .create(
            actor.user_id,
            payload.transaction,
            &payload.product,
            &payload.seller,
            &payload.buyer,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let status = params
        .status
        .as_deref()
        .map(validation::parse_transaction_status)
        .transpose()
        .map_err(CoreError::from)?;

    let query = ListTransactionsQuery {
        filter: TransactionFilter {
            status,
            product_id: params.product_id,
            buyer_id: params.buyer_id,
            seller_id: params.seller_id,
            user_id: scope_user(&actor, params.user_id),
            date_from: params.date_from,
            date_to: params.date_to,
        },
        sort: SortSpec {
            field: params.sort_by.unwrap_or_default(),
            order: params.order.unwrap_or_default(),
        },
        page: PageRequest {
            page: params.page,
            page_size: params.page_size,
        },
    };

    Ok(Json(state.transactions.list(&query).await?))
}

pub async fn transaction_stats(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = StatsFilter {
        user_id: scope_user(&actor, params.user_id),
        date_from: params.date_from,
        date_to: params.date_to,
    };

    Ok(Json(state.transactions.stats(&filter).await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.transactions.get(&actor, id).await?))
}

pub async fn update_details(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(update): Json<TransactionDetailsUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.transactions.update_details(&actor, id, update).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.transactions.update_status(&actor, id, change).await?))
}

pub async fn add_review(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.transactions.add_review(&actor, id, review).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn add_message(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(message): Json<NewMessage>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.transactions.add_message(&actor, id, message).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_scoped_to_themselves() {
        let member = Actor::member(Uuid::new_v4());
        let other = Uuid::new_v4();
        assert_eq!(scope_user(&member, Some(other)), Some(member.user_id));
        assert_eq!(scope_user(&member, None), Some(member.user_id));

        let admin = Actor::admin(Uuid::new_v4());
        assert_eq!(scope_user(&admin, Some(other)), Some(other));
        assert_eq!(scope_user(&admin, None), None);
    }
}
