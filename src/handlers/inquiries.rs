use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Actor, PartyRole};
use crate::error::AppError;
use crate::ports::InquiryFilter;
use crate::services::CreateInquiryRequest;
use crate::utils::pagination::PageRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RespondPayload {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct OutboundPayload {
    pub message_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InquiryListParams {
    /// Which side of the inquiry the caller is listing as. Defaults to seller.
    pub role: Option<PartyRole>,
    pub product_id: Option<Uuid>,
    pub is_responded: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn create_inquiry(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateInquiryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let inquiry = state.inquiries.create_inquiry(actor.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

pub async fn list_inquiries(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<InquiryListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = InquiryFilter {
        product_id: params.product_id,
        is_responded: params.is_responded,
        ..Default::default()
    };
    match params.role.unwrap_or(PartyRole::Seller) {
        PartyRole::Buyer => filter.buyer_id = Some(actor.user_id),
        PartyRole::Seller => filter.seller_id = Some(actor.user_id),
    }
    let page = PageRequest {
        page: params.page,
        page_size: params.page_size,
    };

    Ok(Json(state.inquiries.list_inquiries(&filter, page).await?))
}

pub async fn get_inquiry(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.inquiries.get_inquiry(&actor, id).await?))
}

pub async fn respond_to_inquiry(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondPayload>,
) -> Result<impl IntoResponse, AppError> {
    let inquiry = state
        .inquiries
        .respond_to_inquiry(actor.user_id, id, &payload.response)
        .await?;
    Ok(Json(inquiry))
}

pub async fn mark_outbound_sent(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<OutboundPayload>,
) -> Result<impl IntoResponse, AppError> {
    let inquiry = state
        .inquiries
        .mark_outbound_sent(&actor, id, &payload.message_id)
        .await?;
    Ok(Json(inquiry))
}
