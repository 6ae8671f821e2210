//! Buyer to seller pre-sale questions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Actor, ProductInquiry};
use crate::error::{CoreError, CoreResult};
use crate::ports::{InquiryFilter, InquiryPatch, InquiryRepository, RepositoryError};
use crate::utils::pagination::{Page, PageRequest};
use crate::validation::{self, MESSAGE_MAX_LEN, SUBJECT_MAX_LEN};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInquiryRequest {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub inquiry_type: String,
    pub subject: Option<String>,
    pub message: String,
}

pub struct InquiryWorkflow {
    repository: Arc<dyn InquiryRepository>,
}

impl InquiryWorkflow {
    pub fn new(repository: Arc<dyn InquiryRepository>) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create_inquiry(
        &self,
        buyer_id: Uuid,
        request: CreateInquiryRequest,
    ) -> CoreResult<ProductInquiry> {
        let inquiry_type = validation::parse_inquiry_type(&request.inquiry_type)
            .map_err(|_| CoreError::InvalidInquiryType(request.inquiry_type.clone()))?;
        let message = validation::clean_text("message", &request.message, MESSAGE_MAX_LEN)?;
        let subject =
            validation::clean_optional_text("subject", request.subject.as_deref(), SUBJECT_MAX_LEN)?;

        if buyer_id == request.seller_id {
            return Err(CoreError::SelfTransaction);
        }

        let inquiry = ProductInquiry::new(
            request.product_id,
            buyer_id,
            request.seller_id,
            inquiry_type,
            subject,
            message,
        );
        let created = self.repository.create(&inquiry).await?;

        tracing::info!(inquiry_id = %created.id, inquiry_type = %created.inquiry_type, "inquiry created");
        Ok(created)
    }

    /// Answers an inquiry. Only the addressed seller may answer, and only once.
    #[tracing::instrument(skip(self, response))]
    pub async fn respond_to_inquiry(
        &self,
        seller_id: Uuid,
        inquiry_id: Uuid,
        response: &str,
    ) -> CoreResult<ProductInquiry> {
        let response = validation::clean_text("response", response, MESSAGE_MAX_LEN)?;
        let inquiry = self.repository.get_by_id(inquiry_id).await?;

        if inquiry.seller_id != seller_id {
            tracing::warn!("inquiry response attempted by a user other than the seller");
            return Err(CoreError::NotAuthorized(
                "only the addressed seller can respond".to_string(),
            ));
        }
        if inquiry.is_responded {
            return Err(CoreError::InquiryAlreadyResponded);
        }

        let patch = InquiryPatch {
            require_unanswered: true,
            response: Some(response),
            responded_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self
            .repository
            .update(inquiry_id, &patch)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => CoreError::InquiryAlreadyResponded,
                other => CoreError::from(other),
            })?;

        tracing::info!(inquiry_id = %updated.id, "inquiry answered");
        Ok(updated)
    }

    pub async fn get_inquiry(&self, actor: &Actor, inquiry_id: Uuid) -> CoreResult<ProductInquiry> {
        let inquiry = self.repository.get_by_id(inquiry_id).await?;
        let involved = actor.user_id == inquiry.buyer_id || actor.user_id == inquiry.seller_id;
        if !involved && !actor.is_elevated() {
            return Err(CoreError::NotAuthorized(
                "inquiry belongs to other users".to_string(),
            ));
        }
        Ok(inquiry)
    }

    pub async fn list_inquiries(
        &self,
        filter: &InquiryFilter,
        page: PageRequest,
    ) -> CoreResult<Page<ProductInquiry>> {
        let (items, total) = self
            .repository
            .list(filter, page.limit(), page.offset())
            .await?;
        Ok(Page::new(items, total, page))
    }

    /// Records that the inquiry was relayed over the outbound messaging channel.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn mark_outbound_sent(
        &self,
        actor: &Actor,
        inquiry_id: Uuid,
        message_id: &str,
    ) -> CoreResult<ProductInquiry> {
        let message_id = validation::clean_text("whatsapp_message_id", message_id, 255)?;
        self.get_inquiry(actor, inquiry_id).await?;

        let patch = InquiryPatch {
            whatsapp_message_id: Some(message_id),
            ..Default::default()
        };
        Ok(self.repository.update(inquiry_id, &patch).await?)
    }
}
