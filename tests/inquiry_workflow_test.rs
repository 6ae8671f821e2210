mod common;

use agro_market_core::domain::{Actor, InquiryType};
use agro_market_core::error::CoreError;
use agro_market_core::ports::InquiryFilter;
use agro_market_core::services::{CreateInquiryRequest, InquiryWorkflow};
use agro_market_core::utils::pagination::PageRequest;
use common::inquiry_workflow;
use std::sync::Arc;
use uuid::Uuid;

fn question(seller_id: Uuid, inquiry_type: &str) -> CreateInquiryRequest {
    CreateInquiryRequest {
        product_id: Uuid::new_v4(),
        seller_id,
        inquiry_type: inquiry_type.to_string(),
        subject: Some("Flete".to_string()),
        message: "¿Hacen envíos a Pergamino?".to_string(),
    }
}

#[tokio::test]
async fn test_create_and_answer_inquiry() {
    let workflow = inquiry_workflow();
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();

    let inquiry = workflow
        .create_inquiry(buyer, question(seller, "logistics"))
        .await
        .unwrap();
    assert_eq!(inquiry.inquiry_type, InquiryType::Logistics);
    assert!(!inquiry.is_responded);
    assert!(inquiry.response.is_none());
    assert!(!inquiry.whatsapp_sent);

    let answered = workflow
        .respond_to_inquiry(seller, inquiry.id, "Sí, con costo adicional")
        .await
        .unwrap();
    assert!(answered.is_responded);
    assert_eq!(answered.response.as_deref(), Some("Sí, con costo adicional"));
    assert!(answered.responded_at.is_some());
}

#[tokio::test]
async fn test_unknown_inquiry_type_is_rejected() {
    let workflow = inquiry_workflow();

    let err = workflow
        .create_inquiry(Uuid::new_v4(), question(Uuid::new_v4(), "gossip"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::InvalidInquiryType(t) if t == "gossip"));
}

#[tokio::test]
async fn test_cannot_ask_yourself() {
    let workflow = inquiry_workflow();
    let user = Uuid::new_v4();

    let err = workflow
        .create_inquiry(user, question(user, "price"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::SelfTransaction));
}

#[tokio::test]
async fn test_only_addressed_seller_answers_once() {
    let workflow = inquiry_workflow();
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let inquiry = workflow
        .create_inquiry(buyer, question(seller, "quality"))
        .await
        .unwrap();

    let err = workflow
        .respond_to_inquiry(Uuid::new_v4(), inquiry.id, "Respuesta ajena")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAuthorized(_)));

    let err = workflow
        .respond_to_inquiry(buyer, inquiry.id, "Me respondo solo")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAuthorized(_)));

    workflow
        .respond_to_inquiry(seller, inquiry.id, "Humedad 13%")
        .await
        .unwrap();
    let err = workflow
        .respond_to_inquiry(seller, inquiry.id, "Corrijo: 14%")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InquiryAlreadyResponded));

    let stored = workflow
        .get_inquiry(&Actor::member(buyer), inquiry.id)
        .await
        .unwrap();
    assert_eq!(stored.response.as_deref(), Some("Humedad 13%"));
}

#[tokio::test]
async fn test_respond_to_missing_inquiry() {
    let workflow = inquiry_workflow();

    let err = workflow
        .respond_to_inquiry(Uuid::new_v4(), Uuid::new_v4(), "hola")
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_responses_store_one() {
    let workflow = Arc::new(inquiry_workflow());
    let seller = Uuid::new_v4();
    let inquiry_id = workflow
        .create_inquiry(Uuid::new_v4(), question(seller, "availability"))
        .await
        .unwrap()
        .id;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let workflow = Arc::clone(&workflow);
            tokio::spawn(async move {
                workflow
                    .respond_to_inquiry(seller, inquiry_id, &format!("respuesta {}", i))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert!(matches!(err, CoreError::InquiryAlreadyResponded)),
        }
    }
    assert_eq!(accepted, 1);
}

#[tokio::test]
async fn test_read_access_and_listing() {
    let workflow: InquiryWorkflow = inquiry_workflow();
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();

    let first = workflow
        .create_inquiry(buyer, question(seller, "general"))
        .await
        .unwrap();
    workflow
        .create_inquiry(buyer, question(seller, "price"))
        .await
        .unwrap();
    workflow
        .create_inquiry(Uuid::new_v4(), question(Uuid::new_v4(), "price"))
        .await
        .unwrap();
    workflow
        .respond_to_inquiry(seller, first.id, "Consultar por privado")
        .await
        .unwrap();

    let err = workflow
        .get_inquiry(&Actor::member(Uuid::new_v4()), first.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAuthorized(_)));
    assert!(workflow
        .get_inquiry(&Actor::admin(Uuid::new_v4()), first.id)
        .await
        .is_ok());

    let for_seller = InquiryFilter {
        seller_id: Some(seller),
        ..Default::default()
    };
    let page = workflow
        .list_inquiries(&for_seller, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|i| i.seller_id == seller));

    let unanswered = InquiryFilter {
        seller_id: Some(seller),
        is_responded: Some(false),
        ..Default::default()
    };
    let page = workflow
        .list_inquiries(&unanswered, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].inquiry_type, InquiryType::Price);
}

#[tokio::test]
async fn test_mark_outbound_sent() {
    let workflow = inquiry_workflow();
    let buyer = Actor::member(Uuid::new_v4());
    let seller = Uuid::new_v4();
    let inquiry = workflow
        .create_inquiry(buyer.user_id, question(seller, "general"))
        .await
        .unwrap();

    let relayed = workflow
        .mark_outbound_sent(&buyer, inquiry.id, "wamid.HBgL")
        .await
        .unwrap();
    assert!(relayed.whatsapp_sent);
    assert_eq!(relayed.whatsapp_message_id.as_deref(), Some("wamid.HBgL"));
    assert!(!relayed.is_responded);

    let err = workflow
        .mark_outbound_sent(&Actor::member(Uuid::new_v4()), inquiry.id, "wamid.X")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAuthorized(_)));
}
