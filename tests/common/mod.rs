#![allow(dead_code)]

use bigdecimal::BigDecimal;
use std::sync::Arc;
use uuid::Uuid;

use agro_market_core::adapters::{InMemoryInquiryRepository, InMemoryTransactionRepository};
use agro_market_core::domain::{Actor, PartyInfo, ProductInfo, Transaction};
use agro_market_core::services::{
    CreateTransactionRequest, InquiryWorkflow, StatusChange, TransactionDetailsUpdate,
    TransactionManager,
};

pub struct Fixture {
    pub repository: InMemoryTransactionRepository,
    pub manager: TransactionManager,
    pub buyer: Actor,
    pub seller: Actor,
}

impl Fixture {
    pub fn new() -> Self {
        let repository = InMemoryTransactionRepository::new();
        let manager = TransactionManager::new(Arc::new(repository.clone()));
        Self {
            repository,
            manager,
            buyer: Actor::member(Uuid::new_v4()),
            seller: Actor::member(Uuid::new_v4()),
        }
    }

    pub fn product(&self, price: Option<i64>, quantity: Option<i32>) -> ProductInfo {
        ProductInfo {
            id: Uuid::new_v4(),
            title: "Trigo candeal".to_string(),
            category: "granos".to_string(),
            price: price.map(BigDecimal::from),
            price_type: "per_unit".to_string(),
            currency: "ARS".to_string(),
            unit: Some("tonelada".to_string()),
            quantity,
            is_active: true,
            is_available: true,
            seller_id: self.seller.user_id,
        }
    }

    pub async fn create(
        &self,
        product: &ProductInfo,
        quantity: i32,
        negotiated_price: Option<i64>,
    ) -> Transaction {
        self.manager
            .create(
                self.buyer.user_id,
                request(product, quantity, negotiated_price),
                product,
                &party("Vendedora"),
                &party("Comprador"),
            )
            .await
            .expect("transaction created")
    }

    pub async fn create_default(&self) -> Transaction {
        let product = self.product(Some(50), Some(10));
        self.create(&product, 2, None).await
    }

    pub async fn pay(&self, tx: &Transaction) -> Transaction {
        self.manager
            .update_details(
                &self.buyer,
                tx.id,
                TransactionDetailsUpdate {
                    payment_status: Some("completed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("payment recorded")
    }

    pub async fn move_to(&self, actor: &Actor, tx: &Transaction, status: &str) -> Transaction {
        self.manager
            .update_status(actor, tx.id, change(status))
            .await
            .unwrap_or_else(|e| panic!("transition to {} failed: {}", status, e))
    }

    /// Drives a fresh transaction all the way to `completed`.
    pub async fn completed(&self) -> Transaction {
        let tx = self.create_default().await;
        let tx = self.pay(&tx).await;
        let tx = self.move_to(&self.seller, &tx, "confirmed").await;
        let tx = self.move_to(&self.buyer, &tx, "in_progress").await;
        self.move_to(&self.buyer, &tx, "completed").await
    }
}

pub fn party(name: &str) -> PartyInfo {
    PartyInfo {
        name: name.to_string(),
        email: format!("{}@campo.example", name.to_lowercase()),
        phone: Some("+54 9 11 5555 0000".to_string()),
        verification_level: "verified".to_string(),
    }
}

pub fn request(
    product: &ProductInfo,
    quantity: i32,
    negotiated_price: Option<i64>,
) -> CreateTransactionRequest {
    CreateTransactionRequest {
        product_id: product.id,
        transaction_type: "sale".to_string(),
        quantity,
        negotiated_price: negotiated_price.map(BigDecimal::from),
        payment_method: None,
        pickup: None,
        delivery: None,
        notes: None,
        whatsapp_thread_id: None,
    }
}

pub fn change(status: &str) -> StatusChange {
    StatusChange {
        status: status.to_string(),
        reason: None,
    }
}

pub fn inquiry_workflow() -> InquiryWorkflow {
    InquiryWorkflow::new(Arc::new(InMemoryInquiryRepository::new()))
}
