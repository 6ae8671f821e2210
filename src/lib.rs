pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod utils;
pub mod validation;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::adapters::{PostgresInquiryRepository, PostgresTransactionRepository};
use crate::services::{InquiryWorkflow, TransactionManager};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub transactions: Arc<TransactionManager>,
    pub inquiries: Arc<InquiryWorkflow>,
}

impl AppState {
    /// Wires the core services to the Postgres adapters.
    pub fn from_pool(pool: sqlx::PgPool) -> Self {
        let transactions = TransactionManager::new(Arc::new(PostgresTransactionRepository::new(
            pool.clone(),
        )));
        let inquiries = InquiryWorkflow::new(Arc::new(PostgresInquiryRepository::new(pool.clone())));

        Self {
            db: pool,
            transactions: Arc::new(transactions),
            inquiries: Arc::new(inquiries),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    use handlers::{inquiries, transactions};

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/transactions",
            post(transactions::create_transaction).get(transactions::list_transactions),
        )
        .route("/transactions/stats", get(transactions::transaction_stats))
        .route(
            "/transactions/:id",
            get(transactions::get_transaction).patch(transactions::update_details),
        )
        .route("/transactions/:id/status", put(transactions::update_status))
        .route("/transactions/:id/reviews", post(transactions::add_review))
        .route("/transactions/:id/messages", post(transactions::add_message))
        .route(
            "/inquiries",
            post(inquiries::create_inquiry).get(inquiries::list_inquiries),
        )
        .route("/inquiries/:id", get(inquiries::get_inquiry))
        .route("/inquiries/:id/response", post(inquiries::respond_to_inquiry))
        .route("/inquiries/:id/outbound", post(inquiries::mark_outbound_sent))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
