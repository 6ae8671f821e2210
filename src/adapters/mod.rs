pub mod in_memory;
pub mod postgres_inquiry_repository;
pub mod postgres_transaction_repository;

pub use in_memory::{InMemoryInquiryRepository, InMemoryTransactionRepository};
pub use postgres_inquiry_repository::PostgresInquiryRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
