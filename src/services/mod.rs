pub mod inquiry_workflow;
pub mod pricing;
pub mod review_gate;
pub mod state_machine;
pub mod transaction_manager;

pub use inquiry_workflow::{CreateInquiryRequest, InquiryWorkflow};
pub use transaction_manager::{
    CreateTransactionRequest, ListTransactionsQuery, NewMessage, ReviewRequest, StatusChange,
    TransactionDetailsUpdate, TransactionManager, TransactionStats,
};
