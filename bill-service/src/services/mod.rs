//! Services module for bill-service.

pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use memory::InMemoryBillStore;
pub use metrics::{
    get_metrics, init_metrics, record_bill_created, record_error, record_payment,
    record_payment_removed, record_selection_action,
};
pub use store::BillStore;
