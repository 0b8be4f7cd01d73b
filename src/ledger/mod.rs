pub mod models;
pub mod reconciler;
pub mod repository;
pub mod store;

#[cfg(test)]
pub mod memory;

pub use reconciler::{SaleInput, SaleLedger, SaleUpdate};
pub use repository::LedgerRepository;
pub use store::LedgerStore;
