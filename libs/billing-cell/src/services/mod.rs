pub mod transaction;
pub mod recurring;
pub mod bill;

pub use transaction::TransactionService;
pub use recurring::RecurringService;
pub use bill::BillService;
