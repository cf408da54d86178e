pub mod log;
pub mod recovery;

pub use log::{LogOperation, TransactionLog};
pub use recovery::{RecoveryHandler, apply_transaction_log, recover_database};
