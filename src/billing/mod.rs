pub mod ledger;
pub mod pricing;

pub use ledger::Receipt;
pub use pricing::{Purchase, Quote};
