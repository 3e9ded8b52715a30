pub mod client;
pub mod query;

pub use client::{CrmClient, CrmError, CrmExecutor};
pub use query::QueryDoc;
