#[macro_use]
pub mod record;

pub mod customer;
pub mod dataset;
pub mod edit;
pub mod filter;
pub mod invoice;
pub mod project;
pub mod query;
pub mod session;
