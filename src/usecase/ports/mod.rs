pub mod ai;
pub mod repo;
pub mod session;
