pub mod ai_service;
pub mod edit_service;
pub mod import_service;
pub mod query_service;
pub mod rate_gate;
pub mod request_slot;
pub mod session_service;
