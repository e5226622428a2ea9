pub mod app_state;
pub mod page_state;
