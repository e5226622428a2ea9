pub mod export;
pub mod gemini;
pub mod import;
pub mod memory;
pub mod sqlite;
