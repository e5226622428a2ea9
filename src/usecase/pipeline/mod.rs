//! The view pipeline: filter, then sort, then paginate. Everything here is
//! synchronous and never mutates its inputs.

pub mod bulk;
pub mod export;
pub mod filter;
pub mod paginate;
pub mod selection;
pub mod sort;
