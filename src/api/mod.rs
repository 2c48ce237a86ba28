//! API module containing all versioned API endpoints

pub mod common;
pub mod v1;
