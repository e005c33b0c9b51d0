//! The transaction model and the ports the store depends on.

pub mod ports;
pub mod query;
pub mod schema;
pub mod transaction;
pub mod validation;
