//! Utility modules: retry, timeout, SQL text helpers.

pub mod retry;
pub mod sql;
pub mod timeout;
