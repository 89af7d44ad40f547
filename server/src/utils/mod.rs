//! Utility functions for the application

pub mod cypher;
pub mod retry;
