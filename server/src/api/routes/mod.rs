//! API route handlers

pub mod entities;
pub mod health;
