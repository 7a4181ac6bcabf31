//! HTTP Routes

pub mod clients;
pub mod columns;
pub mod predictions;
