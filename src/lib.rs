//! Paydrop - payment-to-download fulfillment for a single digital product
//!
//! This library provides the core functionality for the Paydrop server:
//! webhook authentication, transaction verification, the sale ledger,
//! credential issuance, download authorization, and email notification.

pub mod config;
pub mod credential;
pub mod db;
pub mod email;
pub mod error;
pub mod fulfillment;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod rate_limit;
pub mod storage;
