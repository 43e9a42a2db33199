//! subsync - Stripe billing event reconciliation service
//!
//! This library receives signed billing lifecycle webhooks from Stripe,
//! deduplicates them against a durable event ledger, resolves each event
//! to an internal account, and merges the event's fields into that
//! account's subscription state.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod id;
pub mod models;
pub mod payments;
pub mod reconcile;
