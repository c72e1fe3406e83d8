// src/account/mod.rs

pub mod client;

pub use client::{AccountClient, EmailPreferences, FeedbackRequest};
