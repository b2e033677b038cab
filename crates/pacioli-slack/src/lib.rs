//! Slack posting for pacioli reports

pub mod blocks;
pub mod client;

pub use client::SlackClient;
