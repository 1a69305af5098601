//! Inbound adapters translating operator input into domain requests.

pub mod cli;
