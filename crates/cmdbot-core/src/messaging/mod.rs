//! Transport-agnostic messaging abstractions (Telegram today; others later).

pub mod port;
pub mod types;
