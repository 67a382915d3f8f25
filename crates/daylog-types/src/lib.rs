//! Wire and domain types shared by the Daylog server, API handlers and the
//! Telegram relay.

pub mod api;
pub mod models;
