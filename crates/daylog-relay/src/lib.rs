//! Telegram relay for Daylog. Long-polls the Bot API, turns chat messages
//! into calls against the server's internal `/api/bot` routes and answers
//! every message in plain text.

pub mod backend;
pub mod commands;
pub mod config;
pub mod handler;
pub mod relay;
pub mod telegram;
