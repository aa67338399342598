pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod mail;
pub mod state;
pub mod todos;

#[cfg(test)]
pub(crate) mod testing;
