//! Password-gated hierarchical notes.
//!
//! A [`store::Forest`] of folders and documents is held in memory by a
//! [`notebook::Notebook`], persisted wholesale through [`db::Storage`], and
//! periodically re-saved by [`autosave`] while a document is open. Access goes
//! through the plaintext [`auth::AuthGate`].

pub mod api;
pub mod auth;
pub mod autosave;
pub mod config;
pub mod db;
pub mod models;
pub mod notebook;
pub mod render;
pub mod selection;
pub mod store;
