pub mod agents;
pub mod chat;
pub mod critique;
pub mod error;
pub mod events;
pub mod gallery;
pub mod models;
pub mod requests;
