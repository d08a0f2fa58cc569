//! Conversation UI components for the question/answer screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod status;

pub use manager::{ConversationAction, ConversationManager};
