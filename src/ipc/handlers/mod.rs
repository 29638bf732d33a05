pub mod auth;
pub mod content;
pub mod core;
pub mod editor;
