//! Built-in route handlers.

pub mod html;
pub mod static_files;
