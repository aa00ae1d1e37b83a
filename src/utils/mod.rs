//! Cross-cutting helpers: developer logging, log4rs setup and numeric conversions.
pub mod devlog;
pub mod logger;
pub mod num;
