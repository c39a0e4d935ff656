pub mod clipboard;
pub mod redact;
