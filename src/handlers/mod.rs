//! Request handlers, grouped by audience.
//!
//! Handlers orchestrate: clean the form, run the visibility query, consult the
//! authorization rules, then answer with a page context or a redirect. They
//! hold no rules of their own.

pub mod admin;
pub mod blog;
pub mod pages;
