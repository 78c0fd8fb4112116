//! API routes and handlers

pub mod chat;
pub mod embed;
pub mod meta;
mod router;

pub use router::create_router;
