//! Entity to model mappers
//!
//! Conversions from database rows to domain entities. Writes bind entity
//! fields directly, so there are no insert structs.

mod chat;
mod message;
mod user;
