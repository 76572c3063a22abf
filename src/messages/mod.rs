//! Structured channel data model: message types, classification and codec.
//!
//! ## Contents
//! - [`Message`], [`Inbound`], [`EventCall`], [`EventResponse`], [`LogRecord`]
//!   message kinds and the structural classifier
//! - [`codec`] newline-delimited JSON over the worker's stdio pair
//!
//! The supervisor consumes [`Inbound`] via pattern matching; nothing outside
//! this module inspects raw field names for routing.

pub mod codec;
mod message;

pub use message::{
    fields, EventCall, EventResponse, Inbound, LogRecord, Message, LOG_MARKER, RESPONSE_MARKER,
};
