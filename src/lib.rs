//! Ridebot, a WhatsApp ride booking service.

pub mod booking;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod datetime;
pub mod error;
pub mod resolver;
pub mod store;
pub mod webhook;
