//! Bookings: the data model and the factory that turns a confirmed
//! conversation into a persisted booking.

pub mod factory;
pub mod model;

pub use factory::BookingFactory;
pub use model::{Booking, BookingDraft, ChannelPolicy, Customer, VehicleClass};
