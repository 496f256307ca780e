//! Panasonic FP communication (MEWTOCOL).
//!
//! - [`Device`]: device codes, grouped into address [`Band`]s
//! - [`PanasonicProtocol`]: MEWTOCOL-COM ASCII and binary frames

mod address;
mod device;
mod frame;

pub use address::{ascii_point, ascii_span, binary_contact, binary_data};
pub use device::{Band, Device};
pub use frame::{Format, Medium, PanasonicProtocol};
