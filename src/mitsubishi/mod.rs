//! Mitsubishi MELSEC communication (MC protocol).
//!
//! - [`Device`]: device codes and their addressing rules
//! - [`Route`]: network/PC/station identifiers carried in every header
//! - [`MitsubishiProtocol`]: frame builder and parser for the binary 3E,
//!   ASCII 3E and serial 3C dialects

mod address;
mod device;
mod frame;
mod header;

pub use address::{ascii_address, binary_address};
pub use device::Device;
pub use frame::{
    Dialect, MitsubishiProtocol, MAX_BATCH_POINTS, MAX_BATCH_WORDS, MAX_RANDOM_ITEMS,
};
pub use header::Route;
