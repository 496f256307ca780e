//! MC protocol routing headers.
//!
//! # 3E frame (socket)
//!
//! | Byte | Field | Request | Response |
//! |------|-------|:-------:|:--------:|
//! | 0-1 | Subheader | `50 00` | `D0 00` |
//! | 2 | Network number | route | route |
//! | 3 | PC number | route | route |
//! | 4-5 | Request destination module I/O | `FF 03` | `FF 03` |
//! | 6 | Request destination station | `00` | `00` |
//!
//! ASCII frames carry the same fields as hex text (`"500000FF03FF00"`),
//! with the module I/O number written high byte first.
//!
//! # 3C frame, format 4 (serial)
//!
//! After the control character: frame ID `F9`, station, network, PC and
//! self-station number, each two hex digits.
//!
//! # Example
//!
//! ```
//! use plc_link::mitsubishi::Route;
//!
//! let route = Route::new(0x00, 0xFF);
//! assert_eq!(route.request_bytes(), [0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00]);
//! assert_eq!(route.request_text(), "500000FF03FF00");
//! ```

/// Header size of a binary 3E frame, before the length field.
pub const HEADER_SIZE: usize = 7;

/// Enquiry: starts a 3C request.
pub const ENQ: u8 = 0x05;
/// Start of text: positive reply with data.
pub const STX: u8 = 0x02;
/// End of text: closes the data of an STX reply.
pub const ETX: u8 = 0x03;
/// Positive reply without data.
pub const ACK: u8 = 0x06;
/// Negative reply.
pub const NAK: u8 = 0x15;

/// Routing identifiers of the target PLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Network number (0 = local network).
    pub network_no: u8,
    /// PC number (0xFF = the station the frame arrives at).
    pub pc_no: u8,
    /// Station number, serial only.
    pub station_no: u8,
}

impl Route {
    /// Creates a route for a socket connection.
    pub fn new(network_no: u8, pc_no: u8) -> Self {
        Self {
            network_no,
            pc_no,
            station_no: 0,
        }
    }

    /// Sets the serial station number.
    pub fn with_station(mut self, station_no: u8) -> Self {
        self.station_no = station_no;
        self
    }

    /// Binary 3E request header.
    pub fn request_bytes(self) -> [u8; HEADER_SIZE] {
        [0x50, 0x00, self.network_no, self.pc_no, 0xFF, 0x03, 0x00]
    }

    /// Binary 3E response header the PLC must answer with.
    pub fn response_bytes(self) -> [u8; HEADER_SIZE] {
        [0xD0, 0x00, self.network_no, self.pc_no, 0xFF, 0x03, 0x00]
    }

    /// ASCII 3E request header.
    pub fn request_text(self) -> String {
        format!("5000{:02X}{:02X}03FF00", self.network_no, self.pc_no)
    }

    /// ASCII 3E response header.
    pub fn response_text(self) -> String {
        format!("D000{:02X}{:02X}03FF00", self.network_no, self.pc_no)
    }

    /// 3C format 4 header, shared by requests and replies.
    pub fn serial_text(self) -> String {
        format!(
            "F9{:02X}{:02X}{:02X}00",
            self.station_no, self.network_no, self.pc_no
        )
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::new(0x00, 0xFF)
    }
}
