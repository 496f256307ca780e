//! MEWTOCOL device codes.
//!
//! Codes fall into four bands. The band decides which command family and
//! address form a request uses.
//!
//! | Band | Devices | Codes | Frames |
//! |------|---------|:-----:|--------|
//! | [`Band::Binary`] | WL, WR, WY, WX, SV, EV, LD, S_WR, S_DT, DT, FL | 0–10 | binary only |
//! | [`Band::Contact`] | T, C, X (read-only), Y, R, C_L | 100–152 | ASCII `RC*`/`WC*` |
//! | [`Band::Data`] | L, D, F | 200–202 | ASCII `RD`/`WD` |
//! | [`Band::Index`] | IX, IY, ID | 300–302 | ASCII `RD`/`WD`, fixed width |

use std::fmt;

use crate::packet::DeviceCode;

/// Address band of a device code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// Binary-protocol memory area.
    Binary,
    /// Bit-addressable contact area.
    Contact,
    /// Word data registers.
    Data,
    /// Index registers.
    Index,
}

/// Panasonic FP device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs, non_camel_case_types)]
pub enum Device {
    WL,
    WR,
    WY,
    WX,
    SV,
    EV,
    LD,
    S_WR,
    S_DT,
    DT,
    FL,
    T,
    C,
    X,
    Y,
    R,
    C_L,
    L,
    D,
    F,
    IX,
    IY,
    ID,
}

impl Device {
    /// Band the code belongs to.
    pub fn band(self) -> Band {
        match self.code() {
            0..=99 => Band::Binary,
            100..=199 => Band::Contact,
            200..=299 => Band::Data,
            _ => Band::Index,
        }
    }

    /// Payload width in hex digits for index registers.
    pub fn index_width(self) -> Option<usize> {
        match self {
            Self::IX | Self::IY => Some(4),
            Self::ID => Some(8),
            _ => None,
        }
    }
}

impl DeviceCode for Device {
    fn code(self) -> u16 {
        match self {
            Self::WL => 0,
            Self::WR => 1,
            Self::WY => 2,
            Self::WX => 3,
            Self::SV => 4,
            Self::EV => 5,
            Self::LD => 6,
            Self::S_WR => 7,
            Self::S_DT => 8,
            Self::DT => 9,
            Self::FL => 10,
            Self::T => 100,
            Self::C => 101,
            Self::X => 102,
            Self::Y => 150,
            Self::R => 151,
            Self::C_L => 152,
            Self::L => 200,
            Self::D => 201,
            Self::F => 202,
            Self::IX => 300,
            Self::IY => 301,
            Self::ID => 302,
        }
    }

    /// Name on the wire; scoped variants drop their prefix (`C_L` is `L`).
    fn name(self) -> &'static str {
        match self {
            Self::WL => "WL",
            Self::WR | Self::S_WR => "WR",
            Self::WY => "WY",
            Self::WX => "WX",
            Self::SV => "SV",
            Self::EV => "EV",
            Self::LD => "LD",
            Self::S_DT => "DT",
            Self::DT => "DT",
            Self::FL => "FL",
            Self::T => "T",
            Self::C => "C",
            Self::X => "X",
            Self::Y => "Y",
            Self::R => "R",
            Self::C_L | Self::L => "L",
            Self::D => "D",
            Self::F => "F",
            Self::IX => "IX",
            Self::IY => "IY",
            Self::ID => "ID",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
