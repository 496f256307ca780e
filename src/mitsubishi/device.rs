//! MELSEC device codes.
//!
//! | Device | Code | Addressing | Unit |
//! |--------|:----:|:----------:|:----:|
//! | SM, SD | 0x91, 0xA9 | decimal | bit, word |
//! | X, Y | 0x9C, 0x9D | hex | bit |
//! | M, L, F, V | 0x90, 0x92, 0x93, 0x94 | decimal | bit |
//! | B, SB, DX, DY | 0xA0, 0xA1, 0xA2, 0xA3 | hex | bit |
//! | D, R, ZR | 0xA8, 0xAF, 0xB0 | decimal | word |
//! | W, SW | 0xB4, 0xB5 | hex | word |
//! | TS/TC/TN, CS/CC/CN | 0xC1/0xC0/0xC2, 0xC4/0xC3/0xC5 | decimal | bit, word |
//! | Z | 0xCC | decimal | word |

use std::fmt;

use crate::packet::DeviceCode;

/// Mitsubishi MELSEC device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Device {
    M,
    SM,
    L,
    F,
    V,
    X,
    Y,
    B,
    SB,
    DX,
    DY,
    D,
    SD,
    R,
    ZR,
    W,
    SW,
    TC,
    TS,
    TN,
    CC,
    CS,
    CN,
    Z,
}

impl Device {
    /// Returns `true` for devices whose number is written in hex.
    pub fn is_hex_addressed(self) -> bool {
        matches!(
            self,
            Self::X | Self::Y | Self::B | Self::SB | Self::DX | Self::DY | Self::W | Self::SW
        )
    }

    /// Returns `true` for bit devices; boolean writes to these use bit units.
    pub fn is_bit_device(self) -> bool {
        matches!(
            self,
            Self::M
                | Self::SM
                | Self::L
                | Self::F
                | Self::V
                | Self::X
                | Self::Y
                | Self::B
                | Self::SB
                | Self::DX
                | Self::DY
                | Self::TC
                | Self::TS
                | Self::CC
                | Self::CS
        )
    }
}

impl DeviceCode for Device {
    fn code(self) -> u16 {
        let code: u8 = match self {
            Self::M => 0x90,
            Self::SM => 0x91,
            Self::L => 0x92,
            Self::F => 0x93,
            Self::V => 0x94,
            Self::X => 0x9C,
            Self::Y => 0x9D,
            Self::B => 0xA0,
            Self::SB => 0xA1,
            Self::DX => 0xA2,
            Self::DY => 0xA3,
            Self::D => 0xA8,
            Self::SD => 0xA9,
            Self::R => 0xAF,
            Self::ZR => 0xB0,
            Self::W => 0xB4,
            Self::SW => 0xB5,
            Self::TC => 0xC0,
            Self::TS => 0xC1,
            Self::TN => 0xC2,
            Self::CC => 0xC3,
            Self::CS => 0xC4,
            Self::CN => 0xC5,
            Self::Z => 0xCC,
        };
        u16::from(code)
    }

    fn name(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::SM => "SM",
            Self::L => "L",
            Self::F => "F",
            Self::V => "V",
            Self::X => "X",
            Self::Y => "Y",
            Self::B => "B",
            Self::SB => "SB",
            Self::DX => "DX",
            Self::DY => "DY",
            Self::D => "D",
            Self::SD => "SD",
            Self::R => "R",
            Self::ZR => "ZR",
            Self::W => "W",
            Self::SW => "SW",
            Self::TC => "TC",
            Self::TS => "TS",
            Self::TN => "TN",
            Self::CC => "CC",
            Self::CS => "CS",
            Self::CN => "CN",
            Self::Z => "Z",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
