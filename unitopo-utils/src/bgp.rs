//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Autonomous-system number representations shared by the BGP and
//! network-instance handlers.
//!
//! Some vendor schemas store a 4-octet AS number as two 16-bit fields, the
//! "dot notation" of RFC 5396 (`asdot`), while the normalized model always
//! uses the plain 32-bit value (`asplain`).

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unitopo_yang::{ToYang, TryFromYang};

// 4-octet autonomous-system number.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct AsNumber(pub u32);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AsNumberParseError(pub String);

// ===== impl AsNumber =====

impl AsNumber {
    pub fn from_dot_notation(high: u16, low: u16) -> AsNumber {
        AsNumber(as_from_dot_notation(high, low))
    }

    pub fn to_dot_notation(self) -> (u16, u16) {
        as_to_dot_notation(self.0)
    }

    // Returns whether the number fits in a 2-octet AS field.
    pub fn is_two_octet(self) -> bool {
        self.0 <= u16::MAX as u32
    }

    // RFC 5396 `asdot` representation: `asplain` for 2-octet numbers,
    // `high.low` otherwise.
    pub fn to_asdot(self) -> String {
        if self.is_two_octet() {
            self.0.to_string()
        } else {
            let (high, low) = self.to_dot_notation();
            format!("{high}.{low}")
        }
    }

    // RFC 5396 `asdot+` representation: always `high.low`.
    pub fn to_asdot_plus(self) -> String {
        let (high, low) = self.to_dot_notation();
        format!("{high}.{low}")
    }
}

impl fmt::Display for AsNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AsNumber {
    fn from(value: u32) -> AsNumber {
        AsNumber(value)
    }
}

impl FromStr for AsNumber {
    type Err = AsNumberParseError;

    // Accepts `asplain`, `asdot` and `asdot+` text.
    fn from_str(s: &str) -> Result<AsNumber, AsNumberParseError> {
        let error = || AsNumberParseError(s.to_owned());
        match s.split_once('.') {
            Some((high, low)) => {
                let high = high.parse::<u16>().map_err(|_| error())?;
                let low = low.parse::<u16>().map_err(|_| error())?;
                Ok(AsNumber::from_dot_notation(high, low))
            }
            None => s.parse::<u32>().map(AsNumber).map_err(|_| error()),
        }
    }
}

impl ToYang for AsNumber {
    fn to_yang(&self) -> Cow<'static, str> {
        self.0.to_string().into()
    }
}

impl TryFromYang for AsNumber {
    fn try_from_yang(value: &str) -> Option<AsNumber> {
        value.parse().ok()
    }
}

// ===== impl AsNumberParseError =====

impl fmt::Display for AsNumberParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid AS number: {}", self.0)
    }
}

impl std::error::Error for AsNumberParseError {}

// ===== global functions =====

// Splits a 32-bit AS number into its (high, low) 16-bit halves.
pub fn as_to_dot_notation(asn: u32) -> (u16, u16) {
    ((asn >> 16) as u16, (asn & 0xFFFF) as u16)
}

// Joins (high, low) 16-bit halves into a 32-bit AS number.
pub fn as_from_dot_notation(high: u16, low: u16) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}

// Same as `as_from_dot_notation`, for vendor schemas that omit the high half
// of 2-octet AS numbers.
pub fn as_from_optional_dot_notation(high: Option<u16>, low: u16) -> u32 {
    as_from_dot_notation(high.unwrap_or(0), low)
}
