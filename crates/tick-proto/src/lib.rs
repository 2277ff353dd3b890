//! Fixed 14-byte market-data tick wire format.
//!
//! Every tick travels as the entire payload of one UDP datagram, laid out
//! little-endian with no padding and no framing:
//!
//! ```text
//! offset  size  field
//!      0     4  instrument_id    u32
//!      4     1  instrument_type  u8  (0=underlying, 1=option, 2=future)
//!      5     1  side             u8  (0=buy, 1=sell)
//!      6     4  price            f32
//!     10     4  quantity         f32
//! ```
//!
//! This crate is the only place that knows the layout.

#![no_std]

pub mod codec;
pub mod messages;

pub use codec::*;
pub use messages::*;
