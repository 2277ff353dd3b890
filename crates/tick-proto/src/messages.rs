//! Tick record and its packed wire representation.

use bytemuck::{Pod, Zeroable};
use core::mem::size_of;

use crate::codec::CodecError;

/// Size of one encoded tick in bytes.
pub const TICK_SIZE: usize = 14;

/// Kind of instrument a tick refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstrumentType {
    Underlying = 0,
    Option = 1,
    Future = 2,
}

impl InstrumentType {
    /// Every variant, in wire-value order.
    pub const ALL: [Self; 3] = [Self::Underlying, Self::Option, Self::Future];

    #[inline(always)]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Underlying => "underlying",
            Self::Option => "option",
            Self::Future => "future",
        }
    }
}

impl TryFrom<u8> for InstrumentType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Self::Underlying),
            1 => Ok(Self::Option),
            2 => Ok(Self::Future),
            other => Err(CodecError::InvalidInstrumentType(other)),
        }
    }
}

/// Side of the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Bid side (buyers).
    Buy = 0,
    /// Ask side (sellers).
    Sell = 1,
}

impl Side {
    /// Every variant, in wire-value order.
    pub const ALL: [Self; 2] = [Self::Buy, Self::Sell];

    #[inline(always)]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(Side::Buy),
            1 => Ok(Side::Sell),
            other => Err(CodecError::InvalidSide(other)),
        }
    }
}

/// One simulated market update.
///
/// Immutable once built. Price and quantity carry no economic constraint:
/// any `f32` is accepted, and equality compares their bit patterns so that
/// a decoded record equals the one that was encoded even for NaN payloads.
#[derive(Clone, Copy, Debug)]
pub struct TickRecord {
    instrument_id: u32,
    instrument_type: InstrumentType,
    side: Side,
    price: f32,
    quantity: f32,
}

impl TickRecord {
    pub const fn new(
        instrument_id: u32,
        instrument_type: InstrumentType,
        side: Side,
        price: f32,
        quantity: f32,
    ) -> Self {
        Self {
            instrument_id,
            instrument_type,
            side,
            price,
            quantity,
        }
    }

    #[inline(always)]
    pub const fn instrument_id(&self) -> u32 {
        self.instrument_id
    }

    #[inline(always)]
    pub const fn instrument_type(&self) -> InstrumentType {
        self.instrument_type
    }

    #[inline(always)]
    pub const fn side(&self) -> Side {
        self.side
    }

    #[inline(always)]
    pub const fn price(&self) -> f32 {
        self.price
    }

    #[inline(always)]
    pub const fn quantity(&self) -> f32 {
        self.quantity
    }
}

impl PartialEq for TickRecord {
    fn eq(&self, other: &Self) -> bool {
        self.instrument_id == other.instrument_id
            && self.instrument_type == other.instrument_type
            && self.side == other.side
            && self.price.to_bits() == other.price.to_bits()
            && self.quantity.to_bits() == other.quantity.to_bits()
    }
}

impl Eq for TickRecord {}

/// Packed on-the-wire tick (14 bytes).
///
/// Multi-byte fields hold little-endian values regardless of host order;
/// floats are stored as their raw IEEE-754 bits.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct TickWire {
    pub instrument_id: u32,     // 4 bytes
    pub instrument_type: u8,    // 1 byte
    pub side: u8,               // 1 byte
    pub price_bits: u32,        // 4 bytes
    pub quantity_bits: u32,     // 4 bytes
}

const _: () = assert!(size_of::<TickWire>() == TICK_SIZE);

// SAFETY: TickWire is packed plain-old-data with no padding
unsafe impl Pod for TickWire {}
unsafe impl Zeroable for TickWire {}

impl TickWire {
    /// Lay a record out in wire order.
    #[inline(always)]
    pub fn from_record(record: &TickRecord) -> Self {
        Self {
            instrument_id: record.instrument_id.to_le(),
            instrument_type: record.instrument_type.as_u8(),
            side: record.side.as_u8(),
            price_bits: record.price.to_bits().to_le(),
            quantity_bits: record.quantity.to_bits().to_le(),
        }
    }

    /// Lift a wire tick back into a record, validating the enum bytes.
    #[inline]
    pub fn to_record(&self) -> Result<TickRecord, CodecError> {
        // Copy out of the packed struct before use
        let instrument_id = u32::from_le(self.instrument_id);
        let instrument_type = InstrumentType::try_from(self.instrument_type)?;
        let side = Side::try_from(self.side)?;
        let price = f32::from_bits(u32::from_le(self.price_bits));
        let quantity = f32::from_bits(u32::from_le(self.quantity_bits));

        Ok(TickRecord::new(instrument_id, instrument_type, side, price, quantity))
    }
}
