//! Round-trip law over the whole valid tick domain.

use proptest::prelude::*;
use tick_proto::{decode, encode, CodecError, InstrumentType, Side, TickRecord, TICK_SIZE};

fn instrument_type() -> impl Strategy<Value = InstrumentType> {
    prop::sample::select(InstrumentType::ALL.to_vec())
}

fn side() -> impl Strategy<Value = Side> {
    prop::sample::select(Side::ALL.to_vec())
}

prop_compose! {
    // Raw bits cover NaN payloads, infinities, subnormals and signed zero.
    fn tick()(
        id in any::<u32>(),
        kind in instrument_type(),
        side in side(),
        price_bits in any::<u32>(),
        qty_bits in any::<u32>(),
    ) -> TickRecord {
        TickRecord::new(id, kind, side, f32::from_bits(price_bits), f32::from_bits(qty_bits))
    }
}

proptest! {
    #[test]
    fn decode_inverts_encode(record in tick()) {
        let bytes = encode(&record);
        prop_assert_eq!(bytes.len(), TICK_SIZE);

        let back = decode(&bytes).unwrap();
        prop_assert_eq!(back, record);
        prop_assert_eq!(back.price().to_bits(), record.price().to_bits());
        prop_assert_eq!(back.quantity().to_bits(), record.quantity().to_bits());
    }

    #[test]
    fn field_offsets_are_fixed(record in tick()) {
        let bytes = encode(&record);
        prop_assert_eq!(&bytes[0..4], &record.instrument_id().to_le_bytes()[..]);
        prop_assert_eq!(bytes[4], record.instrument_type() as u8);
        prop_assert_eq!(bytes[5], record.side() as u8);
        prop_assert_eq!(&bytes[6..10], &record.price().to_le_bytes()[..]);
        prop_assert_eq!(&bytes[10..14], &record.quantity().to_le_bytes()[..]);
    }

    #[test]
    fn any_other_length_is_malformed(buf in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assume!(buf.len() != TICK_SIZE);
        prop_assert_eq!(decode(&buf), Err(CodecError::MalformedPacket { len: buf.len() }));
    }
}
