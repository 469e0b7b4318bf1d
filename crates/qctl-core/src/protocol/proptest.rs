//! Property-based tests for the protocol layer.
//!
//! These tests use proptest to verify:
//! - Command code fields survive packing
//! - Codec never panics on arbitrary input
//! - Length prefix correctness

#![cfg(test)]

use bytes::BytesMut;
use proptest::prelude::*;

use crate::constants::FRAME_HEADER_LEN;
use crate::protocol::{Access, Codec, CommandCode, Direction, Request, UserRegion};

fn arb_access() -> impl Strategy<Value = Access> {
    prop_oneof![
        Just(Access::ReadOnly),
        Just(Access::WriteOnly),
        Just(Access::ReadWrite),
    ]
}

prop_compose! {
    fn arb_region()(
        data in proptest::collection::vec(any::<u8>(), 0..128),
        access in arb_access(),
    ) -> UserRegion {
        UserRegion::new(data, access)
    }
}

prop_compose! {
    fn arb_request()(
        request_id in any::<u32>(),
        command in any::<u32>(),
        arg in any::<i64>(),
        region in proptest::option::of(arb_region()),
        thread_id in proptest::option::of(any::<i32>()),
    ) -> Request {
        Request { request_id, command, arg, region, thread_id }
    }
}

proptest! {
    #[test]
    fn command_code_fields_survive_packing(
        dir in 0u8..4,
        magic in any::<u8>(),
        nr in any::<u8>(),
        size in 0u16..(1 << 14),
    ) {
        let code = CommandCode::new(Direction::from_bits(dir), magic, nr, size);
        prop_assert_eq!(code.direction().bits(), dir);
        prop_assert_eq!(code.magic(), magic);
        prop_assert_eq!(code.nr(), nr);
        prop_assert_eq!(code.size(), size as usize);
    }

    #[test]
    fn length_prefix_matches_payload(req in arb_request()) {
        let encoded = Codec::encode(&req).unwrap();
        let len = u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
        prop_assert_eq!(len + FRAME_HEADER_LEN, encoded.len());
        let decoded: Request = Codec::decode_slice(&encoded).unwrap().unwrap();
        prop_assert_eq!(decoded, req);
    }

    #[test]
    fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut buf = BytesMut::from(&data[..]);
        let _ = Codec::decode::<Request>(&mut buf);
    }
}
