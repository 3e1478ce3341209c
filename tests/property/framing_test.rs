// tests/property/framing_test.rs

//! The stream codec yields the same lines however the bytes arrive.

use bytes::BytesMut;
use proptest::prelude::*;
use sip2gate::core::protocol::{Charset, Sip2Codec};
use tokio_util::codec::{Decoder, Encoder};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_lines_survive_arbitrary_chunking(
        lines in prop::collection::vec("[A-Za-z0-9|^ ]{1,80}", 1..10),
        chunk in 1usize..16,
    ) {
        let mut encoder = Sip2Codec::new('\r', Charset::Ibm850);
        let mut wire = BytesMut::new();
        for line in &lines {
            encoder.encode(line.clone(), &mut wire).unwrap();
        }

        let mut decoder = Sip2Codec::new('\r', Charset::Ibm850);
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(line) = decoder.decode(&mut buf).unwrap() {
                decoded.push(line);
            }
        }

        prop_assert_eq!(decoded, lines);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn test_frames_over_the_limit_are_rejected(len in 33usize..200) {
        let mut decoder = Sip2Codec::new('\r', Charset::Ibm850).with_max_length(32);
        let mut buf = BytesMut::from("9".repeat(len).as_bytes());
        prop_assert!(decoder.decode(&mut buf).is_err());
    }
}
