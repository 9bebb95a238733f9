#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Property checks for `TokenCodec::verify`.
//!
//! 1. Arbitrary bytes and strings never verify and never panic
//! 2. Any non-empty subject round-trips through issue/verify
//! 3. Tampering with any single character of a valid token breaks it

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use proptest::prelude::*;
use token_codec::{ManualClock, TokenCodec, TokenConfig, Verification};

fn codec() -> (TokenCodec, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    ));
    let codec = TokenCodec::with_clock(
        &TokenConfig::new("property-secret", Duration::from_secs(300)),
        clock.clone(),
    )
    .unwrap();
    (codec, clock)
}

proptest! {
    #[test]
    fn arbitrary_bytes_are_malformed(raw in proptest::collection::vec(any::<u8>(), 0..512)) {
        let (codec, _) = codec();
        prop_assert_eq!(codec.verify_bytes(&raw), Verification::Malformed);
    }

    #[test]
    fn arbitrary_strings_are_malformed(input in ".{0,256}") {
        let (codec, _) = codec();
        prop_assert_eq!(codec.verify(&input), Verification::Malformed);
    }

    #[test]
    fn jwt_shaped_garbage_is_malformed(
        header in "[A-Za-z0-9_-]{0,64}",
        payload in "[A-Za-z0-9_-]{0,128}",
        signature in "[A-Za-z0-9_-]{0,64}",
    ) {
        let (codec, _) = codec();
        let token = format!("{header}.{payload}.{signature}");
        prop_assert_eq!(codec.verify(&token), Verification::Malformed);
    }

    #[test]
    fn subjects_round_trip(subject in "[a-zA-Z0-9_-]{1,64}") {
        let (codec, _) = codec();
        let token = codec.issue(&subject).unwrap();

        match codec.verify(&token) {
            Verification::Valid(identity) => prop_assert_eq!(identity.subject(), subject.as_str()),
            other => prop_assert!(false, "expected valid, got {:?}", other),
        }
    }

    #[test]
    fn expired_is_never_valid(extra_secs in 0u64..100_000) {
        let (codec, clock) = codec();
        let token = codec.issue("u-42").unwrap();

        clock.advance(Duration::from_secs(300 + extra_secs));
        prop_assert_eq!(codec.verify(&token), Verification::Expired);
    }

    #[test]
    fn single_character_tamper_breaks_token(index in any::<prop::sample::Index>()) {
        let (codec, _) = codec();
        let token = codec.issue("u-42").unwrap();

        let mut bytes = token.into_bytes();
        let at = index.index(bytes.len());
        bytes[at] = if bytes[at] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert!(!codec.verify(&tampered).is_valid());
    }
}

#[test]
fn repeated_verification_yields_the_same_identity() {
    let (codec, _) = codec();
    let token = codec.issue("u-42").unwrap();

    let first = codec.verify(&token);
    let second = codec.verify(&token);

    assert!(first.is_valid());
    assert_eq!(first, second);
}
