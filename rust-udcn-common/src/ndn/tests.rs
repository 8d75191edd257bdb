//! Unit tests for the NDN packet implementation

use super::super::*;

#[test]
fn name_from_string_splits_on_slash() {
    let name = Name::from_string("/a/b/c");
    assert_eq!(name.len(), 3);
    assert_eq!(name.get(0).unwrap().to_string(), "a");
    assert_eq!(name.get(2).unwrap().to_string(), "c");
}

#[test]
fn name_from_string_ignores_empty_components() {
    let name = Name::from_string("/a//b/");
    assert_eq!(name.len(), 2);
}

#[test]
fn name_display_roundtrips_simple_names() {
    let name = Name::from_string("/ndn/udcn/test");
    assert_eq!(name.to_string(), "/ndn/udcn/test");
}

#[test]
fn name_is_prefix_of() {
    let prefix = Name::from_string("/a/b");
    let full = Name::from_string("/a/b/c");
    assert!(prefix.is_prefix_of(&full));
    assert!(!full.is_prefix_of(&prefix));
    assert!(prefix.is_prefix_of(&prefix));
}

#[test]
fn name_prefix_dropping_last() {
    let name = Name::from_string("/a/b/c");
    assert_eq!(name.prefix_dropping_last(1), Name::from_string("/a/b"));
    assert_eq!(name.prefix_dropping_last(3), Name::new());
    assert_eq!(name.prefix_dropping_last(10), Name::new());
}

#[test]
fn name_tlv_roundtrip() {
    let name = Name::from_string("/a/bb/ccc");
    let tlv = name.to_tlv().unwrap();
    let decoded = Name::from_tlv(&tlv).unwrap();
    assert_eq!(name, decoded);
}

#[test]
fn interest_new_sets_defaults() {
    let interest = Interest::new(Name::from_string("/a/b"));
    assert!(!interest.can_be_prefix);
    assert!(interest.must_be_fresh);
    assert_eq!(interest.lifetime_ms, 4000);
    assert!(interest.forwarding_hint.is_none());
    assert!(interest.pit_token.is_none());
}

#[test]
fn interest_builder_methods_chain() {
    let interest = Interest::new(Name::from_string("/a/b"))
        .with_lifetime(1000)
        .with_can_be_prefix(true)
        .with_must_be_fresh(false)
        .with_nonce(42);
    assert_eq!(interest.lifetime_ms, 1000);
    assert!(interest.can_be_prefix);
    assert!(!interest.must_be_fresh);
    assert_eq!(interest.nonce, 42);
}

#[test]
fn interest_matches_pit_key_ignores_nonce_and_lifetime() {
    let a = Interest::new(Name::from_string("/a/b"))
        .with_nonce(1)
        .with_lifetime(1000);
    let b = Interest::new(Name::from_string("/a/b"))
        .with_nonce(2)
        .with_lifetime(5000);
    assert!(a.matches_pit_key(&b));
}

#[test]
fn interest_matches_pit_key_distinguishes_selectors() {
    let a = Interest::new(Name::from_string("/a/b")).with_can_be_prefix(true);
    let b = Interest::new(Name::from_string("/a/b")).with_can_be_prefix(false);
    assert!(!a.matches_pit_key(&b));
}

#[test]
fn interest_matches_pit_key_distinguishes_forwarding_hint() {
    let a = Interest::new(Name::from_string("/a/b"));
    let b = Interest::new(Name::from_string("/a/b"))
        .with_forwarding_hint(Name::from_string("/hint"));
    assert!(!a.matches_pit_key(&b));
}

#[test]
fn interest_fib_lookup_name_prefers_forwarding_hint() {
    let hint = Name::from_string("/hint");
    let interest = Interest::new(Name::from_string("/a/b")).with_forwarding_hint(hint.clone());
    assert_eq!(interest.fib_lookup_name(), &hint);

    let plain = Interest::new(Name::from_string("/a/b"));
    assert_eq!(plain.fib_lookup_name(), &plain.name);
}

#[test]
fn interest_is_satisfied_by_exact_name() {
    let interest = Interest::new(Name::from_string("/a/b")).with_must_be_fresh(false);
    let data = Data::new(Name::from_string("/a/b"), Bytes::from_static(b"payload"));
    assert!(interest.is_satisfied_by(&data));

    let other = Data::new(Name::from_string("/a/c"), Bytes::from_static(b"payload"));
    assert!(!interest.is_satisfied_by(&other));
}

#[test]
fn interest_is_satisfied_by_prefix_when_can_be_prefix() {
    let interest = Interest::new(Name::from_string("/a"))
        .with_can_be_prefix(true)
        .with_must_be_fresh(false);
    let data = Data::new(Name::from_string("/a/b"), Bytes::from_static(b"payload"));
    assert!(interest.is_satisfied_by(&data));

    let not_prefix = Interest::new(Name::from_string("/a")).with_must_be_fresh(false);
    assert!(!not_prefix.is_satisfied_by(&data));
}

#[test]
fn interest_must_be_fresh_rejects_expired_data() {
    let interest = Interest::new(Name::from_string("/a/b")).with_must_be_fresh(true);
    let data = Data::new(Name::from_string("/a/b"), Bytes::from_static(b"x")).with_ttl(0);
    std::thread::sleep(Duration::from_millis(5));
    assert!(data.is_expired());
    assert!(!interest.is_satisfied_by(&data));
}

#[test]
fn data_new_is_not_expired_immediately() {
    let data = Data::new(Name::from_string("/a/b"), Bytes::from_static(b"payload"));
    assert!(!data.is_expired());
}

#[test]
fn data_with_ttl_zero_expires_quickly() {
    let data = Data::new(Name::from_string("/a/b"), Bytes::from_static(b"payload")).with_ttl(0);
    std::thread::sleep(Duration::from_millis(5));
    assert!(data.is_expired());
}

#[test]
fn data_pit_token_roundtrip_via_builder() {
    let data = Data::new(Name::from_string("/a/b"), Bytes::from_static(b"x"))
        .with_pit_token(Bytes::from_static(b"tok"));
    assert_eq!(data.pit_token, Some(Bytes::from_static(b"tok")));
}

#[test]
fn nack_reason_lattice_ordering() {
    assert!(NackReason::NoRoute.is_less_severe_than(NackReason::Duplicate));
    assert!(NackReason::Duplicate.is_less_severe_than(NackReason::Congestion));
    assert!(!NackReason::Congestion.is_less_severe_than(NackReason::NoRoute));
}

#[test]
fn nack_reason_combine_keeps_more_severe() {
    assert_eq!(
        NackReason::NoRoute.combine(NackReason::Congestion),
        NackReason::Congestion
    );
    assert_eq!(
        NackReason::Duplicate.combine(NackReason::NoRoute),
        NackReason::Duplicate
    );
}

#[test]
fn exclude_default_is_empty() {
    let exclude = Exclude::new();
    assert!(exclude.is_empty());
}

#[test]
fn selectors_default_is_empty() {
    let selectors = Selectors::new();
    assert!(selectors.is_empty());
}

#[test]
fn tlv_roundtrip_for_name_components() {
    let component = NameComponent::from("hello");
    let tlv = component.to_tlv();
    let decoded = NameComponent::from_tlv(&tlv).unwrap();
    assert_eq!(component, decoded);
}
