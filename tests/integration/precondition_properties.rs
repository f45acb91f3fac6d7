//! Property tests for If-Match evaluation.
//!
//! The evaluator is checked directly over generated ETags, and end to end by
//! reading back the header the in-memory registry received.

use crate::common::{device, registry_client};
use hub_registry::resource::etag::ETag;
use hub_registry::{ConcurrencyPolicy, Precondition, Versioned};
use proptest::prelude::*;

fn opaque_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9+/=]{1,32}"
}

/// Any printable text, including stray quotes and the weak prefix.
fn raw_etag_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,24}",
        "(W/)?\"?[A-Za-z0-9\"]{0,12}\"?",
    ]
}

fn policy_strategy() -> impl Strategy<Value = ConcurrencyPolicy> {
    prop_oneof![
        Just(ConcurrencyPolicy::Unconditional),
        Just(ConcurrencyPolicy::IfMatch),
    ]
}

proptest! {
    #[test]
    fn test_if_match_quotes_the_etag(opaque in opaque_strategy()) {
        let etag = ETag::new(&opaque).unwrap();
        let precondition = Precondition::evaluate(ConcurrencyPolicy::IfMatch, Some(&etag));

        prop_assert_eq!(precondition.header_value(), format!("\"{}\"", opaque));
        prop_assert!(!precondition.is_wildcard());
    }

    #[test]
    fn test_unconditional_ignores_the_etag(opaque in proptest::option::of(opaque_strategy())) {
        let etag = opaque.and_then(ETag::new);
        let precondition = Precondition::evaluate(ConcurrencyPolicy::Unconditional, etag.as_ref());

        prop_assert_eq!(precondition.header_value(), "*");
    }

    #[test]
    fn test_header_is_never_empty(
        policy in policy_strategy(),
        opaque in proptest::option::of(opaque_strategy()),
    ) {
        let etag = opaque.and_then(ETag::new);
        let header = Precondition::evaluate(policy, etag.as_ref()).header_value();

        prop_assert!(!header.is_empty());
        prop_assert!(header == "*" || (header.starts_with('"') && header.ends_with('"')));
    }

    #[test]
    fn test_header_is_well_formed_for_any_input(
        policy in policy_strategy(),
        raw in raw_etag_strategy(),
    ) {
        let etag = ETag::new(&raw);
        let header = Precondition::evaluate(policy, etag.as_ref()).header_value();

        if header != "*" {
            let inner = header
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'));
            prop_assert!(inner.is_some(), "unquoted header {:?}", header);
            let inner = inner.unwrap();
            prop_assert!(!inner.is_empty());
            prop_assert!(!inner.contains('"'), "header {:?} from {:?}", header, raw);
            prop_assert!(inner.chars().all(|c| c.is_ascii_graphic()));
        }
    }

    #[test]
    fn test_evaluation_is_idempotent(
        policy in policy_strategy(),
        opaque in proptest::option::of(opaque_strategy()),
    ) {
        let etag = opaque.and_then(ETag::new);
        let first = Precondition::evaluate(policy, etag.as_ref());
        let second = Precondition::evaluate(policy, etag.as_ref());

        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_quoted_and_bare_forms_agree(opaque in opaque_strategy()) {
        let bare = ETag::new(&opaque).unwrap();
        let quoted = ETag::new(format!("\"{}\"", opaque)).unwrap();
        let weak = ETag::new(format!("W/\"{}\"", opaque)).unwrap();

        let expected = Precondition::evaluate(ConcurrencyPolicy::IfMatch, Some(&bare));
        prop_assert_eq!(&expected, &Precondition::evaluate(ConcurrencyPolicy::IfMatch, Some(&quoted)));
        prop_assert_eq!(&expected, &Precondition::evaluate(ConcurrencyPolicy::IfMatch, Some(&weak)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_registry_receives_evaluated_header(policy in policy_strategy(), fetched in any::<bool>()) {
        tokio_test::block_on(async {
            let (client, registry) = registry_client();
            let created = client.devices().create(&device("prop-device")).await.unwrap();
            let snapshot = if fetched { created.clone() } else { device("prop-device") };

            client.devices().update(&snapshot, policy).await.unwrap();

            let expected = Precondition::for_resource(policy, &snapshot).header_value();
            let log = registry.request_log().await;
            let last = log.last().unwrap();
            assert_eq!(last.if_match.as_deref(), Some(expected.as_str()));
            assert_eq!(
                last.if_match.as_deref() == Some("*"),
                policy == ConcurrencyPolicy::Unconditional || snapshot.etag().is_none()
            );
        });
    }
}
