//! Property-based invariant tests for the user domain service.
//!
//! Verifies:
//! 1. validate_user never rejects a well-formed draft
//! 2. validate_user reports exactly the fields that are broken
//! 3. is_valid_phone ignores whitespace placement
//! 4. format_phone never panics and is idempotent on its own output
//! 5. format_for_display does not alter the source record
//! 6. generate_id output is lowercase base-36 and never repeats in a batch
//! 7. Stored JSON layout survives a serde pass unchanged

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use roster_core::constants::USER_TYPES;
use roster_core::{
    SystemClock, UserDraft, UserId, UserRecord, format_for_display, format_phone, generate_id,
    is_valid_phone, validate_user,
};

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-zÀ-ú]{1,12}( [A-Za-zÀ-ú]{1,12}){0,2}"
}

fn arb_email() -> impl Strategy<Value = String> {
    ("[a-z0-9._+]{1,10}", "[a-z0-9-]{1,10}", "[a-z]{2,4}")
        .prop_map(|(local, host, tld)| format!("{local}@{host}.{tld}"))
}

fn arb_phone() -> impl Strategy<Value = String> {
    (any::<bool>(), "[0-9]{9}").prop_map(|(prefixed, national)| {
        if prefixed {
            format!("+351{national}")
        } else {
            national
        }
    })
}

fn arb_roles() -> impl Strategy<Value = Vec<String>> {
    proptest::sample::subsequence(
        USER_TYPES.iter().map(|t| t.value.to_string()).collect::<Vec<_>>(),
        1..=USER_TYPES.len(),
    )
}

fn arb_draft() -> impl Strategy<Value = UserDraft> {
    (arb_name(), arb_email(), arb_phone(), "[ -~]{0,12}", arb_roles()).prop_map(
        |(name, email, phone, password, user_types)| UserDraft {
            name,
            email,
            phone,
            password,
            user_types,
        },
    )
}

fn arb_record() -> impl Strategy<Value = UserRecord> {
    (
        "[a-z0-9]{1,12}",
        arb_draft(),
        0i64..4_000_000_000,
        proptest::option::of(0i64..4_000_000_000),
    )
        .prop_map(|(id, draft, created, updated)| {
            let created_at = Utc.timestamp_opt(created, 0).single().unwrap_or_default();
            let mut record = UserRecord::from_draft(UserId::new(id), draft, created_at);
            record.updated_at = updated.and_then(|s| Utc.timestamp_opt(s, 0).single());
            record
        })
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Well-formed drafts are accepted
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn well_formed_draft_is_valid(draft in arb_draft()) {
        let result = validate_user(&draft);
        prop_assert!(result.is_valid(), "{:?} rejected: {}", draft, result.errors);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Exactly the broken fields are reported
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn errors_match_broken_fields(
        draft in arb_draft(),
        break_name in any::<bool>(),
        break_email in any::<bool>(),
        break_phone in any::<bool>(),
        break_roles in any::<bool>(),
    ) {
        let mut draft = draft;
        if break_name {
            draft.name = "  ".into();
        }
        if break_email {
            draft.email = draft.email.replace('@', "");
        }
        if break_phone {
            draft.phone.push('1');
        }
        if break_roles {
            draft.user_types.clear();
        }

        let errors = validate_user(&draft).errors;
        prop_assert_eq!(errors.get("name").is_some(), break_name);
        prop_assert_eq!(errors.get("email").is_some(), break_email);
        prop_assert_eq!(errors.get("phone").is_some(), break_phone);
        prop_assert_eq!(errors.get("userTypes").is_some(), break_roles);
        let expected = [break_name, break_email, break_phone, break_roles]
            .iter()
            .filter(|b| **b)
            .count();
        prop_assert_eq!(errors.len(), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Whitespace is ignored by the phone check
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn phone_check_ignores_spaces(
        phone in arb_phone(),
        cuts in proptest::collection::vec(0usize..13, 0..4),
    ) {
        let mut spaced = phone.clone();
        for cut in cuts {
            let at = cut.min(spaced.len());
            spaced.insert(at, ' ');
        }
        prop_assert!(is_valid_phone(&spaced), "{:?}", spaced);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. format_phone is total and stable
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn format_phone_never_panics(input in "\\PC{0,20}") {
        let _ = format_phone(&input);
    }

    #[test]
    fn format_phone_is_idempotent_for_full_numbers(national in "[0-9]{9}") {
        let once = format_phone(&format!("351{national}"));
        let twice = format_phone(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.len(), "+351 XXX XXX XXX".len());
    }

    #[test]
    fn format_phone_passes_through_other_numbers(digits in "[0-24-9][0-9]{8}") {
        prop_assert_eq!(format_phone(&digits), digits);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Display formatting is pure
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn display_formatting_keeps_record(record in arb_record()) {
        let before = record.clone();
        let display = format_for_display(&record);
        prop_assert_eq!(&record, &before);
        prop_assert_eq!(&display.user, &before);
        prop_assert_eq!(display.user_types_display.split(", ").count(), record.user_types.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Generated ids
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn generated_ids_are_base36_and_distinct(count in 2usize..64) {
        let clock = SystemClock;
        let mut seen = HashSet::new();
        for _ in 0..count {
            let id = generate_id(&clock);
            prop_assert!(id
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
            prop_assert!(seen.insert(id));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Stored layout survives serde
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn record_json_is_stable(record in arb_record()) {
        let json = serde_json::to_string(&record).expect("serialize");
        let back: UserRecord = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(&back, &record);
        prop_assert!(json.contains("\"userTypes\""));
    }
}
