//! Token validation and session store behavior.

use std::time::Duration;

use referee_server::auth::{unix_now, AuthError, HmacTokenValidator, TokenValidator};
use referee_server::session::{Role, Session, SessionStore};

fn validator() -> HmacTokenValidator {
    HmacTokenValidator::new("test-secret")
}

#[test]
fn minted_token_round_trips() {
    let v = validator();
    let expires = unix_now() + 3600;
    let token = v.mint(42, "premium", expires);

    let claims = v.validate(&token).unwrap();
    assert_eq!(claims.user_id, 42);
    assert_eq!(claims.subscription, "premium");
    assert_eq!(claims.expires_at, expires);
}

#[test]
fn empty_token_is_missing() {
    assert_eq!(validator().validate(""), Err(AuthError::Missing));
}

#[test]
fn tampered_payload_fails_the_signature() {
    let v = validator();
    let token = v.mint(42, "free", unix_now() + 3600);

    // Swap the user id; the digest no longer matches.
    let tampered = token.replacen("42", "43", 1);
    assert_eq!(v.validate(&tampered), Err(AuthError::BadSignature));
}

#[test]
fn token_signed_with_another_secret_is_rejected() {
    let other = HmacTokenValidator::new("other-secret");
    let token = other.mint(42, "free", unix_now() + 3600);
    assert_eq!(validator().validate(&token), Err(AuthError::BadSignature));
}

#[test]
fn expired_token_is_rejected() {
    let v = validator();
    let token = v.mint(42, "free", unix_now() - 1);
    assert_eq!(v.validate(&token), Err(AuthError::Expired));
}

#[test]
fn garbage_tokens_are_malformed() {
    let v = validator();
    assert_eq!(v.validate("no-dots-here"), Err(AuthError::Malformed));

    // Valid signature over a payload that is not claims-shaped.
    let payload = "not.numeric.claims.extra";
    let token = {
        // Re-sign through mint's format by hand: mint only emits valid
        // payloads, so build an arbitrary one via a known-good token's
        // structure instead.
        let good = v.mint(1, "x", unix_now() + 10);
        let (_, sig) = good.rsplit_once('.').unwrap();
        format!("{}.{}", payload, sig)
    };
    // Signature is wrong for this payload, which is caught first.
    assert_eq!(v.validate(&token), Err(AuthError::BadSignature));
}

// ---------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------

fn session() -> Session {
    Session {
        user_id: 42,
        room_id: 7,
        role: Role::Creator,
    }
}

#[test]
fn issued_session_resolves_once_and_rotates() {
    let store = SessionStore::new();
    let id = store.issue(session());

    let (fresh, restored) = store.resolve_and_rotate(&id).unwrap();
    assert_ne!(fresh, id);
    assert_eq!(restored, session());

    // The presented id was consumed.
    assert!(store.resolve_and_rotate(&id).is_none());

    // The rotated id carries the same binding.
    let (_, again) = store.resolve_and_rotate(&fresh).unwrap();
    assert_eq!(again, session());
}

#[test]
fn unknown_session_resolves_to_none() {
    let store = SessionStore::new();
    assert!(store.resolve_and_rotate("never-issued").is_none());
}

#[test]
fn expired_session_is_dropped() {
    let store = SessionStore::with_ttl(Duration::ZERO);
    let id = store.issue(session());

    assert!(store.resolve_and_rotate(&id).is_none());
    // The expired entry is purged on the failed resolve.
    assert!(store.is_empty());
}

#[test]
fn distinct_issues_get_distinct_ids() {
    let store = SessionStore::new();
    let a = store.issue(session());
    let b = store.issue(session());
    assert_ne!(a, b);
    assert_eq!(store.len(), 2);
}
