// crates.io
use time::{PrimitiveDateTime, macros};
// self
use token_broker::{
	_preludet::*,
	auth::TokenSecret,
	store::{CacheWrite, StoreKey, TokenStore},
};

const ISSUED: OffsetDateTime = macros::datetime!(2025-11-10 12:00 UTC);

fn key(program: &str, scope: &str) -> StoreKey {
	StoreKey::from_raw(program, scope)
}

fn put(store: &mut TokenStore, key: &StoreKey, token: &str, ttl_secs: i64) -> CacheWrite {
	store.put(key, TokenSecret::new(token), Some(Duration::seconds(ttl_secs)), ISSUED)
}

#[test]
fn lifetime_just_above_the_margin_expires_after_one_second() {
	let mut store = TokenStore::new(Duration::seconds(30));
	let key = key("encentivize", "");
	let write = put(&mut store, &key, "brief", 31);

	assert_eq!(write, CacheWrite::Stored { expires_at: ISSUED + Duration::seconds(1) });

	let cached = store.lookup_at(&key, ISSUED).expect("Entry should be valid at issuance.");

	assert_eq!(cached.access_token.expose(), "brief");
	assert!(store.lookup_at(&key, ISSUED + Duration::milliseconds(999)).is_some());
	assert!(store.lookup_at(&key, ISSUED + Duration::seconds(1)).is_none());
	assert_eq!(store.len(), 1, "Expired entries linger until purged.");
}

#[test]
fn lifetimes_at_or_below_the_margin_are_not_stored() {
	let mut store = TokenStore::new(Duration::seconds(30));
	let key = key("encentivize", "");

	assert_eq!(put(&mut store, &key, "exact", 30), CacheWrite::NotCacheable);
	assert_eq!(put(&mut store, &key, "short", 5), CacheWrite::NotCacheable);
	assert_eq!(
		store.put(&key, TokenSecret::new("forever"), None, ISSUED),
		CacheWrite::NotCacheable
	);
	assert!(store.is_empty());
}

#[test]
fn lifetimes_beyond_the_calendar_never_expire() {
	let mut store = TokenStore::default();
	let key = key("encentivize", "");
	let far_future = PrimitiveDateTime::MAX.assume_utc();

	assert_eq!(
		put(&mut store, &key, "ageless", 1_000_000_000_000),
		CacheWrite::Stored { expires_at: far_future }
	);
	assert_eq!(
		store.put(&key, TokenSecret::new("ageless"), Some(Duration::MAX), ISSUED),
		CacheWrite::Stored { expires_at: far_future }
	);
	assert!(store.lookup_at(&key, macros::datetime!(9000-01-01 0:00 UTC)).is_some());
	assert_eq!(store.purge_expired_at(ISSUED + Duration::days(365 * 1000)), 0);
}

#[test]
fn put_replaces_existing_entries() {
	let mut store = TokenStore::default();
	let key = key("encentivize", "read");

	assert!(put(&mut store, &key, "old", 600).is_stored());
	assert!(put(&mut store, &key, "new", 600).is_stored());
	assert_eq!(store.len(), 1);
	assert_eq!(
		store.lookup_at(&key, ISSUED).expect("Replaced entry should be present.").access_token,
		TokenSecret::new("new")
	);
}

#[test]
fn scope_keys_partition_a_program() {
	let mut store = TokenStore::default();

	put(&mut store, &key("encentivize", "write read"), "rw", 600);

	assert!(store.lookup_at(&key("Encentivize", "READ WRITE"), ISSUED).is_some());
	assert!(store.lookup_at(&key("encentivize", "read"), ISSUED).is_none());
	assert!(store.lookup_at(&key("rewards", "read write"), ISSUED).is_none());
}

#[test]
fn clear_program_leaves_other_programs() {
	let mut store = TokenStore::default();

	put(&mut store, &key("encentivize", ""), "a", 600);
	put(&mut store, &key("encentivize", "read"), "b", 600);
	put(&mut store, &key("rewards", ""), "c", 600);

	assert_eq!(store.clear_program("  ENCENTIVIZE "), 2);
	assert_eq!(store.clear_program("unknown"), 0);
	assert!(store.lookup_at(&key("encentivize", ""), ISSUED).is_none());
	assert!(store.lookup_at(&key("rewards", ""), ISSUED).is_some());

	store.clear_all();

	assert!(store.is_empty());
}

#[test]
fn purge_drops_only_expired_entries() {
	let mut store = TokenStore::new(Duration::ZERO);

	put(&mut store, &key("encentivize", ""), "short", 10);
	put(&mut store, &key("encentivize", "read"), "long", 600);
	put(&mut store, &key("rewards", ""), "short", 10);

	assert_eq!(store.purge_expired_at(ISSUED + Duration::seconds(10)), 2);
	assert_eq!(store.len(), 1);
	assert!(store.lookup_at(&key("encentivize", "read"), ISSUED).is_some());
}
