use phylosync_core::SearchItemId;

/// FNV-1a; stable across runs and builds, unlike `DefaultHasher`.
pub fn stable_u32(s: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in s.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

pub fn random_search_id() -> SearchItemId {
    SearchItemId(uuid::Uuid::new_v4().simple().to_string())
}
