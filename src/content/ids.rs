use super::model::Collection;
use chrono::Utc;
use uuid::Uuid;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), random_suffix())
}

/// Generates ids until one is free in `taken`.
pub fn fresh_id<T>(prefix: &str, taken: &Collection<T>) -> String {
    loop {
        let id = generate_id(prefix);
        if !taken.contains_key(&id) {
            return id;
        }
    }
}

fn random_suffix() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        out.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    out
}
