use getrandom::getrandom;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_WIDTH: usize = 4;

static UNIT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Allocates a process-unique id. The counter guarantees uniqueness; the
    /// random suffix keeps ids from separate runs apart in the log.
    pub fn generate() -> Self {
        let sequence = UNIT_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0_u8; 4];
        let sample = match getrandom(&mut bytes) {
            Ok(()) => u32::from_le_bytes(bytes),
            Err(_) => 0,
        };
        Self(format!(
            "unit-{}-{}",
            base36_encode_u64(sequence),
            base36_encode_fixed(sample, SUFFIX_WIDTH)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

fn base36_encode_u64(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while value > 0 {
        chars.push(BASE36_ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    chars.iter().rev().collect()
}

fn base36_encode_fixed(mut value: u32, width: usize) -> String {
    let mut chars = vec!['0'; width];
    for slot in chars.iter_mut().rev() {
        *slot = BASE36_ALPHABET[(value % 36) as usize] as char;
        value /= 36;
    }
    chars.into_iter().collect()
}
