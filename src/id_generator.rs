/// Cell identity allocator
/// Hands out strictly increasing identities and renders them as short,
/// case-insensitive tags like "00", "A7", "2K". Tags widen automatically once
/// the two-character namespace is exhausted.

use crate::cell::CellId;

const CHARS: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J',
    'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Minimum tag width
const MIN_LENGTH: usize = 2;

#[derive(Debug, Clone)]
pub struct IdGenerator {
    /// Counter for next ID, never rewound
    counter: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Generate the next identity
    pub fn next(&mut self) -> CellId {
        let id = CellId::from_raw(self.counter);
        self.counter += 1;
        id
    }

    /// Number of identities handed out so far
    pub fn issued(&self) -> u64 {
        self.counter
    }

    /// Encode a number to a base-36 alphanumeric tag
    pub fn encode(mut num: u64) -> String {
        let base = CHARS.len() as u64;
        let mut result = Vec::new();

        while num > 0 || result.len() < MIN_LENGTH {
            let digit = (num % base) as usize;
            result.push(CHARS[digit]);
            num /= base;
        }

        result.reverse();
        result.into_iter().collect()
    }

    /// Decode a tag back to its counter value
    pub fn decode(tag: &str) -> Option<u64> {
        if tag.is_empty() {
            return None;
        }

        let base = CHARS.len() as u64;
        let mut result = 0u64;

        for c in tag.chars() {
            let digit = CHARS.iter().position(|&ch| ch == c.to_ascii_uppercase())?;
            result = result.checked_mul(base)?.checked_add(digit as u64)?;
        }

        Some(result)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
