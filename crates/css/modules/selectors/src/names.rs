//! Short, collision-resistant class names.

use std::time::{SystemTime, UNIX_EPOCH};

/// Width of the epoch part of every token, in letters.
const EPOCH_LETTERS: usize = 4;

/// Mints unique identifiers of the form `<prefix>-<epoch><counter>`.
///
/// The epoch is fixed per generator and spelled with exactly four letters, so tokens
/// always start with a valid identifier character and generators created at
/// different times do not collide. The counter is base-36 and never repeats.
#[derive(Clone, Debug)]
pub struct NameGenerator {
    epoch: u16,
    counter: u64,
}

impl NameGenerator {
    /// Create a generator with a time-derived epoch.
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let epoch = (((now.as_secs() as u32) ^ now.subsec_nanos()) & 0xFFFF) as u16;
        Self::with_epoch(epoch)
    }

    /// Create a generator with a fixed epoch; names become deterministic.
    pub const fn with_epoch(epoch: u16) -> Self {
        Self { epoch, counter: 0 }
    }

    /// Return the epoch baked into every token.
    pub const fn epoch(&self) -> u16 {
        self.epoch
    }

    /// Mint a bare token.
    pub fn next_token(&mut self) -> String {
        let mut token = String::with_capacity(EPOCH_LETTERS + 4);
        push_epoch_letters(self.epoch, &mut token);
        push_base36(self.counter, &mut token);
        self.counter = self.counter.wrapping_add(1);
        token
    }

    /// Mint a token joined to `prefix` with a hyphen; an empty prefix yields the bare token.
    pub fn next_name(&mut self, prefix: &str) -> String {
        let token = self.next_token();
        if prefix.is_empty() {
            token
        } else {
            format!("{prefix}-{token}")
        }
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Spell `epoch` as a fixed-width base-26 string of lowercase letters.
fn push_epoch_letters(epoch: u16, out: &mut String) {
    let mut letters = [b'a'; EPOCH_LETTERS];
    let mut rest = u32::from(epoch);
    for slot in letters.iter_mut().rev() {
        *slot = b'a' + (rest % 26) as u8;
        rest /= 26;
    }
    for letter in letters {
        out.push(char::from(letter));
    }
}

/// Append `value` in lowercase base 36.
fn push_base36(value: u64, out: &mut String) {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = [0u8; 13];
    let mut index = buf.len();
    let mut rest = value;
    loop {
        index -= 1;
        buf[index] = DIGITS[(rest % 36) as usize];
        rest /= 36;
        if rest == 0 {
            break;
        }
    }
    for &digit in &buf[index..] {
        out.push(char::from(digit));
    }
}
