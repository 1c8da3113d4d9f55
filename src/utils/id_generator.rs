use rand::{rng, Rng};

/// Symbols a short code may contain
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default short code length
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Produces candidate short codes.
///
/// Candidates carry no uniqueness guarantee; the allocator checks them
/// against the store.
#[cfg_attr(test, mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws every symbol independently and uniformly from [`ALPHABET`].
///
/// Codes do not depend on the URL being shortened: shortening the same URL
/// twice yields two unrelated codes.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        generate_short_id(self.length)
    }
}

/// Generates a random short ID of `length` symbols.
///
/// `rand::rng()` is a ChaCha-based CSPRNG seeded from the operating system.
pub fn generate_short_id(length: usize) -> String {
    let mut rng = rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
