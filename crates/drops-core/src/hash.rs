//! SHA-256 hashing for commitments, entropy and token identifiers
//!
//! Every digest in the system is produced here so that the algorithm is chosen
//! in exactly one place. Commit digests, epoch entropy, derived item values and
//! token identifiers are all SHA-256 (256-bit / 32-byte output).
//!
//! # Usage
//!
//! ```
//! use drops_core::hash::{hash, hasher};
//!
//! let one_shot = hash(b"5barfoo");
//!
//! let mut h = hasher();
//! h.update(b"5");
//! h.update(b"bar");
//! h.update(b"foo");
//! assert_eq!(h.finalize(), one_shot);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A 32-byte digest. Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// The all-zero digest.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64 character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }

    /// First eight bytes read as a little-endian integer.
    pub fn truncate_u64(&self) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(word)
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Hash32> for String {
    fn from(digest: Hash32) -> Self {
        digest.to_hex()
    }
}

impl TryFrom<String> for Hash32 {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl FromStr for Hash32 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

/// Incremental SHA-256 hasher.
pub struct Hasher(Sha256);

impl Hasher {
    /// Feed more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> Hash32 {
        let mut output = [0u8; 32];
        output.copy_from_slice(&self.0.finalize());
        Hash32(output)
    }
}

/// Hash arbitrary bytes.
pub fn hash(data: &[u8]) -> Hash32 {
    let mut h = hasher();
    h.update(data);
    h.finalize()
}

/// Start an incremental hash.
pub fn hasher() -> Hasher {
    Hasher(Sha256::new())
}
