use std::fmt::{self, Write};

pub const SHA1_LEN: usize = 20;

/// SHA-1 digest of a certificate, rendered as `AA:BB:...` uppercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_digest(digest: &[u8; SHA1_LEN]) -> Self {
        let mut out = String::with_capacity(SHA1_LEN * 3 - 1);
        for (i, byte) in digest.iter().enumerate() {
            if i > 0 { out.push(':'); }
            let _ = write!(&mut out, "{:02X}", byte);
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
