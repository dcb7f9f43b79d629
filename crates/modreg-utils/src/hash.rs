use std::{fmt, fs, path::Path, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{HashError, HashResult};

/// Hash algorithm named by the tag of an integrity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Length of the raw digest in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Algorithm::Sha256 => 32,
            Algorithm::Sha384 => 48,
            Algorithm::Sha512 => 64,
        }
    }

    fn hash(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => Sha256::digest(bytes).to_vec(),
            Algorithm::Sha384 => Sha384::digest(bytes).to_vec(),
            Algorithm::Sha512 => Sha512::digest(bytes).to_vec(),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Algorithm::Sha256),
            "sha384" => Ok(Algorithm::Sha384),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(format!("unsupported algorithm `{other}`")),
        }
    }
}

/// A content-integrity record: an algorithm tag plus the digest of the exact
/// bytes it pins, rendered as `<algorithm>-<standard padded base64>`.
///
/// Records produced by this crate always use SHA-256. Other SHA-2 variants
/// are accepted when parsing so existing registry documents can be read.
///
/// # Example
///
/// ```
/// use modreg_utils::hash::Integrity;
///
/// let integrity = Integrity::sha256(b"hello world\n");
/// assert_eq!(
///     integrity.to_string(),
///     "sha256-qUiQTy8PR5uPgZdpSzAYSw0u0cHNKh7A+4XSmaGSpEc="
/// );
/// assert!(integrity.matches(b"hello world\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Integrity {
    algorithm: Algorithm,
    digest: Vec<u8>,
}

impl Integrity {
    /// Computes the SHA-256 integrity record of `bytes`.
    pub fn sha256(bytes: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::Sha256,
            digest: Algorithm::Sha256.hash(bytes),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn digest_bytes(&self) -> &[u8] {
        &self.digest
    }

    /// Base64 portion of the record, without the algorithm tag.
    pub fn digest_base64(&self) -> String {
        STANDARD.encode(&self.digest)
    }

    /// Returns `true` if `bytes` hash to this record under its own algorithm.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.algorithm.hash(bytes) == self.digest
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm.as_str(), self.digest_base64())
    }
}

impl FromStr for Integrity {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| {
            HashError::InvalidIntegrity {
                input: s.to_string(),
                reason,
            }
        };

        let (tag, encoded) = s
            .split_once('-')
            .ok_or_else(|| invalid("missing `-` separator".to_string()))?;
        let algorithm = tag.parse::<Algorithm>().map_err(invalid)?;
        let digest = STANDARD
            .decode(encoded)
            .map_err(|err| invalid(format!("bad base64: {err}")))?;

        if digest.len() != algorithm.digest_len() {
            return Err(invalid(format!(
                "expected {} digest bytes, got {}",
                algorithm.digest_len(),
                digest.len()
            )));
        }

        Ok(Self { algorithm, digest })
    }
}

impl Serialize for Integrity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Integrity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Computes the integrity string of `bytes`: `sha256-<base64>`.
pub fn digest(bytes: &[u8]) -> String {
    Integrity::sha256(bytes).to_string()
}

/// Reads a file and computes its SHA-256 integrity record.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be read.
///
/// # Example
///
/// ```no_run
/// use modreg_utils::error::HashResult;
/// use modreg_utils::hash::file_integrity;
///
/// fn main() -> HashResult<()> {
///     let integrity = file_integrity("patches/fix.patch")?;
///     println!("{integrity}");
///     Ok(())
/// }
/// ```
pub fn file_integrity<P: AsRef<Path>>(file_path: P) -> HashResult<Integrity> {
    let file_path = file_path.as_ref();
    let bytes = fs::read(file_path).map_err(|err| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    })?;
    Ok(Integrity::sha256(&bytes))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_digest_known_values() {
        assert_eq!(
            digest(b"hello world\n"),
            "sha256-qUiQTy8PR5uPgZdpSzAYSw0u0cHNKh7A+4XSmaGSpEc="
        );
        assert_eq!(
            digest(b""),
            "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_digest_is_deterministic() {
        let data = b"module(name = \"x\")";
        assert_eq!(digest(data), digest(data));
    }

    #[test]
    fn test_digest_detects_single_byte_change() {
        let original = b"bazel_dep(name = \"y\", version = \"2.0\")".to_vec();
        let expected = digest(&original);
        for i in 0..original.len() {
            let mut mutated = original.clone();
            mutated[i] ^= 0x01;
            assert_ne!(digest(&mutated), expected, "byte {i}");
        }
    }

    #[test]
    fn test_parse_roundtrip_and_matches() {
        let text = "sha256-qUiQTy8PR5uPgZdpSzAYSw0u0cHNKh7A+4XSmaGSpEc=";
        let integrity: Integrity = text.parse().unwrap();
        assert_eq!(integrity.algorithm(), Algorithm::Sha256);
        assert_eq!(integrity.to_string(), text);
        assert!(integrity.matches(b"hello world\n"));
        assert!(!integrity.matches(b"hello world"));
    }

    #[test]
    fn test_parse_sha512() {
        let text = "sha512-2zl0qX8kB7fK4a5jfAAwaHoRkTJ01XhJJVjjnBbAF96E6s3Ixi/jTuThK0sUKIF/Cbaidgw/imZM6ulNJDSlkw==";
        let integrity: Integrity = text.parse().unwrap();
        assert_eq!(integrity.algorithm(), Algorithm::Sha512);
        assert!(integrity.matches(b"hello world\n"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("qUiQTy8PR5uPgZdpSzAYSw0u0cHNKh7A".parse::<Integrity>().is_err());
        assert!("md5-qUiQTy8PR5uPgZdpSzAYSw==".parse::<Integrity>().is_err());
        assert!("sha256-not*base64".parse::<Integrity>().is_err());
        assert!("sha256-qUiQTy8PR5uPgZdpSzAYSw==".parse::<Integrity>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let integrity = Integrity::sha256(b"");
        let json = serde_json::to_string(&integrity).unwrap();
        assert_eq!(json, "\"sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=\"");
        let back: Integrity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, integrity);
        assert!(serde_json::from_str::<Integrity>("\"nope\"").is_err());
    }

    #[test]
    fn test_file_integrity() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world\n").unwrap();

        let integrity = file_integrity(file.path()).unwrap();
        assert_eq!(
            integrity.to_string(),
            "sha256-qUiQTy8PR5uPgZdpSzAYSw0u0cHNKh7A+4XSmaGSpEc="
        );
    }

    #[test]
    fn test_file_integrity_not_found() {
        let result = file_integrity("/path/to/nonexistent/file");
        assert!(matches!(result, Err(HashError::ReadFailed { .. })));
    }

    #[test]
    fn test_file_integrity_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_integrity(dir.path()).is_err());
    }
}
