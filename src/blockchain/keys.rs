//! Key material for both signature algorithms the ledger accepts.
//!
//! Private keys arrive as loosely formatted strings (raw hex, `0x` hex, DER). The
//! string alone does not say which curve it belongs to, so parsing always takes
//! the algorithm as an input rather than guessing it.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::pkcs8::DecodePrivateKey as _;
use ed25519_dalek::{Signer as _, Verifier as _};
use ethers_core::utils::keccak256;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, Secret};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::blockchain::models::{KeyAlgorithm, LedgerError, LedgerResult};

const ED25519_PRIVATE_DER_PREFIX: &str = "302e020100300506032b657004220420";
const ECDSA_PRIVATE_DER_PREFIX: &str = "3030020100300706052b8104000a04220420";
const ED25519_PUBLIC_DER_PREFIX: &str = "302a300506032b6570032100";
const ECDSA_PUBLIC_DER_PREFIX: &str = "302d300706052b8104000a032200";

/// A public key as recorded on the ledger. ECDSA keys are kept SEC1-compressed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PublicKey {
    Ed25519([u8; 32]),
    EcdsaSecp256k1([u8; 33]),
}

impl PublicKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Ed25519(_) => KeyAlgorithm::Ed25519,
            PublicKey::EcdsaSecp256k1(_) => KeyAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn to_bytes_raw(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(bytes) => bytes.to_vec(),
            PublicKey::EcdsaSecp256k1(bytes) => bytes.to_vec(),
        }
    }

    pub fn to_string_raw(&self) -> String {
        hex::encode(self.to_bytes_raw())
    }

    pub fn to_string_der(&self) -> String {
        match self {
            PublicKey::Ed25519(bytes) => format!("{}{}", ED25519_PUBLIC_DER_PREFIX, hex::encode(bytes)),
            PublicKey::EcdsaSecp256k1(bytes) => {
                format!("{}{}", ECDSA_PUBLIC_DER_PREFIX, hex::encode(bytes))
            }
        }
    }

    /// Builds a key from raw bytes of a known algorithm, validating the curve point.
    pub fn from_raw(algorithm: KeyAlgorithm, bytes: &[u8]) -> Result<Self, String> {
        match algorithm {
            KeyAlgorithm::Ed25519 => {
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| format!("ED25519 public key must be 32 bytes, got {}", bytes.len()))?;
                ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(|e| e.to_string())?;
                Ok(PublicKey::Ed25519(bytes))
            }
            KeyAlgorithm::EcdsaSecp256k1 => {
                let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes).map_err(|e| e.to_string())?;
                let point = key.to_encoded_point(true);
                let mut compressed = [0u8; 33];
                compressed.copy_from_slice(point.as_bytes());
                Ok(PublicKey::EcdsaSecp256k1(compressed))
            }
        }
    }

    /// Parses the `key` field of a mirror node account, interpreted with its `_type`.
    pub fn from_mirror(algorithm: KeyAlgorithm, key_hex: &str) -> LedgerResult<Self> {
        let bytes = decode_hex(key_hex).map_err(LedgerError::Resolution)?;
        let prefix = match algorithm {
            KeyAlgorithm::Ed25519 => ED25519_PUBLIC_DER_PREFIX,
            KeyAlgorithm::EcdsaSecp256k1 => ECDSA_PUBLIC_DER_PREFIX,
        };
        let raw = strip_der_prefix(&bytes, prefix).unwrap_or(&bytes);
        Self::from_raw(algorithm, raw)
            .map_err(|e| LedgerError::Resolution(format!("Invalid {} public key on mirror node: {}", algorithm, e)))
    }

    /// Address derived from an ECDSA key. ED25519 keys have no derived EVM address.
    pub fn to_evm_address(&self) -> Option<String> {
        match self {
            PublicKey::Ed25519(_) => None,
            PublicKey::EcdsaSecp256k1(bytes) => {
                let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes).ok()?;
                let uncompressed = key.to_encoded_point(false);
                let hash = keccak256(&uncompressed.as_bytes()[1..]);
                Some(format!("0x{}", hex::encode(&hash[12..])))
            }
        }
    }

    /// Checks a signature produced by [`KeyMaterial::sign`] over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Ed25519(bytes) => {
                let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(bytes) else {
                    return false;
                };
                let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                    return false;
                };
                key.verify(message, &signature).is_ok()
            }
            PublicKey::EcdsaSecp256k1(bytes) => {
                let Ok(key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes) else {
                    return false;
                };
                let Ok(signature) = k256::ecdsa::Signature::from_slice(signature) else {
                    return false;
                };
                key.verify_prehash(&keccak256(message), &signature).is_ok()
            }
        }
    }
}

impl FromStr for PublicKey {
    type Err = LedgerError;

    /// Accepts DER for either algorithm, raw 32-byte ED25519, or raw SEC1 secp256k1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| LedgerError::Validation(format!("Invalid public key '{}': {}", s, reason));
        let bytes = decode_hex(s).map_err(invalid)?;

        let parsed = if let Some(raw) = strip_der_prefix(&bytes, ED25519_PUBLIC_DER_PREFIX) {
            Self::from_raw(KeyAlgorithm::Ed25519, raw)
        } else if let Some(raw) = strip_der_prefix(&bytes, ECDSA_PUBLIC_DER_PREFIX) {
            Self::from_raw(KeyAlgorithm::EcdsaSecp256k1, raw)
        } else {
            match bytes.len() {
                32 => Self::from_raw(KeyAlgorithm::Ed25519, &bytes),
                33 | 65 => Self::from_raw(KeyAlgorithm::EcdsaSecp256k1, &bytes),
                n => Err(format!("unexpected key length of {} bytes", n)),
            }
        };
        parsed.map_err(invalid)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_der())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, {})", self.algorithm(), self.to_string_raw())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_der())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A parsed private key together with its algorithm and derived public key.
///
/// Immutable once built. The scalar is zeroized when the value is dropped.
pub struct KeyMaterial {
    algorithm: KeyAlgorithm,
    private_key: Secret<[u8; 32]>,
    public_key: PublicKey,
}

impl KeyMaterial {
    /// Parses `key` under `algorithm`. The result is a pure function of both inputs.
    ///
    /// ED25519 accepts a hex seed (optionally followed by its public half) or PKCS#8 DER.
    /// ECDSA accepts a hex scalar with or without `0x`, or DER.
    pub fn parse(algorithm: KeyAlgorithm, key: &str) -> Result<Self, String> {
        match algorithm {
            KeyAlgorithm::Ed25519 => parse_ed25519(key).map(|k| Self::from_ed25519(&k)),
            KeyAlgorithm::EcdsaSecp256k1 => parse_ecdsa(key).map(|k| Self::from_ecdsa(&k)),
        }
    }

    pub fn generate(algorithm: KeyAlgorithm) -> Self {
        match algorithm {
            KeyAlgorithm::Ed25519 => Self::from_ed25519(&ed25519_dalek::SigningKey::generate(&mut OsRng)),
            KeyAlgorithm::EcdsaSecp256k1 => Self::from_ecdsa(&k256::ecdsa::SigningKey::random(&mut OsRng)),
        }
    }

    fn from_ed25519(key: &ed25519_dalek::SigningKey) -> Self {
        Self {
            algorithm: KeyAlgorithm::Ed25519,
            private_key: Secret::new(key.to_bytes()),
            public_key: PublicKey::Ed25519(key.verifying_key().to_bytes()),
        }
    }

    fn from_ecdsa(key: &k256::ecdsa::SigningKey) -> Self {
        let point = key.verifying_key().to_encoded_point(true);
        let mut compressed = [0u8; 33];
        compressed.copy_from_slice(point.as_bytes());
        let mut scalar = [0u8; 32];
        scalar.copy_from_slice(&key.to_bytes());
        Self {
            algorithm: KeyAlgorithm::EcdsaSecp256k1,
            private_key: Secret::new(scalar),
            public_key: PublicKey::EcdsaSecp256k1(compressed),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Hex export of the private key: a bare seed for ED25519, `0x`-prefixed for ECDSA.
    pub fn to_string_raw(&self) -> String {
        let encoded = hex::encode(self.private_key.expose_secret());
        match self.algorithm {
            KeyAlgorithm::Ed25519 => encoded,
            KeyAlgorithm::EcdsaSecp256k1 => format!("0x{}", encoded),
        }
    }

    pub fn to_string_der(&self) -> String {
        let prefix = match self.algorithm {
            KeyAlgorithm::Ed25519 => ED25519_PRIVATE_DER_PREFIX,
            KeyAlgorithm::EcdsaSecp256k1 => ECDSA_PRIVATE_DER_PREFIX,
        };
        format!("{}{}", prefix, hex::encode(self.private_key.expose_secret()))
    }

    /// ED25519 signs the message itself; ECDSA signs its keccak256 digest.
    pub fn sign(&self, message: &[u8]) -> LedgerResult<Vec<u8>> {
        let secret = self.private_key.expose_secret();
        match self.algorithm {
            KeyAlgorithm::Ed25519 => {
                let key = ed25519_dalek::SigningKey::from_bytes(secret);
                Ok(key.sign(message).to_bytes().to_vec())
            }
            KeyAlgorithm::EcdsaSecp256k1 => {
                let key = k256::ecdsa::SigningKey::from_slice(secret)
                    .map_err(|e| LedgerError::Validation(format!("Invalid ECDSA key: {}", e)))?;
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(&keccak256(message))
                    .map_err(|e| LedgerError::Validation(format!("ECDSA signing failed: {}", e)))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

fn decode_hex(input: &str) -> Result<Vec<u8>, String> {
    let trimmed = input.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| format!("not valid hex: {}", e))
}

fn strip_der_prefix<'a>(bytes: &'a [u8], prefix_hex: &str) -> Option<&'a [u8]> {
    let prefix = hex::decode(prefix_hex).ok()?;
    bytes.strip_prefix(prefix.as_slice())
}

fn parse_ed25519(key: &str) -> Result<ed25519_dalek::SigningKey, String> {
    let key = key.trim();
    if key.starts_with("0x") {
        return Err("ED25519 private keys are not 0x-prefixed".to_string());
    }
    let bytes = Zeroizing::new(hex::decode(key).map_err(|e| format!("not valid hex: {}", e))?);
    let mut seed = Zeroizing::new([0u8; 32]);
    match bytes.len() {
        // seed, or seed followed by the public key
        32 | 64 => {
            seed.copy_from_slice(&bytes[..32]);
            Ok(ed25519_dalek::SigningKey::from_bytes(&seed))
        }
        48 if strip_der_prefix(&bytes, ED25519_PRIVATE_DER_PREFIX).is_some() => {
            seed.copy_from_slice(&bytes[16..]);
            Ok(ed25519_dalek::SigningKey::from_bytes(&seed))
        }
        _ => ed25519_dalek::SigningKey::from_pkcs8_der(&bytes)
            .map_err(|e| format!("not a valid ED25519 DER key ({} bytes): {}", bytes.len(), e)),
    }
}

fn parse_ecdsa(key: &str) -> Result<k256::ecdsa::SigningKey, String> {
    use k256::pkcs8::DecodePrivateKey as _;

    let bytes = Zeroizing::new(decode_hex(key)?);
    if bytes.len() == 32 {
        return k256::ecdsa::SigningKey::from_slice(&bytes)
            .map_err(|e| format!("not a valid secp256k1 scalar: {}", e));
    }
    if let Some(raw) = strip_der_prefix(&bytes, ECDSA_PRIVATE_DER_PREFIX) {
        return k256::ecdsa::SigningKey::from_slice(raw)
            .map_err(|e| format!("not a valid secp256k1 scalar: {}", e));
    }
    k256::ecdsa::SigningKey::from_pkcs8_der(&bytes)
        .map_err(|e| format!("not a valid ECDSA DER key ({} bytes): {}", bytes.len(), e))
}
