//! Symmetric authenticated-at-rest encryption for credentials and tokens.
//!
//! Ciphertext format: `base64(aes_cbc_pkcs7(plaintext)) || base64(iv)`, where the IV's base64
//! encoding is always 24 characters for a 16-byte IV, so [`EncryptionService::decrypt`] splits
//! the string on that constant tail length. A fresh IV is generated per [`EncryptionService::encrypt`]
//! call. This mirrors the on-disk format of the system this crate replaces; a version byte is
//! reserved for future rotation but the current format omits it.

// std
use std::fmt;
// lib
use aes::Aes256;
use base64::Engine;
use cbc::{
	cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7},
	Decryptor, Encryptor,
};
use rand::RngCore;
// self
use crate::_prelude::*;

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const IV_B64_LEN: usize = 24;

/// A 256-bit AES key, parsed once from base64 configuration at startup.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);
impl EncryptionKey {
	/// Parses a base64-encoded 32-byte key.
	///
	/// A malformed or wrong-length key is a fatal configuration error, not a per-call error.
	pub fn from_base64(encoded: &str) -> Result<Self, EncryptionKeyError> {
		let bytes = base64::engine::general_purpose::STANDARD
			.decode(encoded)
			.map_err(EncryptionKeyError::Base64)?;
		let bytes: [u8; KEY_LEN] =
			bytes.try_into().map_err(|bytes: Vec<u8>| EncryptionKeyError::WrongLength {
				expected: KEY_LEN,
				got: bytes.len(),
			})?;

		Ok(Self(bytes))
	}
}
impl fmt::Debug for EncryptionKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("EncryptionKey(<redacted>)")
	}
}

/// Error raised when the configured encryption key cannot be parsed.
#[derive(Debug, ThisError)]
pub enum EncryptionKeyError {
	/// The configured value is not valid base64.
	#[error("Encryption key is not valid base64.")]
	Base64(#[source] base64::DecodeError),
	/// The decoded key is not exactly 32 bytes.
	#[error("Encryption key must be {expected} bytes, got {got}.")]
	WrongLength {
		/// Expected byte length.
		expected: usize,
		/// Actual decoded byte length.
		got: usize,
	},
}

/// Error raised when a ciphertext fails to decrypt under the active key.
#[derive(Debug, ThisError)]
pub enum DecryptError {
	/// The ciphertext is shorter than the fixed IV tail.
	#[error("Ciphertext is truncated.")]
	Truncated,
	/// The ciphertext or IV segment is not valid base64.
	#[error("Ciphertext is malformed.")]
	Malformed {
		/// Underlying base64 decoding failure.
		#[source]
		source: base64::DecodeError,
	},
	/// The padding or block alignment was invalid under the active key — tamper or wrong key.
	#[error("Ciphertext could not be decrypted under the active key.")]
	Cipher,
}

/// A ciphertext produced by [`EncryptionService::encrypt`].
///
/// This newtype exists so a plaintext can never be written to a `*_ct` column by accident.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(String);
impl Ciphertext {
	/// Wraps a raw ciphertext string, e.g. one loaded back from storage.
	pub fn from_raw(raw: String) -> Self {
		Self(raw)
	}

	/// Returns the raw ciphertext string for persistence.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl fmt::Debug for Ciphertext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Ciphertext(<redacted>)")
	}
}
impl From<Ciphertext> for String {
	fn from(value: Ciphertext) -> Self {
		value.0
	}
}

/// Symmetric authenticated-at-rest encryption service.
///
/// A plain struct rather than a trait: there is exactly one algorithm and no pluggability
/// requirement here, so a trait would be needless indirection.
#[derive(Clone)]
pub struct EncryptionService {
	key: Arc<EncryptionKey>,
}
impl EncryptionService {
	/// Builds a service from an already-parsed key.
	pub fn new(key: EncryptionKey) -> Self {
		Self { key: Arc::new(key) }
	}

	/// Encrypts `plaintext`, generating a fresh random IV.
	pub fn encrypt(&self, plaintext: &str) -> Ciphertext {
		let mut iv = [0_u8; IV_LEN];

		rand::rng().fill_bytes(&mut iv);

		let ciphertext_bytes =
			Aes256CbcEnc::new(self.key.0.as_slice().into(), iv.as_slice().into())
				.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

		let ciphertext_b64 = base64::engine::general_purpose::STANDARD.encode(ciphertext_bytes);
		let iv_b64 = base64::engine::general_purpose::STANDARD.encode(iv);

		debug_assert_eq!(iv_b64.len(), IV_B64_LEN);

		Ciphertext(format!("{ciphertext_b64}{iv_b64}"))
	}

	/// Decrypts a [`Ciphertext`] produced by [`Self::encrypt`] under the same key.
	pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<String, DecryptError> {
		let raw = &ciphertext.0;

		if raw.len() <= IV_B64_LEN {
			return Err(DecryptError::Truncated);
		}

		let (ciphertext_b64, iv_b64) = raw.split_at(raw.len() - IV_B64_LEN);

		let ciphertext_bytes = base64::engine::general_purpose::STANDARD
			.decode(ciphertext_b64)
			.map_err(|source| DecryptError::Malformed { source })?;
		let iv_bytes = base64::engine::general_purpose::STANDARD
			.decode(iv_b64)
			.map_err(|source| DecryptError::Malformed { source })?;

		if iv_bytes.len() != IV_LEN {
			return Err(DecryptError::Cipher);
		}

		let plaintext_bytes =
			Aes256CbcDec::new(self.key.0.as_slice().into(), iv_bytes.as_slice().into())
				.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext_bytes)
				.map_err(|_| DecryptError::Cipher)?;

		String::from_utf8(plaintext_bytes).map_err(|_| DecryptError::Cipher)
	}
}
