//! Request obfuscation for the vendor's `eapi` endpoint family.
//!
//! Endpoints under `/eapi/` do not accept plain parameters. Instead the
//! client sends a single `params` form field that carries an encrypted,
//! signed copy of the JSON payload.
//!
//! # Protocol
//!
//! 1. The endpoint path is rewritten from `/eapi/` to `/api/`.
//! 2. A digest is computed as the lowercase hex MD5 of
//!    `"nobody" + path + "use" + json + "md5forencrypt"`.
//! 3. The signing string is
//!    `path + "-36cd479b6b5-" + json + "-36cd479b6b5-" + digest`.
//! 4. The signing string is PKCS7-padded, encrypted with AES-128 in ECB mode
//!    and hex-encoded in lowercase.
//!
//! ECB is deterministic: the same key, path and payload always produce the
//! same ciphertext.
//!
//! # Examples
//!
//! ```rust
//! use ncm_resolver::eapi::{Cipher, Key};
//!
//! let cipher = Cipher::new(Key::default());
//! let params = cipher.encrypt("/eapi/song/enhance/player/url/v1", &payload)?;
//! ```

use std::{ops::Deref, str::FromStr};

use aes::Aes128;
use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use md5::{Digest, Md5};
use serde::Serialize;
use veil::Redact;

use crate::error::{Error, Result};

type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;

/// Length of cipher keys in bytes.
pub const KEY_LENGTH: usize = 16;

/// Raw key bytes.
pub type RawKey = [u8; KEY_LENGTH];

/// Validated AES-128 key.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Redact)]
#[redact(all)]
pub struct Key(RawKey);

impl Key {
    /// Key shipped with the vendor's desktop client.
    pub const DESKTOP: RawKey = *b"e82ckenh8dichen8";
}

impl Default for Key {
    fn default() -> Self {
        Self(Self::DESKTOP)
    }
}

impl FromStr for Key {
    type Err = Error;

    /// Parses a string into a cipher key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the string isn't exactly
    /// 16 bytes long.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let len = s.len();
        if len != KEY_LENGTH {
            return Err(Error::invalid_argument(format!(
                "key length is {len} but should be {KEY_LENGTH}",
            )));
        }

        let mut key = [0; KEY_LENGTH];
        key.copy_from_slice(s.as_bytes());

        Ok(Self(key))
    }
}

impl Deref for Key {
    type Target = RawKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Separator between the parts of the signing string.
const SEPARATOR: &str = "-36cd479b6b5-";

/// Private API path segment and its public counterpart.
const PRIVATE_SEGMENT: &str = "/eapi/";
const PUBLIC_SEGMENT: &str = "/api/";

/// Encrypts payloads for `eapi` endpoints with a fixed key.
#[derive(Clone, Debug)]
pub struct Cipher {
    key: Key,
}

impl Cipher {
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// Serializes `payload` and encrypts it for the endpoint at `path`.
    ///
    /// `path` may be a full URL path such as
    /// `/eapi/song/enhance/player/url/v1`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CipherFailure` if the payload cannot be serialized
    /// or encrypted.
    pub fn encrypt<T>(&self, path: &str, payload: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string(payload).map_err(Error::cipher_failure)?;
        self.encrypt_json(path, &json)
    }

    /// Encrypts an already serialized JSON payload for the endpoint at `path`.
    pub fn encrypt_json(&self, path: &str, json: &str) -> Result<String> {
        let signing = signing_string(path, json);
        let cipher = Aes128EcbEnc::new_from_slice(&*self.key)
            .map_err(|e| Error::cipher_failure(e.to_string()))?;
        let encrypted = cipher.encrypt_padded_vec_mut::<Pkcs7>(signing.as_bytes());

        Ok(hex::encode(encrypted))
    }

    /// Reverses [`Cipher::encrypt`], returning the signing string.
    ///
    /// Useful to inspect captured `params` values.
    pub fn decrypt(&self, params: &str) -> Result<String> {
        let encrypted = hex::decode(params).map_err(Error::cipher_failure)?;
        let cipher = Aes128EcbDec::new_from_slice(&*self.key)
            .map_err(|e| Error::cipher_failure(e.to_string()))?;
        let decrypted = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&encrypted)
            .map_err(|e| Error::cipher_failure(e.to_string()))?;

        String::from_utf8(decrypted).map_err(Error::cipher_failure)
    }
}

/// Rewrites a private API path to the public path used for signing.
#[must_use]
pub fn public_path(path: &str) -> String {
    path.replace(PRIVATE_SEGMENT, PUBLIC_SEGMENT)
}

/// Lowercase hex MD5 digest over the path and JSON payload.
#[must_use]
pub fn digest(path: &str, json: &str) -> String {
    let path = public_path(path);
    let hash = Md5::digest(format!("nobody{path}use{json}md5forencrypt"));
    hex::encode(hash)
}

/// Plaintext that gets encrypted: path, payload and digest.
#[must_use]
pub fn signing_string(path: &str, json: &str) -> String {
    let digest = digest(path, json);
    let path = public_path(path);
    format!("{path}{SEPARATOR}{json}{SEPARATOR}{digest}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const PATH: &str = "/eapi/song/enhance/player/url/v1";
    const LOSSLESS: &str = r#"{"ids":["2053369738"],"level":"lossless"}"#;
    const STANDARD: &str = r#"{"ids":["2053369738"],"level":"standard"}"#;

    #[derive(Serialize)]
    struct Payload<'a> {
        ids: [&'a str; 1],
        level: &'a str,
    }

    #[test]
    fn path_is_rewritten() {
        assert_eq!(public_path(PATH), "/api/song/enhance/player/url/v1");
        assert_eq!(public_path("/api/song/lyric"), "/api/song/lyric");
    }

    #[test]
    fn digest_matches_reference() {
        assert_eq!(digest(PATH, LOSSLESS), "246118c344678b22d121ef7b4c327c55");
    }

    #[test]
    fn signing_string_layout() {
        assert_eq!(
            signing_string(PATH, LOSSLESS),
            "/api/song/enhance/player/url/v1-36cd479b6b5-\
             {\"ids\":[\"2053369738\"],\"level\":\"lossless\"}\
             -36cd479b6b5-246118c344678b22d121ef7b4c327c55"
        );
    }

    #[test]
    fn ciphertext_matches_reference() {
        let cipher = Cipher::new(Key::default());
        let params = cipher.encrypt_json(PATH, LOSSLESS).unwrap();
        assert_eq!(
            params,
            "fa90b329e9614f79e79598f37dc2edb487f00d1bc4c9b24cd57e6c318b907356\
             9338432cd7d98d1a3626e997a2c531210cba036322f633e1547e2e468d79e979\
             e73c0f442e4623124f2914da4b3b506a256afb7f54a5dec9ab1074d34e43d049\
             dd5bd8ea7baefe9952185cf72c52360c579b02b0c0b9cff93290baa8eb09e475\
             24480a3019881273395236da8c839d3a"
        );
    }

    #[test]
    fn serialized_payload_is_encrypted_verbatim() {
        let cipher = Cipher::new(Key::default());
        let payload = Payload {
            ids: ["2053369738"],
            level: "lossless",
        };
        assert_eq!(
            cipher.encrypt(PATH, &payload).unwrap(),
            cipher.encrypt_json(PATH, LOSSLESS).unwrap()
        );
    }

    #[test]
    fn encryption_is_deterministic() {
        let cipher = Cipher::new(Key::default());
        let first = cipher.encrypt_json(PATH, LOSSLESS).unwrap();
        let second = cipher.encrypt_json(PATH, LOSSLESS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn one_field_changes_digest_and_ciphertext() {
        let cipher = Cipher::new(Key::default());
        assert_ne!(digest(PATH, LOSSLESS), digest(PATH, STANDARD));
        assert_eq!(digest(PATH, STANDARD), "2ff3a2059cdd40366b4a1748cc4501a1");

        let lossless = cipher.encrypt_json(PATH, LOSSLESS).unwrap();
        let standard = cipher.encrypt_json(PATH, STANDARD).unwrap();
        assert_ne!(lossless, standard);
        assert!(lossless.len() % 32 == 0);
        assert!(lossless.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn decrypt_round_trip() {
        let cipher = Cipher::new(Key::default());
        let params = cipher.encrypt_json(PATH, LOSSLESS).unwrap();
        assert_eq!(cipher.decrypt(&params).unwrap(), signing_string(PATH, LOSSLESS));
    }

    #[test]
    fn other_key_other_ciphertext() {
        let default = Cipher::new(Key::default());
        let custom = Cipher::new("0123456789abcdef".parse().unwrap());
        assert_ne!(
            default.encrypt_json(PATH, LOSSLESS).unwrap(),
            custom.encrypt_json(PATH, LOSSLESS).unwrap()
        );
    }

    #[test]
    fn key_length_is_enforced() {
        assert!("0123456789abcdef".parse::<Key>().is_ok());
        let err = "short".parse::<Key>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!("0123456789abcdef0".parse::<Key>().is_err());
    }

    #[test]
    fn garbage_params_are_a_cipher_failure() {
        let cipher = Cipher::new(Key::default());
        let err = cipher.decrypt("not hex").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CipherFailure);
    }
}
