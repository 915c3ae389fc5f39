//! Encodings, the letter cipher and digests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::Md5;
use sha2::{Digest, Sha256, Sha512};

use super::{str_arg, unknown_operation};
use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::registry::{Arity, RuntimeFunction};
use crate::value::Value;

pub static FUNCTIONS: &[RuntimeFunction] = &[
    RuntimeFunction {
        name: "force_encrypt",
        signature: "force_encrypt(operation, text[, key]) -> str",
        summary: "base64_encode, base64_decode, simple_cipher, simple_decipher",
        category: "encoding",
        arity: Arity::Range(2, 3),
        call: force_encrypt,
    },
    RuntimeFunction {
        name: "force_hash",
        signature: "force_hash(algorithm, text) -> str",
        summary: "Hex digest: md5, sha256, sha512",
        category: "hashing",
        arity: Arity::Fixed(2),
        call: force_hash,
    },
];

/// Key used by the letter cipher when none is given.
pub const DEFAULT_CIPHER_KEY: &str = "force";

const ENCRYPT_OPS: &[&str] = &["base64_encode", "base64_decode", "simple_cipher", "simple_decipher"];
const HASH_ALGORITHMS: &[&str] = &["md5", "sha256", "sha512"];

fn force_encrypt(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "force_encrypt";
    let op = str_arg(NAME, args, 0)?;
    let text = str_arg(NAME, args, 1)?;
    let key = match args.get(2) {
        Some(_) => str_arg(NAME, args, 2)?,
        None => DEFAULT_CIPHER_KEY,
    };
    match op {
        "base64_encode" => Ok(Value::str(STANDARD.encode(text))),
        "base64_decode" => {
            let bytes = STANDARD
                .decode(text.trim())
                .map_err(|e| RuntimeError::invalid(format!("invalid base64: {e}")))?;
            String::from_utf8(bytes)
                .map(Value::str)
                .map_err(|_| RuntimeError::invalid("decoded data is not valid UTF-8"))
        }
        "simple_cipher" => shift_letters(text, key, true).map(Value::str),
        "simple_decipher" => shift_letters(text, key, false).map(Value::str),
        other => Err(unknown_operation(NAME, other, ENCRYPT_OPS)),
    }
}

/// Shift each ASCII letter by the next key letter, keeping case. Other
/// characters pass through and do not advance the key.
pub fn shift_letters(text: &str, key: &str, forward: bool) -> Result<String, RuntimeError> {
    let shifts: Vec<u8> = key
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_lowercase() - b'a')
        .collect();
    if shifts.is_empty() {
        return Err(RuntimeError::invalid("cipher key must contain at least one letter"));
    }
    let mut next = 0;
    Ok(text
        .chars()
        .map(|c| {
            if !c.is_ascii_alphabetic() {
                return c;
            }
            let base = if c.is_ascii_lowercase() { b'a' } else { b'A' };
            let shift = shifts[next % shifts.len()];
            next += 1;
            let offset = c as u8 - base;
            let moved = if forward {
                (offset + shift) % 26
            } else {
                (offset + 26 - shift) % 26
            };
            (base + moved) as char
        })
        .collect())
}

fn force_hash(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let algorithm = str_arg("force_hash", args, 0)?;
    let text = str_arg("force_hash", args, 1)?;
    let digest = match algorithm {
        "md5" => hex(&Md5::digest(text.as_bytes())),
        "sha256" => hex(&Sha256::digest(text.as_bytes())),
        "sha512" => hex(&Sha512::digest(text.as_bytes())),
        other => return Err(unknown_operation("force_hash", other, HASH_ALGORITHMS)),
    };
    Ok(Value::str(digest))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::str(text)
    }

    fn encrypt(args: &[Value]) -> Result<Value, RuntimeError> {
        force_encrypt(&mut CallContext::detached(), args)
    }

    fn hash(algorithm: &str, text: &str) -> String {
        force_hash(&mut CallContext::detached(), &[s(algorithm), s(text)])
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_base64() {
        let encoded = encrypt(&[s("base64_encode"), s("Hello, Galaxy!")]).unwrap();
        assert_eq!(encoded, s("SGVsbG8sIEdhbGF4eSE="));
        assert_eq!(encrypt(&[s("base64_decode"), encoded]).unwrap(), s("Hello, Galaxy!"));
        assert!(encrypt(&[s("base64_decode"), s("***")]).is_err());
    }

    #[test]
    fn test_cipher() {
        let ciphered = encrypt(&[s("simple_cipher"), s("abc"), s("key")]).unwrap();
        assert_eq!(ciphered, s("kfa"));
        let message = "Use the Force, Luke!";
        let hidden = shift_letters(message, DEFAULT_CIPHER_KEY, true).unwrap();
        assert_ne!(hidden, message);
        assert_eq!(shift_letters(&hidden, DEFAULT_CIPHER_KEY, false).unwrap(), message);
        assert!(shift_letters("abc", "123", true).is_err());
    }

    #[test]
    fn test_digests() {
        let text = "The Force is strong with this one";
        assert_eq!(hash("md5", text).len(), 32);
        assert_eq!(hash("sha256", text).len(), 64);
        assert_eq!(hash("sha512", text).len(), 128);
        assert_eq!(hash("md5", text), hash("md5", text));
        assert_eq!(hash("md5", ""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            hash("sha256", "abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
