// Copyright (c) 2019 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use generic_array::{typenum, GenericArray};
use hex::{FromHex, FromHexError};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use sha2::{self, Digest};

/// A SHA-256 value.
///
/// Displays and serializes as 64 lowercase hex characters.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Sha256 {
    inner: GenericArray<u8, typenum::U32>,
}

impl Sha256 {
    /// Hashes everything the reader yields.
    pub fn from_reader<R>(mut reader: R) -> io::Result<Sha256>
    where
        R: Read,
    {
        let mut hasher = sha2::Sha256::default();

        let mut buf = [0u8; 16384];

        loop {
            let n = reader.read(&mut buf)?;

            if n == 0 {
                break;
            }

            hasher.input(&buf[..n]);
        }

        Ok(Sha256 {
            inner: hasher.result(),
        })
    }

    /// Hashes the contents of a file.
    pub fn from_path<P>(path: P) -> io::Result<Sha256>
    where
        P: AsRef<Path>,
    {
        Self::from_reader(fs::File::open(path.as_ref())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Sha256 {
        let mut hasher = sha2::Sha256::default();
        hasher.input(bytes);
        Sha256 {
            inner: hasher.result(),
        }
    }

    /// Parses a 64 character hex string.
    pub fn from_hex(s: &str) -> Result<Sha256, FromHexError> {
        <[u8; 32]>::from_hex(s).map(|bytes| Sha256 {
            inner: GenericArray::from(bytes),
        })
    }
}

impl fmt::Display for Sha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.inner)
    }
}

impl fmt::Debug for Sha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.inner)
    }
}

impl Serialize for Sha256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:x}", self.inner))
    }
}

impl<'de> Deserialize<'de> for Sha256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HexVisitor;

        impl<'de> Visitor<'de> for HexVisitor {
            type Value = Sha256;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a 64 character hex string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Sha256::from_hex(v).map_err(|_| {
                    E::invalid_value(
                        de::Unexpected::Str(v),
                        &"a 64 character hex string",
                    )
                })
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of the empty input.
    const EMPTY: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn known_value() {
        assert_eq!(Sha256::from_bytes(b"").to_string(), EMPTY);
    }

    #[test]
    fn hex_round_trip() {
        let sha = Sha256::from_bytes(b"hello");
        let parsed = Sha256::from_hex(&sha.to_string()).unwrap();
        assert_eq!(sha, parsed);
    }

    #[test]
    fn reader_matches_bytes() {
        let bytes = b"the quick brown fox";
        assert_eq!(
            Sha256::from_reader(&bytes[..]).unwrap(),
            Sha256::from_bytes(bytes)
        );
    }

    #[test]
    fn serde() {
        let sha = Sha256::from_bytes(b"");
        let json = serde_json::to_string(&sha).unwrap();
        assert_eq!(json, format!("\"{}\"", EMPTY));
        assert_eq!(serde_json::from_str::<Sha256>(&json).unwrap(), sha);
    }

    #[test]
    fn bad_hex() {
        assert!(Sha256::from_hex("not hex").is_err());
        assert!(Sha256::from_hex("abcd").is_err());
    }
}
