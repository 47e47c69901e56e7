// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object body encodings.
//!
//! Binary bodies start with [`BINARY_MARKER`], which never begins a JSON
//! document, so readers can accept either encoding regardless of the
//! encoding currently configured for writes.

use crate::error::{CimError, CimResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Leading byte of a binary body.
pub const BINARY_MARKER: u8 = 0xB1;

/// Encoding used for newly written object bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Binary,
    Json,
}

impl std::str::FromStr for Encoding {
    type Err = CimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Encoding::Binary),
            "json" => Ok(Encoding::Json),
            other => Err(CimError::Config(format!("unknown encoding '{}'", other))),
        }
    }
}

/// Serializes repository objects to bytes and back.
pub trait ObjectStreamer {
    fn encode<T: Serialize>(&self, value: &T) -> CimResult<Vec<u8>>;
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CimResult<T>;
}

/// Pretty-printed JSON, readable on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStreamer;

impl ObjectStreamer for JsonStreamer {
    fn encode<T: Serialize>(&self, value: &T) -> CimResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CimResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Marker byte followed by a bincode body.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryStreamer;

impl ObjectStreamer for BinaryStreamer {
    fn encode<T: Serialize>(&self, value: &T) -> CimResult<Vec<u8>> {
        let mut out = vec![BINARY_MARKER];
        bincode::serialize_into(&mut out, value)?;
        Ok(out)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CimResult<T> {
        match bytes.split_first() {
            Some((&BINARY_MARKER, body)) => Ok(bincode::deserialize(body)?),
            _ => Err(CimError::Corrupt(
                "binary body does not start with the binary marker".to_string(),
            )),
        }
    }
}

/// Writes with the configured encoding, reads whichever encoding it finds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoStreamer {
    encoding: Encoding,
}

impl AutoStreamer {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl ObjectStreamer for AutoStreamer {
    fn encode<T: Serialize>(&self, value: &T) -> CimResult<Vec<u8>> {
        match self.encoding {
            Encoding::Binary => BinaryStreamer.encode(value),
            Encoding::Json => JsonStreamer.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CimResult<T> {
        match bytes.first() {
            Some(&BINARY_MARKER) => BinaryStreamer.decode(bytes),
            Some(_) => JsonStreamer.decode(bytes),
            None => Err(CimError::Corrupt("empty object body".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CimClass, CimFlavor, CimInstance, CimProperty, CimQualifier, CimQualifierDecl, CimScope,
        CimType, CimValue,
    };

    fn sample_class() -> CimClass {
        CimClass::new("TST_Disk")
            .with_super_class("TST_Device")
            .with_qualifier(
                CimQualifier::new("Description", "a disk")
                    .with_flavor(CimFlavor::TRANSLATABLE | CimFlavor::TOSUBCLASS),
            )
            .with_property(
                CimProperty::new("DeviceID", CimValue::null(CimType::String))
                    .with_qualifier(CimQualifier::new("Key", true)),
            )
            .with_property(CimProperty::new("Capacity", 512u64))
    }

    #[test]
    fn test_auto_streamer_reads_both_encodings() {
        let class = sample_class();
        let json = AutoStreamer::new(Encoding::Json).encode(&class).unwrap();
        let binary = AutoStreamer::new(Encoding::Binary).encode(&class).unwrap();
        assert_eq!(binary[0], BINARY_MARKER);
        assert_eq!(json[0], b'{');

        let reader = AutoStreamer::default();
        let from_json: CimClass = reader.decode(&json).unwrap();
        let from_binary: CimClass = reader.decode(&binary).unwrap();
        assert!(from_json.identical(&class));
        assert!(from_binary.identical(&class));
    }

    #[test]
    fn test_qualifier_decl_and_instance_bodies() {
        let decl = CimQualifierDecl::new(
            "q4",
            CimValue::null(CimType::String),
            CimScope::CLASS | CimScope::PROPERTY,
            CimFlavor::RESTRICTED,
        );
        let instance = CimInstance::new("TST_Disk")
            .with_property(CimProperty::new("DeviceID", "sda"))
            .with_property(CimProperty::new(
                "Tags",
                CimValue::array(CimType::String, vec!["a".into(), "b".into()]).unwrap(),
            ));

        let streamer = AutoStreamer::new(Encoding::Binary);
        let decl_back: CimQualifierDecl = streamer.decode(&streamer.encode(&decl).unwrap()).unwrap();
        assert!(decl_back.identical(&decl));
        assert!(!decl_back.flavor().has_flavor(CimFlavor::TOSUBCLASS));

        let instance_back: CimInstance = streamer
            .decode(&streamer.encode(&instance).unwrap())
            .unwrap();
        assert!(instance_back.identical(&instance));
    }

    #[test]
    fn test_corrupt_bodies() {
        let streamer = AutoStreamer::default();
        assert!(streamer.decode::<CimClass>(&[]).is_err());
        assert!(streamer.decode::<CimClass>(b"not json").is_err());
        assert!(BinaryStreamer.decode::<CimClass>(b"{}").is_err());
        assert!(streamer.decode::<CimClass>(&[BINARY_MARKER, 1, 2]).is_err());
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("JSON".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("binary".parse::<Encoding>().unwrap(), Encoding::Binary);
        assert!("xml".parse::<Encoding>().is_err());
    }
}
