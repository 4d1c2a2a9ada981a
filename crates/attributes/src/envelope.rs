//! Binary envelope behind the base64 layer.

use bincode::config::{standard, Configuration, LittleEndian, Limit, Varint};
use bincode::serde::{decode_from_slice, encode_to_vec};
use ngram::FingerprintSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AttributeError;

/// Largest envelope [`encode_envelope`] will produce.
pub const MAX_ENVELOPE_BYTES: usize = 64 * 1024;

/// Decoding budget. bincode charges four bytes per fingerprint however short
/// its varint encoding, so the budget is four times the encoded cap; anything
/// that encodes within the cap also decodes.
const DECODE_LIMIT_BYTES: usize = 4 * MAX_ENVELOPE_BYTES;

type EnvelopeConfig = Configuration<LittleEndian, Varint, Limit<DECODE_LIMIT_BYTES>>;

fn envelope_config() -> EnvelopeConfig {
    standard().with_limit::<DECODE_LIMIT_BYTES>()
}

/// Field order is part of the stored layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Envelope {
    pub(crate) salt: u64,
    pub(crate) fingerprints: FingerprintSet,
    #[serde(with = "extra_serde")]
    pub(crate) extra: Value,
}

/// `serde_json::Value` needs self-describing input, which bincode is not, so
/// the JSON travels as a byte string.
mod extra_serde {
    use serde::de::Error as DeError;
    use serde::ser::Error as SerError;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub(super) fn serialize<S>(value: &Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = serde_json::to_vec(value).map_err(SerError::custom)?;
        serializer.serialize_bytes(&bytes)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        serde_json::from_slice(&bytes).map_err(DeError::custom)
    }
}

pub(crate) fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, AttributeError> {
    let bytes = encode_to_vec(envelope, envelope_config())?;
    if bytes.len() > MAX_ENVELOPE_BYTES {
        return Err(AttributeError::Encode(format!(
            "envelope is {} bytes, limit is {MAX_ENVELOPE_BYTES}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

pub(crate) fn decode_envelope(bytes: &[u8]) -> Result<Envelope, AttributeError> {
    let (envelope, read): (Envelope, usize) = decode_from_slice(bytes, envelope_config())?;
    if read != bytes.len() {
        return Err(AttributeError::TrailingBytes {
            trailing: bytes.len() - read,
        });
    }
    Ok(envelope)
}
