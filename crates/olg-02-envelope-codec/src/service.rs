//! # Envelope Codec Service
//!
//! Maps [`Envelope`] to and from its canonical JSON wire form.
//!
//! Timestamps are written as RFC 3339 in UTC with a `Z` suffix and only as
//! many fractional digits as needed (0, 3, 6 or 9), so the text parses back
//! to the identical instant.

use crate::config::CodecConfig;
use crate::domain::{to_canonical_string, CodecError};
use crate::ports::inbound::EnvelopeCodecApi;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use shared_types::{Envelope, MessageId, MessageType};
use tracing::debug;

/// Every key of an encoded envelope.
pub const ENVELOPE_FIELDS: [&str; 8] = [
    "id",
    "from",
    "to",
    "type",
    "subject",
    "payload",
    "signature",
    "created_at",
];

/// Length of a hex Ed25519 signature.
pub const SIGNATURE_HEX_LEN: usize = 128;

/// Envelope codec.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec {
    config: CodecConfig,
}

impl EnvelopeCodec {
    /// Create a codec with the given limits.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn to_object(envelope: &Envelope, with_signature: bool) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(envelope.id.to_string()));
        map.insert("from".into(), Value::String(envelope.from.clone()));
        map.insert("to".into(), Value::String(envelope.to.clone()));
        map.insert(
            "type".into(),
            Value::String(envelope.message_type.as_str().to_string()),
        );
        map.insert("subject".into(), Value::String(envelope.subject.clone()));
        map.insert("payload".into(), envelope.payload.clone());
        map.insert(
            "created_at".into(),
            Value::String(format_timestamp(&envelope.created_at)),
        );
        if with_signature {
            map.insert("signature".into(), Value::String(envelope.signature.clone()));
        }
        Value::Object(map)
    }
}

/// RFC 3339 form used on the wire.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn take_string(map: &mut Map<String, Value>, field: &'static str) -> Result<String, CodecError> {
    match map.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(CodecError::InvalidField {
            field,
            reason: "expected a string".into(),
        }),
        None => Err(CodecError::MissingField(field)),
    }
}

fn non_empty_domain(map: &mut Map<String, Value>, field: &'static str) -> Result<String, CodecError> {
    let value = take_string(map, field)?;
    if value.trim().is_empty() {
        return Err(CodecError::InvalidField {
            field,
            reason: "domain must not be empty".into(),
        });
    }
    Ok(value)
}

fn check_signature(signature: &str) -> Result<(), CodecError> {
    if signature.is_empty() {
        return Ok(());
    }
    if signature.len() != SIGNATURE_HEX_LEN || !signature.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CodecError::InvalidField {
            field: "signature",
            reason: format!("must be empty or {SIGNATURE_HEX_LEN} hex characters"),
        });
    }
    Ok(())
}

impl EnvelopeCodecApi for EnvelopeCodec {
    fn signing_bytes(&self, envelope: &Envelope) -> Vec<u8> {
        to_canonical_string(&Self::to_object(envelope, false)).into_bytes()
    }

    fn encode(&self, envelope: &Envelope) -> Vec<u8> {
        to_canonical_string(&Self::to_object(envelope, true)).into_bytes()
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope, CodecError> {
        if bytes.len() > self.config.max_envelope_bytes {
            return Err(CodecError::TooLarge {
                size: bytes.len(),
                max: self.config.max_envelope_bytes,
            });
        }

        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(CodecError::Malformed("envelope must be a JSON object".into()));
        };

        if let Some(unknown) = map.keys().find(|k| !ENVELOPE_FIELDS.contains(&k.as_str())) {
            return Err(CodecError::UnknownField(unknown.clone()));
        }
        if let Some(missing) = ENVELOPE_FIELDS.iter().find(|f| !map.contains_key(**f)) {
            return Err(CodecError::MissingField(*missing));
        }

        let id_text = take_string(&mut map, "id")?;
        let id = id_text.parse::<MessageId>().map_err(|e| CodecError::InvalidField {
            field: "id",
            reason: e.to_string(),
        })?;

        let from = non_empty_domain(&mut map, "from")?;
        let to = non_empty_domain(&mut map, "to")?;

        let type_text = take_string(&mut map, "type")?;
        let message_type = type_text
            .parse::<MessageType>()
            .map_err(|_| CodecError::UnknownMessageType(type_text.clone()))?;

        let subject = take_string(&mut map, "subject")?;
        let payload = map.remove("payload").unwrap_or(Value::Null);

        let signature = take_string(&mut map, "signature")?;
        check_signature(&signature)?;

        let created_text = take_string(&mut map, "created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_text)
            .map_err(|e| CodecError::InvalidField {
                field: "created_at",
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);

        debug!(message_id = %id, message_type = %message_type, from = %from, "Decoded envelope");

        Ok(Envelope {
            id,
            from,
            to,
            message_type,
            subject,
            payload,
            signature,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    fn envelope() -> Envelope {
        let mut env = Envelope::new(
            "a.example.edu",
            "b.example.edu",
            MessageType::SyncRequest,
            "sync.pull",
            json!({"limit": 100, "cursor": null, "kinds": ["course", "user"]}),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        );
        env.id = MessageId(Uuid::from_u128(0x1234));
        env
    }

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::default()
    }

    fn decode_value(value: Value) -> Result<Envelope, CodecError> {
        codec().decode(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_signing_bytes_are_canonical() {
        let bytes = codec().signing_bytes(&envelope());
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            concat!(
                r#"{"created_at":"2024-03-01T12:00:00Z","from":"a.example.edu","id":"00000000-0000-0000-0000-000000001234","#,
                r#""payload":{"cursor":null,"kinds":["course","user"],"limit":100},"#,
                r#""subject":"sync.pull","to":"b.example.edu","type":"sync_request"}"#
            )
        );
    }

    #[test]
    fn test_signing_bytes_ignore_signature() {
        let mut signed = envelope();
        signed.signature = "ab".repeat(64);
        assert_eq!(codec().signing_bytes(&signed), codec().signing_bytes(&envelope()));
        assert_ne!(codec().encode(&signed), codec().encode(&envelope()));
    }

    #[test]
    fn test_roundtrip_keeps_subsecond_precision() {
        let mut env = envelope();
        env.created_at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        env.signature = "0f".repeat(64);
        let decoded = codec().decode(&codec().encode(&env)).unwrap();
        assert_eq!(decoded, env);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(codec().decode(b"{not json"), Err(CodecError::Malformed(_))));
        assert!(matches!(codec().decode(b"[1,2]"), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_rejects_missing_and_unknown_fields() {
        let mut value: Value = serde_json::from_slice(&codec().encode(&envelope())).unwrap();
        value.as_object_mut().unwrap().remove("subject");
        assert_eq!(decode_value(value.clone()), Err(CodecError::MissingField("subject")));

        value["subject"] = json!("s");
        value["extra"] = json!(1);
        assert_eq!(decode_value(value), Err(CodecError::UnknownField("extra".into())));
    }

    #[test]
    fn test_rejects_unknown_type() {
        let mut value: Value = serde_json::from_slice(&codec().encode(&envelope())).unwrap();
        value["type"] = json!("gossip");
        assert_eq!(
            decode_value(value),
            Err(CodecError::UnknownMessageType("gossip".into()))
        );
    }

    #[test]
    fn test_rejects_empty_domain() {
        let mut value: Value = serde_json::from_slice(&codec().encode(&envelope())).unwrap();
        value["to"] = json!("  ");
        assert!(matches!(
            decode_value(value),
            Err(CodecError::InvalidField { field: "to", .. })
        ));
    }

    #[test]
    fn test_signature_shape() {
        let mut value: Value = serde_json::from_slice(&codec().encode(&envelope())).unwrap();
        value["signature"] = json!("abc");
        assert!(matches!(
            decode_value(value.clone()),
            Err(CodecError::InvalidField { field: "signature", .. })
        ));
        value["signature"] = json!("zz".repeat(64));
        assert!(decode_value(value.clone()).is_err());
        value["signature"] = json!("AB".repeat(64));
        assert!(decode_value(value).is_ok());
    }

    #[test]
    fn test_rejects_oversized_input() {
        let small = EnvelopeCodec::new(CodecConfig {
            max_envelope_bytes: 64,
        });
        let bytes = small.encode(&envelope());
        assert!(matches!(
            small.decode(&bytes),
            Err(CodecError::TooLarge { max: 64, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_timestamp_and_id() {
        let mut value: Value = serde_json::from_slice(&codec().encode(&envelope())).unwrap();
        value["created_at"] = json!("yesterday");
        assert!(matches!(
            decode_value(value.clone()),
            Err(CodecError::InvalidField { field: "created_at", .. })
        ));
        value["created_at"] = json!("2024-03-01T12:00:00Z");
        value["id"] = json!(7);
        assert!(matches!(
            decode_value(value),
            Err(CodecError::InvalidField { field: "id", .. })
        ));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            ".{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn arb_envelope() -> impl Strategy<Value = Envelope> {
        (
            any::<u128>(),
            "[a-z]{1,10}\\.example\\.edu",
            "[a-z]{1,10}\\.example\\.edu",
            prop::sample::select(MessageType::ALL.to_vec()),
            ".{0,20}",
            arb_json(),
            prop_oneof![Just(String::new()), "[0-9a-f]{128}"],
            0i64..4_000_000_000,
            0u32..1_000_000_000,
        )
            .prop_map(
                |(id, from, to, message_type, subject, payload, signature, secs, nanos)| Envelope {
                    id: MessageId(Uuid::from_u128(id)),
                    from,
                    to,
                    message_type,
                    subject,
                    payload,
                    signature,
                    created_at: Utc.timestamp_opt(secs, nanos).unwrap(),
                },
            )
    }

    proptest! {
        #[test]
        fn prop_decode_encode_roundtrip(env in arb_envelope()) {
            let decoded = codec().decode(&codec().encode(&env)).unwrap();
            prop_assert_eq!(decoded, env);
        }

        #[test]
        fn prop_encoding_is_deterministic(env in arb_envelope()) {
            let reparsed = codec().decode(&codec().encode(&env)).unwrap();
            prop_assert_eq!(codec().encode(&reparsed), codec().encode(&env));
            prop_assert_eq!(codec().signing_bytes(&reparsed), codec().signing_bytes(&env));
        }
    }
}
