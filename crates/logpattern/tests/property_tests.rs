/*
 * property_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Generated-input tests for escaping, field selection, literal text and
 * namespace balance.
 */

use logpattern::escape::{append_escaped_bytes, append_escaped_str};
use logpattern::{
    EncodeError, EncodeResult, EncoderConfig, Field, Level, LogbackEncoder, ObjectEncoder,
    ObjectMarshaler, Record,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// Helpers
// =============================================================================

fn no_newline() -> EncoderConfig {
    EncoderConfig {
        skip_line_ending: true,
        ..EncoderConfig::production()
    }
}

fn render(encoder: &LogbackEncoder, message: &str, fields: &[Field]) -> String {
    encoder
        .encode_entry(&Record::new(Level::Info, message), fields)
        .unwrap()
        .to_string_lossy()
}

fn quoted(escaped: Vec<u8>) -> String {
    let mut json = Vec::with_capacity(escaped.len() + 2);
    json.push(b'"');
    json.extend_from_slice(&escaped);
    json.push(b'"');
    String::from_utf8(json).expect("escaped output is UTF-8")
}

/// Opens `depth` namespaces, adds a value, and optionally fails.
struct Nested {
    depth: usize,
    fail: bool,
}

impl ObjectMarshaler for Nested {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> EncodeResult<()> {
        for level in 0..self.depth {
            enc.open_namespace(&format!("ns{level}"));
        }
        enc.add_int64("v", 1);
        if self.fail {
            return Err(EncodeError::marshal("nested failure"));
        }
        Ok(())
    }
}

fn gen_key() -> impl Strategy<Value = String> {
    "[a-z]{1,4}"
}

fn gen_field() -> impl Strategy<Value = Field> {
    prop_oneof![
        gen_key().prop_map(Field::namespace),
        (gen_key(), any::<i64>()).prop_map(|(k, v)| Field::int64(k, v)),
        (gen_key(), any::<String>()).prop_map(|(k, v)| Field::string(k, v)),
        (gen_key(), any::<f64>()).prop_map(|(k, v)| Field::float64(k, v)),
        (gen_key(), 0usize..3, any::<bool>())
            .prop_map(|(k, depth, fail)| Field::object(k, Nested { depth, fail })),
    ]
}

// =============================================================================
// Escaping
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Escaped text, once quoted, decodes back to the original
    #[test]
    fn test_escaped_str_roundtrips_through_json(s in any::<String>()) {
        let mut out = Vec::new();
        append_escaped_str(&mut out, &s);
        let decoded: String = serde_json::from_str(&quoted(out)).unwrap();
        prop_assert_eq!(decoded, s);
    }

    /// Arbitrary bytes always escape to a valid JSON string; valid UTF-8
    /// decodes back unchanged
    #[test]
    fn test_escaped_bytes_are_valid_json(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut out = Vec::new();
        append_escaped_bytes(&mut out, &bytes);
        let decoded: String = serde_json::from_str(&quoted(out)).unwrap();
        if let Ok(text) = std::str::from_utf8(&bytes) {
            prop_assert_eq!(decoded.as_str(), text);
        }
    }
}

// =============================================================================
// Field selection
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The remainder object holds exactly the keys no `%x` reference names
    #[test]
    fn test_remainder_is_all_minus_consumed(
        fields in proptest::collection::vec(("[a-e]", "[a-z0-9 \"\\\\]{0,8}"), 0..8),
        referenced in proptest::collection::btree_set("[a-e]", 0..4),
    ) {
        let references: String = referenced.iter().map(|name| format!("%x{{{name}}}")).collect();
        let encoder = LogbackEncoder::new(no_newline(), &format!("{references}|%fields"));
        let fields: Vec<Field> = fields
            .iter()
            .map(|(k, v)| Field::string(k.as_str(), v.as_str()))
            .collect();

        let line = render(&encoder, "m", &fields);
        let (_, remainder) = line.split_once('|').unwrap();
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(remainder).unwrap();

        let rendered: BTreeSet<String> = object.keys().cloned().collect();
        let expected: BTreeSet<String> = fields
            .iter()
            .map(|f| f.key.clone())
            .filter(|k| !referenced.contains(k))
            .collect();
        prop_assert_eq!(rendered, expected);
    }
}

// =============================================================================
// Literal text
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A pattern without tokens renders as itself plus the line ending
    #[test]
    fn test_literal_pattern_renders_verbatim(
        text in "[^%]{0,40}(% [^%]{0,10}){0,3}%?",
        fields in proptest::collection::vec(gen_field(), 0..4),
    ) {
        let encoder = LogbackEncoder::new(EncoderConfig::production(), &text);
        let line = render(&encoder, "ignored", &fields);
        prop_assert_eq!(line, format!("{text}\n"));
    }
}

// =============================================================================
// Namespace balance
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Namespaces and nested objects inside `%fields` always close
    #[test]
    fn test_remainder_is_balanced_json(fields in proptest::collection::vec(gen_field(), 0..10)) {
        let encoder = LogbackEncoder::new(no_newline(), "%fields");
        let line = render(&encoder, "m", &fields);
        prop_assert!(
            serde_json::from_str::<serde_json::Value>(&line).is_ok(),
            "not balanced JSON: {line}"
        );
    }

    /// Namespaces left open by context fields are closed when each line ends
    #[test]
    fn test_context_namespaces_are_closed(
        context in proptest::collection::vec(gen_field(), 0..6),
        fields in proptest::collection::vec(gen_field(), 0..4),
    ) {
        let encoder = LogbackEncoder::new(no_newline(), "%message")
            .with_fields(&context)
            .unwrap();
        // The message opens an object; the test closes it after the line.
        let line = format!("{}}}", render(&encoder, "{", &fields));
        prop_assert!(
            serde_json::from_str::<serde_json::Value>(&line).is_ok(),
            "not balanced JSON: {line}"
        );
    }
}
