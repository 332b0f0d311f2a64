/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for logpattern using pattern fixtures.
 */

use chrono::{DateTime, FixedOffset, TimeDelta};
use logpattern::{
    Caller, EncoderConfig, EncoderRegistry, Field, Level, LogbackEncoder, ObjectEncoder,
    ObjectMarshaler, Record,
};
use pretty_assertions::assert_eq;
use std::path::Path;

/// Helper to load a pattern from fixtures
fn load_pattern(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test-fixtures")
        .join(name);
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to load pattern: {}", name));
    source.trim_end_matches('\n').to_string()
}

/// Config that leaves the line terminator off, so snapshots stay on one line.
fn no_newline() -> EncoderConfig {
    EncoderConfig {
        skip_line_ending: true,
        ..EncoderConfig::production()
    }
}

fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

fn render(encoder: &LogbackEncoder, record: &Record, fields: &[Field]) -> String {
    encoder
        .encode_entry(record, fields)
        .unwrap()
        .to_string_lossy()
}

struct Peer {
    addr: &'static str,
    port: u16,
}

impl ObjectMarshaler for Peer {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> logpattern::EncodeResult<()> {
        enc.add_string("addr", self.addr);
        enc.add_uint16("port", self.port);
        Ok(())
    }
}

#[test]
fn test_access_log_pattern() {
    let encoder = LogbackEncoder::new(no_newline(), &load_pattern("access.pattern"));
    let record = Record::new(Level::Warn, "request served")
        .with_time(at("2024-06-01T12:30:00+02:00"))
        .with_logger_name("http");
    let fields = [
        Field::string("method", "GET"),
        Field::string("path", "/api/items"),
        Field::int64("status", 503),
        Field::duration("took", TimeDelta::milliseconds(12)),
        Field::object("peer", Peer {
            addr: "10.0.0.7",
            port: 8443,
        }),
    ];

    insta::assert_snapshot!(
        render(&encoder, &record, &fields),
        @r#"2024-06-01T12:30:00+0200 [WARN] http GET /api/items -> 503 {"took": 0.012, "peer": {"addr": "10.0.0.7", "port": 8443}}"#
    );
}

#[test]
fn test_unknown_tokens_are_kept() {
    let encoder = LogbackEncoder::new(no_newline(), &load_pattern("unknown-tokens.pattern"));
    let record = Record::new(Level::Info, "started");

    insta::assert_snapshot!(render(&encoder, &record, &[]), @"%thread [info] started%n");
}

#[test]
fn test_optional_field_references() {
    let encoder = LogbackEncoder::new(no_newline(), &load_pattern("trace.pattern"));
    let record = Record::new(Level::Info, "work");

    let both = [Field::string("trace", "t1"), Field::string("span", "s9")];
    assert_eq!(render(&encoder, &record, &both), "trace=t1 span=s9 work");

    let trace_only = [Field::string("trace", "t1")];
    assert_eq!(render(&encoder, &record, &trace_only), "trace=t1 work");

    assert_eq!(render(&encoder, &record, &[]), "work");
}

#[test]
fn test_registry_with_context_fields() {
    let mut registry = EncoderRegistry::new();
    registry.register("", "").unwrap();
    registry
        .register("compact", "%level{upper} %message %fields")
        .unwrap();

    let service = registry
        .build("compact", no_newline())
        .unwrap()
        .with_fields(&[Field::string("service", "billing"), Field::namespace("req")])
        .unwrap();

    let record = Record::new(Level::Error, "charge failed");
    let fields = [Field::string("card", "visa"), Field::int64("cents", 1299)];

    insta::assert_snapshot!(
        render(&service, &record, &fields),
        @r#"ERROR charge failed {"card": "visa", "cents": 1299}, "service": "billing", "req": {}"#
    );
}

#[test]
fn test_default_registered_pattern() {
    let mut registry = EncoderRegistry::new();
    registry.register("", "").unwrap();

    let encoder = registry.build("", EncoderConfig::production()).unwrap();
    let record = Record::new(Level::Debug, "cache miss")
        .with_time(at("2024-02-29T23:59:59.999999999Z"))
        .with_caller(Caller::new("/src/cache/lru.rs", 17));
    let line = render(&encoder, &record, &[Field::string("key", "user:1")]);

    assert_eq!(
        line,
        "2024-02-29 23:59:59.999 DEBUG cache/lru.rs:17 cache miss {\"key\": \"user:1\"}\n"
    );
}

#[test]
fn test_config_from_json() {
    let config: EncoderConfig = serde_json::from_str(
        r#"{
            "timeKey": "",
            "levelEncoder": "capital",
            "skipLineEnding": true
        }"#,
    )
    .unwrap();
    let encoder = LogbackEncoder::new(config, "[%date] %level %message");
    let record = Record::new(Level::Info, "boot").with_time(at("2024-01-01T00:00:00Z"));

    assert_eq!(render(&encoder, &record, &[]), "[] INFO boot");
}

#[test]
fn test_lines_are_valid_json_after_prefix() {
    let encoder = LogbackEncoder::new(no_newline(), "%message|%fields");
    let fields = [
        Field::string("quote", "say \"hi\"\n"),
        Field::float64("nan", f64::NAN),
        Field::byte_string("bytes", b"\xc3\x28ok".to_vec()),
        Field::reflected("tags", vec!["a", "b"]),
        Field::null("none"),
        Field::namespace("nested"),
        Field::bool("deep", true),
    ];
    let line = render(&encoder, &Record::new(Level::Info, "m"), &fields);
    let (_, object) = line.split_once('|').unwrap();

    let value: serde_json::Value = serde_json::from_str(object).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "quote": "say \"hi\"\n",
            "nan": "NaN",
            "bytes": "\u{fffd}(ok",
            "tags": ["a", "b"],
            "none": null,
            "nested": {"deep": true}
        })
    );
}
