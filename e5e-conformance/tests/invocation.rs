//! End-to-end invocations of the conformance runtime
//!
//! Each test starts the binary the way the platform does and checks stdout,
//! stderr and the exit status byte for byte.

#![cfg(unix)]

use std::ffi::OsStr;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::process::Command;

use e5e_core::{EXIT_FAILURE, EXIT_SUCCESS, EXIT_USER_ERROR, LOG_FILTER_VAR};
use serde_json::Value;
use tempfile::NamedTempFile;

struct Outcome {
    stdout: String,
    stderr: String,
    code: i32,
}

fn invoke_with<S: AsRef<OsStr>>(args: &[S], payload_source: Option<&str>) -> Outcome {
    let mut command = Command::new(env!("CARGO_BIN_EXE_e5e-conformance"));
    command.args(args).env_remove(LOG_FILTER_VAR);
    match payload_source {
        Some(source) => command.env("E5E_PAYLOAD_SOURCE", source),
        None => command.env_remove("E5E_PAYLOAD_SOURCE"),
    };

    let output = command.output().expect("failed to start e5e-conformance");
    Outcome {
        stdout: String::from_utf8(output.stdout).expect("stdout is UTF-8"),
        stderr: String::from_utf8(output.stderr).expect("stderr is UTF-8"),
        code: output.status.code().expect("terminated by signal"),
    }
}

fn invoke(args: &[&str]) -> Outcome {
    invoke_with(args, None)
}

/// Exit status as observed by the parent on Unix (low 8 bits).
fn status_of(code: i32) -> i32 {
    code & 0xff
}

fn payload_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create payload file");
    file.write_all(content.as_bytes()).expect("write payload file");
    file.flush().expect("flush payload file");
    file
}

#[test]
fn test_simple_entrypoint() {
    let outcome = invoke(&["SimpleEntrypoint", "{}", "{}"]);
    assert_eq!(outcome.stdout, r#"{"output":"","result":null}"#);
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.code, status_of(EXIT_SUCCESS));
}

#[test]
fn test_unknown_entrypoint() {
    let outcome = invoke(&["InvalidSimpleEntrypointt", "{}", "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "invalid entrypoint name");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_sum_entrypoint() {
    let outcome = invoke(&["SumEntrypoint", r#"{"data":{"a": 2, "b": 3}}"#, "{}"]);
    assert_eq!(outcome.stdout, r#"{"output":"","result":{"data":5}}"#);
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.code, status_of(EXIT_SUCCESS));
}

#[test]
fn test_print_stdout_entrypoint() {
    let outcome = invoke(&["PrintStdOutEntrypoint", "{}", "{}"]);
    assert_eq!(outcome.stdout, r#"{"output":"print","result":null}"#);
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.code, status_of(EXIT_SUCCESS));
}

#[test]
fn test_error_entrypoint() {
    let outcome = invoke(&["ErrorEntrypoint", "{}", "{}"]);
    assert_eq!(outcome.stdout, r#"{"output":"","result":null}"#);
    assert_eq!(outcome.stderr, "error");
    assert_eq!(outcome.code, status_of(EXIT_USER_ERROR));
}

#[test]
fn test_invalid_argument_count() {
    let outcome = invoke(&["SimpleEntrypoint"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "invalid number of process arguments");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));

    let outcome = invoke(&["SimpleEntrypoint", "{}", "{}", "{}"]);
    assert_eq!(outcome.stderr, "invalid number of process arguments");
}

#[test]
fn test_invalid_event() {
    let outcome = invoke(&["SimpleEntrypoint", "{...}", "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "cannot apply event object to 'Event' type");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_invalid_event_skips_entrypoint_side_effects() {
    let outcome = invoke(&["PrintStdOutEntrypoint", "{...}", "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "cannot apply event object to 'Event' type");
}

#[test]
fn test_invalid_event_names_user_type() {
    let outcome = invoke(&["SumEntrypoint", r#"{"data":{"a":"2"}}"#, "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "cannot apply event object to 'SumEvent' type");
}

#[test]
fn test_invalid_context() {
    let outcome = invoke(&["SimpleEntrypoint", "{}", "{...}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "cannot apply context object to 'Context' type");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_invalid_parameters_entrypoint() {
    let outcome = invoke(&["InvalidParametersEntrypoint", "{}", "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "invalid number of entrypoint parameters");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_invalid_return_entrypoint() {
    let outcome = invoke(&["InvalidReturnEntrypoint", "{}", "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "invalid number of entrypoint return values");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_invalid_return_value_entrypoint() {
    let outcome = invoke(&["InvalidReturnValueEntrypoint", "{}", "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "cannot marshal return value");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_invalid_error_return_value_entrypoint() {
    let outcome = invoke(&["InvalidErrorReturnValueEntrypoint", "{}", "{}"]);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "invalid error return value");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_large_output_is_captured_completely() {
    let bytes = 1 << 20;
    let event = format!(r#"{{"data":{{"bytes":{}}}}}"#, bytes);
    let outcome = invoke(&["FloodEntrypoint", &event, "{}"]);
    assert_eq!(outcome.code, status_of(EXIT_SUCCESS));

    let envelope: Value = serde_json::from_str(&outcome.stdout).unwrap();
    assert_eq!(envelope["output"].as_str().unwrap().len(), bytes);
    assert_eq!(envelope["result"], bytes);
}

#[test]
fn test_structured_return() {
    let event = r#"{"type":"request","params":{"q":["a","b"]},"request_headers":{"x-trace":"1"}}"#;
    let outcome = invoke(&["EchoEntrypoint", event, r#"{"async":true}"#]);
    assert_eq!(
        outcome.stdout,
        concat!(
            r#"{"output":"echo request\n","result":{"status":200,"#,
            r#""response_headers":{"x-trace":"1"},"#,
            r#""data":{"async":true,"params":{"q":["a","b"]}},"type":"echo"}}"#
        )
    );
    assert_eq!(outcome.code, status_of(EXIT_SUCCESS));
}

#[test]
fn test_file_payloads() {
    let event = payload_file(r#"{"data":{"a": 2, "b": 3}}"#);
    let context = payload_file("{}");
    let outcome = invoke_with(
        &[
            "SumEntrypoint",
            event.path().to_str().unwrap(),
            context.path().to_str().unwrap(),
        ],
        Some("file"),
    );
    assert_eq!(outcome.stdout, r#"{"output":"","result":{"data":5}}"#);
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.code, status_of(EXIT_SUCCESS));
}

#[test]
fn test_missing_event_file() {
    let context = payload_file("{}");
    let outcome = invoke_with(
        &["SimpleEntrypoint", "/invalid.input", context.path().to_str().unwrap()],
        Some("file"),
    );
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "cannot read event object file '/invalid.input'");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_missing_context_file() {
    let event = payload_file("{}");
    let outcome = invoke_with(
        &["SimpleEntrypoint", event.path().to_str().unwrap(), "/invalid.input"],
        Some("file"),
    );
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "cannot read context object file '/invalid.input'");
    assert_eq!(outcome.code, status_of(EXIT_FAILURE));
}

#[test]
fn test_file_payloads_from_non_utf8_paths() {
    let dir = tempfile::tempdir().expect("create payload directory");
    let event = dir.path().join(OsStr::from_bytes(b"event-\xff.json"));
    let context = dir.path().join(OsStr::from_bytes(b"context-\xfe.json"));
    std::fs::write(&event, r#"{"data":{"a": 2, "b": 3}}"#).unwrap();
    std::fs::write(&context, "{}").unwrap();

    let outcome = invoke_with(
        &[OsStr::new("SumEntrypoint"), event.as_os_str(), context.as_os_str()],
        Some("file"),
    );
    assert_eq!(outcome.stdout, r#"{"output":"","result":{"data":5}}"#);
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.code, status_of(EXIT_SUCCESS));
}
