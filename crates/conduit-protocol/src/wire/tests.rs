//! Unit tests for response tokens and bodies.

use rstest::rstest;

use super::*;

#[rstest]
#[case::ok(Status::Ok, b"SUC")]
#[case::error(Status::Error, b"ERR")]
fn status_tokens_are_three_bytes(#[case] status: Status, #[case] expected: &[u8; 3]) {
    assert_eq!(status.token(), expected);
    assert_eq!(Status::from_token(expected), Some(status));
}

#[rstest]
#[case::ack(b"ACK".as_slice())]
#[case::lowercase(b"suc".as_slice())]
#[case::short(b"SU".as_slice())]
fn rejects_unknown_status_tokens(#[case] token: &[u8]) {
    assert_eq!(Status::from_token(token), None);
}

#[test]
fn encodes_status_then_lines() {
    let response = Response::ok(["first", "second"]);
    assert_eq!(response.encode_body(), b"SUCfirst\nsecond\n");
}

#[test]
fn encodes_empty_payload_as_bare_status() {
    assert_eq!(Response::error(Vec::<String>::new()).encode_body(), b"ERR");
}

#[test]
fn does_not_double_existing_newlines() {
    let response = Response::error(["boom\n"]);
    assert_eq!(response.encode_body(), b"ERRboom\n");
}
