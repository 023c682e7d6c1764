//! Unit tests for command validation.

use rstest::rstest;

use super::*;

#[test]
fn splits_name_from_arguments() {
    let command = Command::new(["echo", "hello", "world"]).expect("valid command");
    assert_eq!(command.name(), "echo");
    assert_eq!(command.arguments(), ["hello", "world"]);
    assert_eq!(command.to_string(), "echo hello world");
}

#[test]
fn single_token_has_no_arguments() {
    let command = Command::new(["ping"]).expect("valid command");
    assert!(command.arguments().is_empty());
}

#[test]
fn rejects_empty_token_list() {
    let tokens: [&str; 0] = [];
    assert_eq!(Command::new(tokens), Err(CommandError::Empty));
}

#[test]
fn rejects_empty_token() {
    assert_eq!(
        Command::new(["echo", ""]),
        Err(CommandError::EmptyToken { index: 1 })
    );
}

#[rstest]
#[case::newline("line\nbreak", '\n')]
#[case::space("two words", ' ')]
#[case::tab("tab\tbed", '\t')]
#[case::nul("nul\0byte", '\0')]
#[case::escape("esc\u{1b}[0m", '\u{1b}')]
#[case::non_breaking_space("no\u{a0}break", '\u{a0}')]
fn rejects_disallowed_characters(#[case] token: &str, #[case] expected: char) {
    let error = Command::new(["run", token]).expect_err("token must be rejected");
    match error {
        CommandError::DisallowedCharacter {
            index, character, ..
        } => {
            assert_eq!(index, 1);
            assert_eq!(character, expected);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case::dash_prefixed("-neE")]
#[case::unicode("héllo")]
#[case::punctuation("a=b;c|d")]
fn accepts_printable_tokens(#[case] token: &str) {
    assert!(Command::new(["echo", token]).is_ok());
}
