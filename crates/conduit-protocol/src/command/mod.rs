//! Command tokens and the rules that keep an encoded record on one line.
//!
//! The same checks run on both sides of the request channel: the client
//! refuses to publish an invalid command and the server re-validates every
//! record it reads, whatever the sender claimed to have checked.

use std::fmt;

use thiserror::Error;

/// Largest encoded record, trailing newline included, that one pipe write
/// delivers atomically (`PIPE_BUF` on Linux).
pub const MAX_RECORD_BYTES: usize = 4096;

/// A validated, non-empty sequence of command tokens.
///
/// The first token names the command; the rest are its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    tokens: Vec<String>,
}

impl Command {
    /// Validates `tokens` and builds a command from them.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the list is empty, a token is empty, or a
    /// token contains whitespace or a control character.
    pub fn new<I, S>(tokens: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collected: Vec<String> = tokens.into_iter().map(Into::into).collect();
        validate_tokens(&collected)?;
        Ok(Self { tokens: collected })
    }

    /// Name of the command.
    #[must_use]
    pub fn name(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    /// Arguments following the command name.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    /// Every token, command name first.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Consumes the command, returning its tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }
}

impl fmt::Display for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.tokens.join(" "))
    }
}

/// Checks every token of a prospective command.
///
/// # Errors
///
/// Returns the first [`CommandError`] found, scanning tokens in order.
pub fn validate_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<(), CommandError> {
    if tokens.is_empty() {
        return Err(CommandError::Empty);
    }
    for (index, token) in tokens.iter().enumerate() {
        validate_token(index, token.as_ref())?;
    }
    Ok(())
}

/// Checks a single token at position `index`.
///
/// # Errors
///
/// Returns [`CommandError::EmptyToken`] or
/// [`CommandError::DisallowedCharacter`].
pub fn validate_token(index: usize, token: &str) -> Result<(), CommandError> {
    if token.is_empty() {
        return Err(CommandError::EmptyToken { index });
    }
    if let Some(character) = token.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(CommandError::DisallowedCharacter {
            index,
            token: token.escape_debug().to_string(),
            character,
        });
    }
    Ok(())
}

/// Reasons a token sequence cannot travel as a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No tokens were supplied.
    #[error("a command needs at least one token")]
    Empty,
    /// A token was the empty string.
    #[error("token {index} is empty")]
    EmptyToken {
        /// Zero-based position of the token.
        index: usize,
    },
    /// A token contained whitespace or a control character.
    #[error("token {index} (\"{token}\") contains disallowed character {character:?}")]
    DisallowedCharacter {
        /// Zero-based position of the token.
        index: usize,
        /// The offending token, escaped for display.
        token: String,
        /// First disallowed character found.
        character: char,
    },
}

#[cfg(test)]
mod tests;
