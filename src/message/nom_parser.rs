//! Nom-based IRC message parser.
//!
//! This module provides zero-copy parsing of IRC lines into borrowed
//! components using the nom parser combinator library.

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, space0, space1},
    combinator::opt,
    error::{context, ErrorKind, VerboseError},
    sequence::{preceded, terminated},
    IResult,
};

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Parse message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        terminated(preceded(char(':'), take_while1(|c| c != ' ')), space1),
    )(input)
}

/// Parse the command token (verb or three-digit numeric).
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| !matches!(c, ' ' | ':' | '\r' | '\n')),
    )(input)
}

/// Split a parameter section into its middle part and the trailing
/// parameter, if any.
///
/// The trailing parameter is introduced by the first `:` that sits at the
/// start of the section or right after whitespace.
fn split_trailing(section: &str) -> (&str, Option<&str>) {
    if let Some(trailing) = section.strip_prefix(':') {
        return ("", Some(trailing));
    }

    let bytes = section.as_bytes();
    match bytes
        .windows(2)
        .position(|w| w[0].is_ascii_whitespace() && w[1] == b':')
    {
        Some(i) => (&section[..i], Some(&section[i + 2..])),
        None => (section, None),
    }
}

/// Parse a complete IRC message into its components.
///
/// IRC message format:
/// ```text
/// [:prefix] <command> [params...] [:trailing]
/// ```
pub fn parse_message(input: &str) -> ParseResult<&str, ParsedMessage<'_>> {
    let (input, _) = space0(input)?;

    let (input, prefix) = context("parsing optional prefix", opt(parse_prefix))(input)?;
    let (input, _) = space0(input)?;

    let (input, command) = context("parsing required command", parse_command)(input)?;

    let line = input.trim_end_matches(['\r', '\n']);
    let (middle, trailing) = split_trailing(line.trim_start());

    let mut params: Vec<&str> = middle.split_whitespace().collect();
    if let Some(trailing) = trailing {
        params.push(trailing);
    }

    Ok((
        "",
        ParsedMessage {
            prefix,
            command,
            params,
        },
    ))
}

/// A parsed IRC message with borrowed string slices.
///
/// This is the intermediate representation produced by the nom parser.
/// It holds references into the original input string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage<'a> {
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name.
    pub command: &'a str,
    /// Command parameters, including trailing.
    pub params: Vec<&'a str>,
}

impl<'a> ParsedMessage<'a> {
    /// Parse an IRC line into a `ParsedMessage`.
    ///
    /// Returns detailed error information for debugging failed parses.
    pub fn parse(input: &'a str) -> Result<Self, DetailedParseError> {
        match parse_message(input) {
            Ok((_remaining, msg)) => Ok(msg),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let mut context_info = None;
                let mut position = input.len();
                let mut kind = ErrorKind::Tag;

                for (error_input, error_kind) in &e.errors {
                    position = input.len() - error_input.len();
                    match error_kind {
                        nom::error::VerboseErrorKind::Context(ctx) => {
                            context_info = Some(*ctx);
                        }
                        nom::error::VerboseErrorKind::Nom(ek) => {
                            kind = *ek;
                        }
                        nom::error::VerboseErrorKind::Char(_) => {
                            kind = ErrorKind::Char;
                        }
                    }
                }

                Err(DetailedParseError {
                    input: input.to_string(),
                    position,
                    context: context_info,
                    kind,
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(DetailedParseError {
                input: input.to_string(),
                position: input.len(),
                context: Some("incomplete input"),
                kind: ErrorKind::Eof,
            }),
        }
    }
}

/// Detailed parse error with position and context information.
#[derive(Debug, Clone)]
pub struct DetailedParseError {
    /// The original input string that failed to parse.
    pub input: String,
    /// Byte position where parsing failed.
    pub position: usize,
    /// Context about what was being parsed when the error occurred.
    pub context: Option<&'static str>,
    /// The nom error kind.
    pub kind: ErrorKind,
}

impl std::fmt::Display for DetailedParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at position {}", self.position)?;
        if let Some(ctx) = self.context {
            write!(f, " while {}", ctx)?;
        }
        write!(f, ": {:?}", self.kind)
    }
}

impl std::error::Error for DetailedParseError {}
