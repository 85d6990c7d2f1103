//! Hex number parsers shared by the line parser and the command surface.

use nom::{
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::{all_consuming, map_res},
    multi::separated_nonempty_list,
    IResult,
};

use crate::error::{ParseError, ParseErrorKind};

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn hex_number(input: &str) -> IResult<&str, u16, ParseError> {
    map_res(take_while_m_n(1, 4, is_hex_digit), |digits: &str| {
        u16::from_str_radix(digits, 16)
    })(input)
}

fn comma(input: &str) -> IResult<&str, char, ParseError> {
    char(',')(input)
}

fn hex_list(input: &str) -> IResult<&str, Vec<u16>, ParseError> {
    separated_nonempty_list(comma, hex_number)(input)
}

fn finish<T>(result: IResult<&str, T, ParseError>) -> Result<T, ParseError> {
    match result {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => Err(err),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new(ParseErrorKind::Nom(
            nom::error::ErrorKind::Eof,
        ))),
    }
}

/// Parses 1 to 4 hex digits, in either case, without prefix.
pub fn parse_hex(text: &str) -> Result<u16, ParseError> {
    finish(all_consuming(hex_number)(text))
}

/// Parses a comma separated list of hex numbers, as in `01,2,FF`.
pub fn parse_hex_list(text: &str) -> Result<Vec<u16>, ParseError> {
    finish(all_consuming(hex_list)(text))
}

/// Returns `true` if `text` is a non-empty run of hex digits, of any length.
pub fn looks_like_hex(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_hex_digit)
}
