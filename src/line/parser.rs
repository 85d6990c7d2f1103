//! Parser from whitespace separated fields to [Line] records.
//!
//! Accepted shapes:
//!
//! ```text
//! ; comment text
//! [LABEL] .PRAGMA [OPERAND]
//! [LABEL] MNEMONIC [OPERAND]
//! ```
//!
//! A failed parse leaves the arena as it found it: any slot allocated for the line is released
//! before the error is returned.

use crate::arena::{Handle, StringArena, MAX_RAW_SIZE, SLOT_SIZE};
use crate::error::{ErrorExt, ParseError, ParseErrorKind};
use crate::isa::{self, AddrMode, Mnemonic};
use crate::parsing::{looks_like_hex, parse_hex, parse_hex_list};

use super::token::{tokenize, Token};
use super::{InstructionLine, Line, Operand, COMMENT_SLOTS};

/// Register names, which may not be used as labels.
const REGISTERS: &[&str] = &["A", "X", "Y", "S", "PC", "PCL", "PCH", "PSR", "SR"];

/// A successfully parsed line. The caller owns the arena slots of `line`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub line: Line,
    /// Non-fatal remarks, such as a truncated comment.
    pub warnings: Vec<String>,
}

impl Parsed {
    fn new(line: Line) -> Parsed {
        Parsed {
            line,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pragma {
    Org,
    Bytes,
    Words,
    EqByte,
    EqWord,
}

impl Pragma {
    fn find(name: &str) -> Option<Pragma> {
        match name.to_ascii_uppercase().as_str() {
            ".ORG" => Some(Pragma::Org),
            ".DB" | ".BYTES" => Some(Pragma::Bytes),
            ".DW" | ".WORDS" => Some(Pragma::Words),
            ".EB" | ".EQBYTE" => Some(Pragma::EqByte),
            ".EW" | ".EQWORD" => Some(Pragma::EqWord),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Pragma::Org => ".ORG",
            Pragma::Bytes => ".DB",
            Pragma::Words => ".DW",
            Pragma::EqByte => ".EB",
            Pragma::EqWord => ".EW",
        }
    }
}

/// Identifier syntax: letters, digits and `_`, where digits may only follow a letter or `_`.
pub fn is_label(text: &str) -> bool {
    let mut chars = text.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Mnemonics, addressing mode names, register names and anything made of hex digits.
pub fn is_reserved(text: &str) -> bool {
    Mnemonic::find(text).is_some()
        || AddrMode::find(text).is_some()
        || REGISTERS.iter().any(|r| r.eq_ignore_ascii_case(text))
        || looks_like_hex(text)
}

fn is_pragma(field: &str) -> bool {
    field.starts_with('.')
}

fn unknown_instruction(name: &str) -> ParseError {
    ParseError::new(ParseErrorKind::UnknownInstruction {
        name: name.to_string(),
        suggestion: isa::suggest(name),
    })
}

/// Parses the fields of one program line.
pub fn parse_line<S: AsRef<str>>(
    arena: &mut StringArena,
    fields: &[S],
) -> Result<Parsed, ParseError> {
    let fields: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();

    let first = match fields.first() {
        Some(first) => *first,
        None => return Err(ParseErrorKind::EmptyLine.into()),
    };

    if first.starts_with(';') {
        if first != ";" {
            return Err(ParseErrorKind::CommentSpacing.into());
        }

        return Ok(parse_comment(arena, &fields[1..]));
    }

    match fields.as_slice() {
        [pragma] if is_pragma(pragma) => parse_pragma(arena, None, pragma, None),
        [name] => match Mnemonic::find(name) {
            Some(mnemonic) => parse_instruction(arena, None, mnemonic, None),
            None => Err(unknown_instruction(name)),
        },
        [pragma, operand] if is_pragma(pragma) => {
            parse_pragma(arena, None, pragma, Some(*operand))
        }
        [label, pragma] if is_pragma(pragma) => parse_pragma(arena, Some(*label), pragma, None),
        [first, second] => {
            if let Some(mnemonic) = Mnemonic::find(first) {
                parse_instruction(arena, None, mnemonic, Some(*second))
            } else if let Some(mnemonic) = Mnemonic::find(second) {
                parse_instruction(arena, Some(*first), mnemonic, None)
            } else if isa::suggest(first).is_some() {
                Err(unknown_instruction(first))
            } else {
                Err(unknown_instruction(second))
            }
        }
        [label, pragma, operand] if is_pragma(pragma) => {
            parse_pragma(arena, Some(*label), pragma, Some(*operand))
        }
        [label, name, operand] => match Mnemonic::find(name) {
            Some(mnemonic) => parse_instruction(arena, Some(*label), mnemonic, Some(*operand)),
            None => Err(unknown_instruction(name)),
        },
        _ => Err(ParseErrorKind::TooManyFields.into()),
    }
}

/// Comments never fail: text that does not fit is dropped with a warning.
fn parse_comment(arena: &mut StringArena, words: &[&str]) -> Parsed {
    let text = words.join(" ");
    let mut chunks = Vec::new();
    let mut warnings = Vec::new();

    for (index, chunk) in text.as_bytes().chunks(SLOT_SIZE).enumerate() {
        if index == COMMENT_SLOTS {
            warnings.push("comment truncated (line too long)".to_string());
            break;
        }

        match arena.alloc(chunk) {
            Ok(handle) => chunks.push(handle),
            Err(err) => {
                warnings.push(format!("comment truncated ({})", err));
                break;
            }
        }
    }

    Parsed {
        line: Line::Comment { text: chunks },
        warnings,
    }
}

fn alloc_label(arena: &mut StringArena, label: Option<&str>) -> Result<Option<Handle>, ParseError> {
    let label = match label {
        Some(label) => label,
        None => return Ok(None),
    };

    if is_reserved(label) {
        return Err(ParseError::new(ParseErrorKind::ReservedWord(label.to_string())))
            .context("label");
    }

    if !is_label(label) {
        return Err(ParseError::new(ParseErrorKind::LabelSyntax(label.to_string())))
            .context("label");
    }

    arena
        .alloc(label.as_bytes())
        .map(Some)
        .map_err(ParseError::from)
        .context("label")
}

fn parse_word(text: &str) -> Result<u16, ParseError> {
    parse_hex(text).map_err(|_| ParseErrorKind::WordRange.into())
}

fn parse_byte(text: &str) -> Result<u8, ParseError> {
    match parse_hex(text) {
        Ok(value) if value <= 0xFF => Ok(value as u8),
        _ => Err(ParseErrorKind::ByteRange.into()),
    }
}

fn parse_pragma(
    arena: &mut StringArena,
    label: Option<&str>,
    name: &str,
    operand: Option<&str>,
) -> Result<Parsed, ParseError> {
    let pragma = match Pragma::find(name) {
        Some(pragma) => pragma,
        None => return Err(ParseErrorKind::UnknownPragma(name.to_string()).into()),
    };

    let label = alloc_label(arena, label).context(pragma.name())?;
    let result = pragma_line(arena, pragma, label, operand);

    if result.is_err() {
        arena.free_opt(label);
    }

    result.context(pragma.name())
}

fn pragma_line(
    arena: &mut StringArena,
    pragma: Pragma,
    label: Option<Handle>,
    operand: Option<&str>,
) -> Result<Parsed, ParseError> {
    let operand = operand.ok_or_else(|| ParseError::new(ParseErrorKind::OperandMissing))?;

    match pragma {
        Pragma::Org => {
            let address = parse_word(operand).context("address")?;
            let mut parsed = Parsed::new(Line::Org { address });

            if label.is_some() {
                arena.free_opt(label);
                parsed.warnings.push(".ORG: no label expected".to_string());
            }

            Ok(parsed)
        }
        Pragma::Bytes => {
            let values = parse_hex_list(operand)
                .map_err(|_| ParseError::new(ParseErrorKind::ByteRange))
                .context("values")?;

            let mut bytes = Vec::with_capacity(values.len());

            for (index, value) in values.iter().enumerate() {
                if *value > 0xFF {
                    return Err(ParseError::new(ParseErrorKind::ByteRange))
                        .context(format!("byte {}", index + 1));
                }

                bytes.push(*value as u8);
            }

            if bytes.len() > MAX_RAW_SIZE {
                return Err(ParseErrorKind::TooManyValues { max: MAX_RAW_SIZE }.into());
            }

            let data = arena.alloc_raw(&bytes).map_err(ParseError::from).context("bytes")?;

            Ok(Parsed::new(Line::Bytes { label, data }))
        }
        Pragma::Words => {
            let words = parse_hex_list(operand)
                .map_err(|_| ParseError::new(ParseErrorKind::WordRange))
                .context("values")?;

            if words.len() * 2 > MAX_RAW_SIZE {
                return Err(ParseErrorKind::TooManyValues { max: MAX_RAW_SIZE / 2 }.into());
            }

            let mut bytes = Vec::with_capacity(words.len() * 2);

            for word in words {
                bytes.push(word as u8);
                bytes.push((word >> 8) as u8);
            }

            let data = arena.alloc_raw(&bytes).map_err(ParseError::from).context("words")?;

            Ok(Parsed::new(Line::Words { label, data }))
        }
        Pragma::EqByte => {
            let label = label.ok_or_else(|| ParseError::new(ParseErrorKind::LabelMissing))?;
            let value = parse_byte(operand).context("value")?;

            Ok(Parsed::new(Line::EqByte { label, value }))
        }
        Pragma::EqWord => {
            let label = label.ok_or_else(|| ParseError::new(ParseErrorKind::LabelMissing))?;
            let value = parse_word(operand).context("value")?;

            Ok(Parsed::new(Line::EqWord { label, value }))
        }
    }
}

fn index_mode(register: &str, x: Option<AddrMode>, y: Option<AddrMode>) -> Option<AddrMode> {
    if register.eq_ignore_ascii_case("X") {
        x
    } else if register.eq_ignore_ascii_case("Y") {
        y
    } else {
        None
    }
}

/// Determines the addressing mode from the operand syntax and isolates the operand value.
fn match_operand<'a>(tokens: &[Token<'a>]) -> Option<(AddrMode, Option<&'a str>)> {
    use Token::*;

    let (mode, value) = match tokens {
        [] => (Some(AddrMode::IMP), None),
        [Word(a)] if a.eq_ignore_ascii_case("A") => (Some(AddrMode::ACC), None),
        [Word(w)] => (Some(AddrMode::ABS), Some(*w)),
        [Word(w), IndexSeparator, Word(r)] => {
            (index_mode(r, Some(AddrMode::ABX), Some(AddrMode::ABY)), Some(*w))
        }
        [Immediate, Word(w)] => (Some(AddrMode::IMM), Some(*w)),
        [ZeroPage, Word(w)] => (Some(AddrMode::ZPG), Some(*w)),
        [ZeroPage, Word(w), IndexSeparator, Word(r)] => {
            (index_mode(r, Some(AddrMode::ZPX), Some(AddrMode::ZPY)), Some(*w))
        }
        [Relative, Word(w)] => (Some(AddrMode::REL), Some(*w)),
        [IndirectBegin, Word(w), IndirectEnd] => (Some(AddrMode::IND), Some(*w)),
        [IndirectBegin, Word(w), IndexSeparator, Word(r), IndirectEnd] => {
            (index_mode(r, Some(AddrMode::ZXI), None), Some(*w))
        }
        [IndirectBegin, Word(w), IndirectEnd, IndexSeparator, Word(r)] => {
            (index_mode(r, None, Some(AddrMode::ZIY)), Some(*w))
        }
        _ => return None,
    };

    mode.map(|mode| (mode, value))
}

fn parse_instruction(
    arena: &mut StringArena,
    label: Option<&str>,
    mnemonic: Mnemonic,
    operand: Option<&str>,
) -> Result<Parsed, ParseError> {
    let label = alloc_label(arena, label).context(mnemonic.name())?;
    let result = instruction_line(arena, label, mnemonic, operand.unwrap_or(""));

    if result.is_err() {
        arena.free_opt(label);
    }

    result.context(mnemonic.name())
}

fn instruction_line(
    arena: &mut StringArena,
    label: Option<Handle>,
    mnemonic: Mnemonic,
    operand: &str,
) -> Result<Parsed, ParseError> {
    let syntax_error = || ParseError::new(ParseErrorKind::OperandSyntax(operand.to_string()));

    let tokens = tokenize(operand).ok_or_else(syntax_error)?;
    let (mut mode, value) = match_operand(&tokens).ok_or_else(syntax_error)?;

    let mut abs_for_rel = false;

    if mode == AddrMode::ABS && mnemonic.has_mode(AddrMode::REL) {
        abs_for_rel = true;
        mode = AddrMode::REL;
    }

    let opcode = mnemonic
        .opcode(mode)
        .ok_or_else(|| ParseError::new(ParseErrorKind::AddressingMode { mnemonic, mode }))?;

    let byte_operand = mode.is_byte_operand() && !abs_for_rel;

    let operand = match value {
        None => Operand::None,
        Some(text) if looks_like_hex(text) => {
            let value = if byte_operand {
                parse_byte(text).map(u16::from)
            } else {
                parse_word(text)
            };

            Operand::Literal(value.context("operand")?)
        }
        Some(text) => {
            if !is_label(text) {
                return Err(ParseError::new(ParseErrorKind::LabelSyntax(text.to_string())))
                    .context("operand");
            }

            if is_reserved(text) {
                return Err(ParseError::new(ParseErrorKind::ReservedWord(text.to_string())))
                    .context("operand");
            }

            let symbol = arena
                .alloc(text.as_bytes())
                .map_err(ParseError::from)
                .context("operand")?;

            Operand::Symbol(symbol)
        }
    };

    Ok(Parsed::new(Line::Instruction(InstructionLine {
        label,
        opcode,
        operand,
        abs_for_rel,
    })))
}
