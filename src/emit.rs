//! Reports and outputs produced from a [CompileResult]: the listing, the symbol and section map,
//! the hex dump and installation into a [Memory].

use itertools::Itertools;

use crate::arena::{Handle, StringArena};
use crate::compiler::{CompileResult, Section, DEFAULT_ORIGIN, RESET_VECTOR};
use crate::error::EmitError;
use crate::isa::AddrMode;
use crate::line::printer::le_word;
use crate::line::{print_line, InstructionLine, Line, LineStore};
use crate::memory::Memory;
use crate::symbol_table::{Role, SymbolInfo, Width};

/// Generated bytes shown on one listing row.
const LISTING_BYTES: usize = 4;

/// Bytes per hex dump row.
const DUMP_BYTES: usize = 16;

/// The bytes written when the reset vector has to be synthesized.
pub const RESET_BYTES: [u8; 2] = [DEFAULT_ORIGIN as u8, (DEFAULT_ORIGIN >> 8) as u8];

/// A code line together with its location and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placed {
    pub line: usize,
    pub address: u16,
    /// Index of the section the line belongs to.
    pub section: usize,
    pub bytes: Vec<u8>,
}

fn instruction_bytes(ins: &InstructionLine, address: u16, result: &CompileResult) -> Vec<u8> {
    let mode = match ins.mode() {
        Some(mode) => mode,
        None => return vec![ins.opcode],
    };

    let value = result.operand_value(ins).unwrap_or(0);

    match (mode, mode.bytes()) {
        (AddrMode::REL, _) if ins.abs_for_rel => {
            let displacement = value.wrapping_sub(address.wrapping_add(2));
            vec![ins.opcode, displacement as u8]
        }
        (_, 1) => vec![ins.opcode],
        (_, 2) => vec![ins.opcode, value as u8],
        _ => vec![ins.opcode, value as u8, (value >> 8) as u8],
    }
}

/// The bytes `line` generates when placed at `address`. Unresolved symbols encode as zero.
pub fn line_bytes(arena: &StringArena, line: &Line, address: u16, result: &CompileResult) -> Vec<u8> {
    match line {
        Line::Bytes { data, .. } | Line::Words { data, .. } => arena.get_raw(*data),
        Line::Instruction(ins) => instruction_bytes(ins, address, result),
        _ => Vec::new(),
    }
}

/// Every line that was assigned an address, in line order.
pub fn placed(arena: &StringArena, lines: &LineStore, result: &CompileResult) -> Vec<Placed> {
    let mut section = 0;
    let mut placed = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if let Line::Org { .. } = line {
            if let Some(opened) = result.section_opened_by(index) {
                section = opened;
            }
            continue;
        }

        let address = match result.addresses.get(index).copied().flatten() {
            Some(address) => address,
            None => continue,
        };

        placed.push(Placed {
            line: index,
            address,
            section,
            bytes: line_bytes(arena, line, address, result),
        });
    }

    placed
}

fn ensure_ok(result: &CompileResult) -> Result<(), EmitError> {
    if result.is_ok() {
        Ok(())
    } else {
        Err(EmitError::CompileErrors {
            errors: result.errors(),
        })
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X} ", b)).collect()
}

fn end_row(section: &Section) -> String {
    format!("{:04X} |             | end", section.end & 0xFFFF)
}

/// Address, generated bytes, line number and reconstructed source of every line.
pub fn listing(
    arena: &StringArena,
    lines: &LineStore,
    result: &CompileResult,
) -> Result<Vec<String>, EmitError> {
    ensure_ok(result)?;

    let mut rows = Vec::new();
    let mut current = 0;

    for (index, line) in lines.iter().enumerate() {
        if let Some(opened) = result.section_opened_by(index) {
            if let Some(section) = result.sections.get(current).filter(|s| !s.is_empty()) {
                rows.push(end_row(section));
            }

            current = opened;
        }

        let source = print_line(arena, line);

        let address = match result.addresses.get(index).copied().flatten() {
            Some(address) => address,
            None => {
                rows.push(format!("     |             | {:03X} {}", index, source));
                continue;
            }
        };

        let bytes = line_bytes(arena, line, address, result);
        let mut chunks = bytes.chunks(LISTING_BYTES);

        let first = chunks.next().unwrap_or(&[]);
        rows.push(format!(
            "{:04X} | {:<12}| {:03X} {}",
            address,
            hex_bytes(first),
            index,
            source
        ));

        for (n, chunk) in chunks.enumerate() {
            let offset = ((n + 1) * LISTING_BYTES) as u16;
            rows.push(format!(
                "{:04X} | {:<12}| more bytes",
                address.wrapping_add(offset),
                hex_bytes(chunk)
            ));
        }
    }

    if let Some(section) = result.sections.get(current).filter(|s| !s.is_empty()) {
        rows.push(end_row(section));
    }

    if result.synthesize_reset_vector {
        rows.push(format!(
            "{:04X} | {:<12}| implicit reset vector",
            RESET_VECTOR,
            hex_bytes(&RESET_BYTES)
        ));
    }

    Ok(rows)
}

fn map_text(arena: &StringArena, handle: Handle, info: &SymbolInfo) -> String {
    match info.role {
        Role::Bytes => arena
            .get_raw(handle)
            .iter()
            .map(|b| format!("{:02X}", b))
            .join(","),
        Role::Words => arena
            .get_raw(handle)
            .chunks(2)
            .map(|pair| format!("{:04X}", le_word(pair)))
            .join(","),
        _ => arena.get_str(handle),
    }
}

fn map_value(width: Width, value: Option<u16>) -> String {
    match (width, value) {
        (Width::Byte, Some(value)) => format!("{:02X}", value),
        (Width::Word, Some(value)) => format!("{:04X}", value),
        (_, None) => "?".to_string(),
    }
}

/// Symbol and section map. Informative, so it is available even when the compile had errors.
pub fn map(arena: &StringArena, result: &CompileResult) -> Vec<String> {
    let mut rows = vec!["slot line text     role  width ref value".to_string()];

    for (handle, info) in result.symbols.iter() {
        let (role, width, reference, value) = match info.role {
            Role::Comment => continue,
            Role::Definition => (
                "def",
                info.width.to_string(),
                if info.referenced { "yes" } else { "no" }.to_string(),
                map_value(info.width, Some(info.value)),
            ),
            Role::Use => (
                "use",
                info.width.to_string(),
                info.definition
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "??".to_string()),
                map_value(info.width, result.symbols.resolved_value(handle)),
            ),
            Role::Bytes => (".DB", "-".to_string(), "-".to_string(), "-".to_string()),
            Role::Words => (".DW", "-".to_string(), "-".to_string(), "-".to_string()),
        };

        rows.push(format!(
            "{}   {:03X}  {:<8} {:<5} {:<5} {:<3} {}",
            handle,
            info.line,
            map_text(arena, handle, info),
            role,
            width,
            reference,
            value
        ));
    }

    for (index, section) in result.sections.iter().enumerate() {
        let owner = match section.line {
            Some(line) => format!("line {:03X}", line),
            None => "implicit".to_string(),
        };

        let range = if section.is_empty() {
            format!("{:04X} empty", section.start)
        } else {
            format!("{:04X}-{:04X}", section.start, (section.end - 1) & 0xFFFF)
        };

        rows.push(format!("section {} {} {}", index, range, owner));
    }

    if result.synthesize_reset_vector {
        rows.push(format!("reset vector {:04X} synthesized", RESET_VECTOR));
    }

    rows
}

/// Hex dump of the generated bytes, sixteen per row. A new row starts at every section change and
/// address gap.
pub fn hex_dump(
    arena: &StringArena,
    lines: &LineStore,
    result: &CompileResult,
) -> Result<Vec<String>, EmitError> {
    ensure_ok(result)?;

    let mut rows = Vec::new();
    let mut row: Option<(u32, usize, Vec<u8>)> = None;

    let flush = |row: &mut Option<(u32, usize, Vec<u8>)>, rows: &mut Vec<String>| {
        if let Some((start, _, bytes)) = row.take() {
            rows.push(format!(
                "{:04X}: {}",
                start,
                bytes.iter().map(|b| format!("{:02X}", b)).join(" ")
            ));
        }
    };

    for placed in placed(arena, lines, result) {
        for (offset, byte) in placed.bytes.iter().enumerate() {
            let address = placed.address as u32 + offset as u32;

            let continues = match &row {
                Some((start, section, bytes)) => {
                    *section == placed.section
                        && bytes.len() < DUMP_BYTES
                        && start + bytes.len() as u32 == address
                }
                None => false,
            };

            if !continues {
                flush(&mut row, &mut rows);
                row = Some((address, placed.section, Vec::with_capacity(DUMP_BYTES)));
            }

            if let Some((_, _, bytes)) = row.as_mut() {
                bytes.push(*byte);
            }
        }
    }

    flush(&mut row, &mut rows);

    if result.synthesize_reset_vector {
        rows.push(format!(
            "{:04X}: {}",
            RESET_VECTOR,
            RESET_BYTES.iter().map(|b| format!("{:02X}", b)).join(" ")
        ));
    }

    Ok(rows)
}

/// Writes the program into `memory` and returns the number of bytes written.
pub fn install<M: Memory>(
    arena: &StringArena,
    lines: &LineStore,
    result: &CompileResult,
    memory: &mut M,
) -> Result<usize, EmitError> {
    ensure_ok(result)?;

    let mut written = 0;

    let mut write = |address: u16, byte: u8| {
        memory.write(address, byte).map_err(|err| EmitError::Memory {
            address,
            message: err.to_string(),
        })
    };

    for placed in placed(arena, lines, result) {
        for (offset, byte) in placed.bytes.iter().enumerate() {
            write(placed.address.wrapping_add(offset as u16), *byte)?;
            written += 1;
        }
    }

    if result.synthesize_reset_vector {
        for (offset, byte) in RESET_BYTES.iter().enumerate() {
            write(RESET_VECTOR + offset as u16, *byte)?;
            written += 1;
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::line::parse_line;

    fn build(arena: &mut StringArena, source: &[&str]) -> LineStore {
        let mut lines = LineStore::new(32);

        for text in source {
            let fields: Vec<&str> = text.split_whitespace().collect();
            let parsed = parse_line(arena, &fields).unwrap();
            lines.insert(lines.len(), parsed.line);
        }

        lines
    }

    const SIMPLE: &[&str] = &[".ORG 0200", "LDA #05", "STA 0300", ".ORG FFFC", ".DW 0200"];

    #[test]
    fn simple_listing() {
        let mut arena = StringArena::default();
        let lines = build(&mut arena, SIMPLE);
        let result = compile(&arena, &lines);

        let rows = listing(&arena, &lines, &result).unwrap();

        assert_eq!(
            rows,
            vec![
                "     |             | 000          .ORG 0200",
                "0200 | A9 05       | 001          LDA #05",
                "0202 | 8D 00 03    | 002          STA 0300",
                "0205 |             | end",
                "     |             | 003          .ORG FFFC",
                "FFFC | 00 02       | 004          .DW 0200",
                "0000 |             | end",
            ]
        );
    }

    #[test]
    fn empty_last_section_has_no_end_row() {
        let mut arena = StringArena::default();
        let lines = build(&mut arena, &[".ORG 0200", "NOP", ".ORG FFFC", ".DW 0200", ".ORG 0400"]);
        let result = compile(&arena, &lines);

        assert_eq!(result.errors(), 0);
        assert_eq!(result.warnings(), 1);

        let rows = listing(&arena, &lines, &result).unwrap();

        assert_eq!(
            rows,
            vec![
                "     |             | 000          .ORG 0200",
                "0200 | EA          | 001          NOP",
                "0201 |             | end",
                "     |             | 002          .ORG FFFC",
                "FFFC | 00 02       | 003          .DW 0200",
                "0000 |             | end",
                "     |             | 004          .ORG 0400",
            ]
        );
    }

    #[test]
    fn continuation_and_reset_rows() {
        let mut arena = StringArena::default();
        let lines = build(&mut arena, &["tbl .DB 1,2,3,4,5,6"]);
        let result = compile(&arena, &lines);

        // Only warnings: missing .ORG, unused label, missing reset vector.
        assert_eq!(result.errors(), 0);

        let rows = listing(&arena, &lines, &result).unwrap();

        assert_eq!(
            rows,
            vec![
                "0200 | 01 02 03 04 | 000 tbl      .DB 01,02,03,04,05,06",
                "0204 | 05 06       | more bytes",
                "0206 |             | end",
                "FFFC | 00 02       | implicit reset vector",
            ]
        );
    }

    #[test]
    fn branch_encoding() {
        let mut arena = StringArena::default();
        let lines = build(&mut arena, &[
            ".ORG 0200",
            "loop DEX",
            "BNE loop",
            "BEQ +02",
            ".ORG FFFC",
            ".DW 0200",
        ]);
        let result = compile(&arena, &lines);
        let placed = placed(&arena, &lines, &result);

        assert_eq!(placed[0].bytes, vec![0xCA]);
        assert_eq!(placed[1].bytes, vec![0xD0, 0xFD]);
        assert_eq!(placed[2].bytes, vec![0xF0, 0x02]);
        assert_eq!(placed[3].section, 2);
    }

    #[test]
    fn dump_rows_restart_at_sections() {
        let mut arena = StringArena::default();
        let lines = build(&mut arena, &[
            ".ORG 0200",
            ".DB 0,1,2,3,4,5,6",
            ".DB 7,8,9,A,B,C,D",
            ".DB E,F,10",
            ".ORG 0213",
            "NOP",
        ]);
        let result = compile(&arena, &lines);

        let rows = hex_dump(&arena, &lines, &result).unwrap();

        assert_eq!(
            rows,
            vec![
                "0200: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F",
                "0210: 10",
                "0213: EA",
                "FFFC: 00 02",
            ]
        );
    }

    #[test]
    fn refused_with_errors() {
        let mut arena = StringArena::default();
        let lines = build(&mut arena, &["JMP nowhere"]);
        let result = compile(&arena, &lines);
        let mut memory = vec![0u8; 0x10000];

        assert_eq!(
            listing(&arena, &lines, &result),
            Err(EmitError::CompileErrors { errors: 1 })
        );
        assert!(install(&arena, &lines, &result, &mut memory).is_err());
        assert!(memory.iter().all(|b| *b == 0));
        assert!(!map(&arena, &result).is_empty());
    }

    #[test]
    fn map_rows() {
        let mut arena = StringArena::default();
        let lines = build(&mut arena, &["cnt .EB 07", "LDA #cnt", "tbl .DW 1234"]);
        let result = compile(&arena, &lines);

        let rows = map(&arena, &result);

        assert_eq!(rows[0], "slot line text     role  width ref value");
        assert_eq!(rows[1], "01   000  cnt      def   byte  yes 07");
        assert_eq!(rows[2], "02   001  cnt      use   byte  01  07");
        assert_eq!(rows[3], "03   002  tbl      def   word  no  0202");
        assert_eq!(rows[4], "04   002  1234     .DW   -     -   -");
        assert_eq!(rows[5], "section 0 0200-0203 implicit");
        assert_eq!(rows[6], "reset vector FFFC synthesized");
    }
}
