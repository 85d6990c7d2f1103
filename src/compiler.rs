//! Compilation of the line store.
//!
//! The compiler never modifies the program. It runs five passes over the lines and the string
//! arena and collects everything it learns in a [CompileResult]:
//!
//! 1. Address assignment, sectioning and collection of label definitions and uses.
//! 2. Symbol resolution: every definition and use is linked to the first definition, in line
//!    order, with the same name.
//! 3. Symbol consistency: undefined symbols, byte/word mismatches, duplicates and unused labels.
//! 4. Instruction checks: branch range, page crossing and zero page suggestions.
//! 5. Section checks: overlap, empty sections and the reset vector.
//!
//! All passes always run, so a single compile reports every problem it can find.

use slog::{debug, o, trace, Discard, Logger};

use crate::arena::{Handle, StringArena};
use crate::error::Diagnostic;
use crate::isa::AddrMode;
use crate::line::{InstructionLine, Line, LineStore, Operand};
use crate::symbol_table::{Role, SymbolTable, Width};

/// Start of the implicit section used when code precedes any `.ORG`.
pub const DEFAULT_ORIGIN: u16 = 0x0200;

/// Largest number of `.ORG` sections.
pub const MAX_SECTIONS: usize = 6;

/// Address of the low byte of the reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;

/// A contiguous address range filled by consecutive code lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub start: u16,
    /// One past the last address. May be `0x10000`.
    pub end: u32,
    /// The `.ORG` line that opened the section, `None` for the implicit one.
    pub line: Option<usize>,
}

impl Section {
    fn new(start: u16, line: Option<usize>) -> Section {
        Section {
            start,
            end: start as u32,
            line,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start as u32
    }

    pub fn contains(&self, address: u16) -> bool {
        self.start as u32 <= address as u32 && (address as u32) < self.end
    }

    pub fn overlaps(&self, other: &Section) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.start as u32) < other.end
            && (other.start as u32) < self.end
    }

    fn describe(&self) -> String {
        match self.line {
            Some(line) => format!("section of line {:03X}", line),
            None => "implicit section".to_string(),
        }
    }
}

/// Everything one compile run learned about the program.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Start address of every line; `None` for lines that generate no bytes.
    pub addresses: Vec<Option<u16>>,
    pub symbols: SymbolTable,
    /// The implicit section first, then one section per accepted `.ORG`.
    pub sections: Vec<Section>,
    /// No section covers the reset vector, so `00 02` is to be written at `FFFC`.
    pub synthesize_reset_vector: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    fn new(lines: usize, slots: usize) -> CompileResult {
        CompileResult {
            addresses: vec![None; lines],
            symbols: SymbolTable::new(slots),
            sections: vec![Section::new(DEFAULT_ORIGIN, None)],
            synthesize_reset_vector: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn errors(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warnings(&self) -> usize {
        self.diagnostics.len() - self.errors()
    }

    /// Listing and install are only allowed on an error free compile.
    pub fn is_ok(&self) -> bool {
        self.errors() == 0
    }

    /// The first address after the last section.
    pub fn end_address(&self) -> u32 {
        self.sections
            .last()
            .map(|section| section.end)
            .unwrap_or(DEFAULT_ORIGIN as u32)
    }

    /// Index into [sections](CompileResult::sections) of the section opened by line `line`.
    pub fn section_opened_by(&self, line: usize) -> Option<usize> {
        self.sections.iter().position(|s| s.line == Some(line))
    }

    /// The value an instruction operand resolves to.
    pub fn operand_value(&self, ins: &InstructionLine) -> Option<u16> {
        match ins.operand {
            Operand::None => None,
            Operand::Literal(value) => Some(value),
            Operand::Symbol(handle) => self.symbols.resolved_value(handle),
        }
    }

    /// One line summary of the diagnostic counts.
    pub fn summary(&self) -> String {
        format!("errors {}, warnings {}", self.errors(), self.warnings())
    }
}

/// The typing a symbolic operand gets from its addressing mode.
fn use_width(ins: &InstructionLine) -> Width {
    if ins.abs_for_rel {
        return Width::Word;
    }

    match ins.mode() {
        Some(AddrMode::ABS) | Some(AddrMode::ABX) | Some(AddrMode::ABY) | Some(AddrMode::IND) => {
            Width::Word
        }
        _ => Width::Byte,
    }
}

struct Compilation<'a> {
    arena: &'a StringArena,
    lines: &'a LineStore,
    logger: Logger,
    result: CompileResult,
}

impl<'a> Compilation<'a> {
    fn error<S: Into<String>>(&mut self, line: Option<usize>, message: S) {
        let diagnostic = Diagnostic::error(line, message);
        trace!(self.logger, "diagnostic"; "message" => %diagnostic);
        self.result.diagnostics.push(diagnostic);
    }

    fn warning<S: Into<String>>(&mut self, line: Option<usize>, message: S) {
        let diagnostic = Diagnostic::warning(line, message);
        trace!(self.logger, "diagnostic"; "message" => %diagnostic);
        self.result.diagnostics.push(diagnostic);
    }

    fn name(&self, handle: Handle) -> String {
        self.arena.get_str(handle)
    }

    fn assign_addresses(&mut self) {
        let log = self.logger.new(o!("pass" => 1));
        let lines = self.lines;

        let mut cursor = DEFAULT_ORIGIN as u32;
        let mut origin_known = false;

        for (index, line) in lines.iter().enumerate() {
            match line {
                Line::Comment { text } => {
                    for handle in text {
                        self.result.symbols.other(*handle, index, Role::Comment);
                    }
                }
                Line::EqByte { label, value } => {
                    trace!(log, "define constant"; "line" => index, "value" => *value);
                    self.result
                        .symbols
                        .define(*label, index, Width::Byte, *value as u16);
                }
                Line::EqWord { label, value } => {
                    trace!(log, "define constant"; "line" => index, "value" => *value);
                    self.result.symbols.define(*label, index, Width::Word, *value);
                }
                Line::Org { address } => {
                    if self.result.sections.len() > MAX_SECTIONS {
                        self.error(
                            Some(index),
                            format!("too many .ORG sections (max {})", MAX_SECTIONS),
                        );
                        continue;
                    }

                    trace!(log, "open section"; "line" => index, "address" => *address);

                    self.result.sections.push(Section::new(*address, Some(index)));
                    cursor = *address as u32;
                    origin_known = true;
                }
                Line::Bytes { .. } | Line::Words { .. } | Line::Instruction(_) => {
                    if !origin_known {
                        self.warning(
                            Some(index),
                            format!("no .ORG, assuming {:04X}", DEFAULT_ORIGIN),
                        );
                        origin_known = true;
                    }

                    let size = line.size(self.arena) as u32;

                    if cursor + size > 0x10000 {
                        self.error(Some(index), "address overflow (beyond FFFF)");
                    }

                    if cursor <= 0xFFFF {
                        self.result.addresses[index] = Some(cursor as u16);
                    }

                    let address = (cursor & 0xFFFF) as u16;

                    trace!(log, "place line"; "line" => index, "address" => address, "size" => size);

                    if let Some(label) = line.label() {
                        self.result.symbols.define(label, index, Width::Word, address);
                    }

                    match line {
                        Line::Bytes { data, .. } => {
                            self.result.symbols.other(*data, index, Role::Bytes);
                        }
                        Line::Words { data, .. } => {
                            self.result.symbols.other(*data, index, Role::Words);
                        }
                        Line::Instruction(ins) => {
                            if let Operand::Symbol(handle) = ins.operand {
                                self.result.symbols.reference(handle, index, use_width(ins));
                            }
                        }
                        _ => {}
                    }

                    cursor += size;

                    if let Some(section) = self.result.sections.last_mut() {
                        section.end = cursor;
                    }
                }
            }
        }
    }

    fn resolve_symbols(&mut self) {
        let log = self.logger.new(o!("pass" => 2));

        self.result.symbols.resolve(self.arena);

        trace!(log, "symbols resolved");
    }

    fn check_symbols(&mut self) {
        let mut diagnostics = Vec::new();
        let symbols = &self.result.symbols;

        for (handle, info) in symbols.in_line_order() {
            let name = self.name(handle);

            if info.is_use() {
                match info.definition.and_then(|d| symbols.get(d)) {
                    None => {
                        diagnostics.push(Diagnostic::error(
                            Some(info.line),
                            format!("no definition for {}", name),
                        ));
                    }
                    Some(definition) if definition.width != info.width => {
                        diagnostics.push(Diagnostic::error(
                            Some(info.line),
                            format!(
                                "{} is a {} but is used as a {}",
                                name, definition.width, info.width
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            } else if info.is_definition() {
                if info.definition != Some(handle) {
                    let first = info
                        .definition
                        .and_then(|d| symbols.get(d))
                        .map(|d| format!(" (first on line {:03X})", d.line))
                        .unwrap_or_default();

                    diagnostics.push(Diagnostic::error(
                        Some(info.line),
                        format!("duplicate definition of {}{}", name, first),
                    ));
                } else if !info.referenced {
                    diagnostics.push(Diagnostic::warning(
                        Some(info.line),
                        format!("no usage of {}", name),
                    ));
                }
            }
        }

        let log = self.logger.new(o!("pass" => 3));
        trace!(log, "symbols checked"; "diagnostics" => diagnostics.len());

        self.result.diagnostics.extend(diagnostics);
    }

    fn check_instructions(&mut self) {
        let log = self.logger.new(o!("pass" => 4));
        let lines = self.lines;

        for (index, line) in lines.iter().enumerate() {
            let ins = match line {
                Line::Instruction(ins) => ins,
                _ => continue,
            };

            let (address, mode, mnemonic) = match (
                self.result.addresses[index],
                ins.mode(),
                ins.mnemonic(),
            ) {
                (Some(address), Some(mode), Some(mnemonic)) => (address, mode, mnemonic),
                _ => continue,
            };

            let value = match self.result.operand_value(ins) {
                Some(value) => value,
                None => continue,
            };

            if mode == AddrMode::REL {
                let next = address as i32 + 2;

                let target = if ins.abs_for_rel {
                    let displacement = value as i32 - next;

                    if displacement < -128 || displacement > 127 {
                        self.error(
                            Some(index),
                            format!("branch too far ({} bytes to {:04X})", displacement, value),
                        );
                        continue;
                    }

                    value as i32
                } else {
                    next + (value as u8 as i8) as i32
                };

                // The CPU adds the cycle when the target leaves the page of the next instruction.
                let next_page = (next as u32 & 0xFFFF) >> 8;
                let target_page = (target as u32 & 0xFFFF) >> 8;

                trace!(log, "branch"; "line" => index, "target" => target);

                if next_page != target_page {
                    self.warning(
                        Some(index),
                        format!("extra cycle, page crossed (branch to {:04X})", target & 0xFFFF),
                    );
                }
            } else if let Some(zero_page) = mode.zero_page_variant() {
                if value < 0x100 && mnemonic.has_mode(zero_page) {
                    self.warning(
                        Some(index),
                        format!("operand {:04X} is in zero page, suggest {}", value, zero_page),
                    );
                }
            }
        }
    }

    fn check_sections(&mut self) {
        let log = self.logger.new(o!("pass" => 5));
        let sections = self.result.sections.clone();

        for (i, first) in sections.iter().enumerate() {
            for second in &sections[i + 1..] {
                if first.overlaps(second) {
                    self.warning(
                        second.line,
                        format!("{} overlaps {}", second.describe(), first.describe()),
                    );
                }
            }
        }

        for section in sections.iter().skip(1) {
            if section.is_empty() {
                self.warning(section.line, format!("{} is empty", section.describe()));
            }
        }

        let low = sections.iter().any(|s| s.contains(RESET_VECTOR));
        let high = sections.iter().any(|s| s.contains(RESET_VECTOR + 1));

        trace!(log, "reset vector"; "low" => low, "high" => high);

        match (low, high) {
            (true, true) => {}
            (false, false) => {
                self.result.synthesize_reset_vector = true;
                self.warning(
                    None,
                    format!(
                        "reset vector missing ({:04X}/{:04X}), assuming {:04X}",
                        RESET_VECTOR,
                        RESET_VECTOR + 1,
                        DEFAULT_ORIGIN
                    ),
                );
            }
            _ => self.error(
                None,
                format!(
                    "reset vector corrupt (only one of {:04X}/{:04X} is set)",
                    RESET_VECTOR,
                    RESET_VECTOR + 1
                ),
            ),
        }
    }
}

/// Compiles the program formed by `lines`, whose strings live in `arena`.
pub fn compile(arena: &StringArena, lines: &LineStore) -> CompileResult {
    compile_with_logger(arena, lines, None)
}

/// Same as [compile], but logs the progress of the passes to `logger`.
pub fn compile_with_logger<L>(arena: &StringArena, lines: &LineStore, logger: L) -> CompileResult
where
    L: Into<Option<Logger>>,
{
    let logger = logger
        .into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "compilation"));

    let mut compilation = Compilation {
        arena,
        lines,
        logger: logger.clone(),
        result: CompileResult::new(lines.len(), arena.capacity()),
    };

    compilation.assign_addresses();
    compilation.resolve_symbols();
    compilation.check_symbols();
    compilation.check_instructions();
    compilation.check_sections();

    let result = compilation.result;

    debug!(logger, "compilation finished";
        "errors" => result.errors(),
        "warnings" => result.warnings(),
        "synthesize_reset_vector" => result.synthesize_reset_vector);

    result
}
