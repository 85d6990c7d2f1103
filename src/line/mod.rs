//! Program lines and the line store.
//!
//! A [Line] is one record of the editable program. Every string it refers to (labels, symbolic
//! operands, comment text, `.DB`/`.DW` values) lives in the [StringArena] and is owned by exactly
//! one line: whoever drops a line from the store must call [Line::free_handles].

use crate::arena::{Handle, StringArena};
use crate::isa::{self, AddrMode, Mnemonic};

pub mod parser;
pub mod printer;
pub mod token;

pub use parser::{parse_line, Parsed};
pub use printer::print_line;

/// Default number of lines of a program.
pub const DEFAULT_LINES: usize = 32;

/// Largest number of arena slots a comment may occupy.
pub const COMMENT_SLOTS: usize = 5;

/// Operand of an instruction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Implied or accumulator mode.
    None,
    Literal(u16),
    /// Reference to a label.
    Symbol(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionLine {
    pub label: Option<Handle>,
    pub opcode: u8,
    pub operand: Operand,
    /// Written in absolute syntax (`BEQ loop`) but encoded as a relative branch.
    pub abs_for_rel: bool,
}

impl InstructionLine {
    pub fn mnemonic(&self) -> Option<Mnemonic> {
        isa::decode(self.opcode).map(|info| info.mnemonic)
    }

    /// The encoded addressing mode. For `abs_for_rel` lines this is [AddrMode::REL].
    pub fn mode(&self) -> Option<AddrMode> {
        isa::decode(self.opcode).map(|info| info.mode)
    }

    /// The addressing mode as written in the source.
    pub fn written_mode(&self) -> Option<AddrMode> {
        if self.abs_for_rel {
            Some(AddrMode::ABS)
        } else {
            self.mode()
        }
    }

    /// Number of bytes the instruction occupies.
    pub fn size(&self) -> u16 {
        self.mode().map(AddrMode::bytes).unwrap_or(1)
    }
}

/// One program line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `; text`, stored in chunks of one slot each.
    Comment { text: Vec<Handle> },
    /// `.ORG HHLL`
    Org { address: u16 },
    /// `[label] .DB NN,...`, the values stored as a raw blob.
    Bytes { label: Option<Handle>, data: Handle },
    /// `[label] .DW HHLL,...`, the values stored little endian as a raw blob.
    Words { label: Option<Handle>, data: Handle },
    /// `label .EB NN`
    EqByte { label: Handle, value: u8 },
    /// `label .EW HHLL`
    EqWord { label: Handle, value: u16 },
    Instruction(InstructionLine),
}

impl Line {
    pub fn label(&self) -> Option<Handle> {
        match self {
            Line::Comment { .. } | Line::Org { .. } => None,
            Line::Bytes { label, .. } | Line::Words { label, .. } => *label,
            Line::EqByte { label, .. } | Line::EqWord { label, .. } => Some(*label),
            Line::Instruction(ins) => ins.label,
        }
    }

    /// Every arena handle owned by the line.
    pub fn handles(&self) -> Vec<Handle> {
        match self {
            Line::Comment { text } => text.clone(),
            Line::Org { .. } => Vec::new(),
            Line::Bytes { label, data } | Line::Words { label, data } => {
                label.iter().copied().chain(Some(*data)).collect()
            }
            Line::EqByte { label, .. } | Line::EqWord { label, .. } => vec![*label],
            Line::Instruction(ins) => {
                let mut handles: Vec<Handle> = ins.label.into_iter().collect();

                if let Operand::Symbol(symbol) = ins.operand {
                    handles.push(symbol);
                }

                handles
            }
        }
    }

    /// Releases every arena slot owned by the line.
    pub fn free_handles(&self, arena: &mut StringArena) {
        for handle in self.handles() {
            arena.free(handle);
        }
    }

    /// Number of bytes the line generates.
    pub fn size(&self, arena: &StringArena) -> u16 {
        match self {
            Line::Bytes { data, .. } | Line::Words { data, .. } => arena.get_raw(*data).len() as u16,
            Line::Instruction(ins) => ins.size(),
            _ => 0,
        }
    }

    /// Lines that occupy memory: instructions, `.DB` and `.DW`.
    pub fn is_code(&self) -> bool {
        match self {
            Line::Bytes { .. } | Line::Words { .. } | Line::Instruction(_) => true,
            _ => false,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Line::Comment { .. } => "comment",
            Line::Org { .. } => ".ORG",
            Line::Bytes { .. } => ".DB",
            Line::Words { .. } => ".DW",
            Line::EqByte { .. } => ".EB",
            Line::EqWord { .. } => ".EW",
            Line::Instruction(_) => "instruction",
        }
    }
}

/// Capacity bounded, ordered sequence of lines.
///
/// The store only arranges lines; releasing the arena slots of removed lines is the caller's job.
#[derive(Debug, Clone)]
pub struct LineStore {
    lines: Vec<Line>,
    capacity: usize,
}

impl Default for LineStore {
    fn default() -> LineStore {
        LineStore::new(DEFAULT_LINES)
    }
}

impl LineStore {
    pub fn new(capacity: usize) -> LineStore {
        LineStore {
            lines: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lines.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<Line> {
        self.lines.iter()
    }

    /// Inserts before `index`, or appends when `index == len`. The caller checks capacity.
    pub fn insert(&mut self, index: usize, line: Line) {
        self.lines.insert(index, line);
    }

    /// Swaps in a new line, returning the old one.
    pub fn replace(&mut self, index: usize, line: Line) -> Line {
        std::mem::replace(&mut self.lines[index], line)
    }

    /// Removes the inclusive range `first..=last`.
    pub fn remove(&mut self, first: usize, last: usize) -> Vec<Line> {
        self.lines.drain(first..=last).collect()
    }

    /// Moves `first..=last` to just before `before`, where `before` is an index into the store as
    /// it was before the move and lies outside the range.
    pub fn move_range(&mut self, first: usize, last: usize, before: usize) {
        if before < first {
            self.lines[before..=last].rotate_right(last - first + 1);
        } else {
            self.lines[first..before].rotate_left(last - first + 1);
        }
    }

    pub fn clear(&mut self) -> Vec<Line> {
        self.lines.drain(..).collect()
    }
}

impl<'a> IntoIterator for &'a LineStore {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
