//! A resident line-oriented assembler for the 6502, in the spirit of the tiny program editors of
//! machine monitors.
//!
//! Programs are edited one line at a time and kept in a compact form: every string a line needs
//! (labels, symbolic operands, comment text, `.DB`/`.DW` values) is stored in a fixed-block
//! [string arena](arena::StringArena) of eight-byte slots, and the lines themselves are small
//! tagged records in a capacity bounded [line store](line::LineStore).
//!
//! Currently this crate provides the functionality to:
//! - Parse and print program lines (instructions, `.ORG`, `.DB`, `.DW`, `.EB`, `.EW`, comments).
//! - Edit a program: insert, replace, delete and move lines.
//! - Compile a program in five passes, reporting undefined and duplicate labels, byte/word
//!   mismatches, out of range branches, page crossings, zero page opportunities, overlapping
//!   sections and the state of the reset vector.
//! - Produce a listing, a symbol map and a hex dump, or install the program into memory.
//!
//! # Example
//! ```
//! use prog6502::program::Program;
//!
//! let mut program = Program::new();
//!
//! for line in &[".ORG 0200", "LDA #05", "STA 0300", ".ORG FFFC", ".DW 0200"] {
//!     program.append_line(line).unwrap();
//! }
//!
//! let result = program.compile();
//! assert_eq!(result.errors(), 0);
//!
//! let mut memory = vec![0u8; 0x10000];
//! let written = prog6502::emit::install(program.arena(), program.lines(), &result, &mut memory)
//!     .unwrap();
//!
//! assert_eq!(written, 7);
//! assert_eq!(&memory[0x200..0x205], &[0xA9, 0x05, 0x8D, 0x00, 0x03]);
//! assert_eq!(&memory[0xFFFC..], &[0x00, 0x02]);
//! ```
//!
//! # Executables
//!
//! ## `prog6502repl`
//!
//! An interactive loop around the `prog` command. `prog insert` without a line switches to
//! streaming mode, which ends at the first empty line.
//!
//! ```text
//! > prog insert
//! P:000> .ORG 0300
//! P:001> loop INX
//! P:002> BNE loop
//! P:003>
//! > prog compile list
//! WARNING: reset vector missing (FFFC/FFFD), assuming 0200
//!      |             | 000          .ORG 0300
//! 0300 | E8          | 001 loop     INX
//! 0301 | D0 FD       | 002          BNE loop
//! 0303 |             | end
//! FFFC | 00 02       | implicit reset vector
//! errors 0, warnings 1
//! ```
//!
//! ## `prog6502asm`
//!
//! Assembles a source file, one program line per text line.
pub mod arena;
pub mod command;
pub mod compiler;
pub mod emit;
pub mod error;
pub mod isa;
pub mod line;
pub mod memory;
pub mod parsing;
pub mod program;
pub mod symbol_table;

pub use command::Command;
pub use memory::Memory;
pub use program::Program;
