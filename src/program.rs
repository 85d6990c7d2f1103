//! The editable program: a string arena and a line store bundled together.

use std::fmt;

use slog::{debug, o, trace, Discard, Logger};

use crate::arena::{StringArena, DEFAULT_SLOTS};
use crate::compiler::{compile_with_logger, CompileResult};
use crate::error::{Diagnostic, ProgramError};
use crate::line::{self, parse_line, Line, LineStore, DEFAULT_LINES};

/// Usage figures reported by `prog stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub lines: usize,
    pub line_capacity: usize,
    pub slots: usize,
    /// Allocatable slots, the reserved slot 0 excluded.
    pub slot_capacity: usize,
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "lines used {}/{}", self.lines, self.line_capacity)?;
        write!(f, "labels used {}/{}", self.slots, self.slot_capacity)
    }
}

/// Owns every line of a program together with the strings the lines refer to.
///
/// All editing goes through this type so that arena slots are released exactly when their line
/// leaves the store. Failed operations leave the program untouched.
pub struct Program {
    arena: StringArena,
    lines: LineStore,
    logger: Logger,
}

impl Default for Program {
    fn default() -> Program {
        Program::new()
    }
}

impl Program {
    /// An empty program with room for [DEFAULT_LINES] lines and [DEFAULT_SLOTS] arena slots.
    pub fn new() -> Program {
        Program::with_capacity(DEFAULT_LINES, DEFAULT_SLOTS)
    }

    pub fn with_capacity(lines: usize, slots: usize) -> Program {
        Program {
            arena: StringArena::new(slots),
            lines: LineStore::new(lines),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// Replaces the logger used for editing and compilation.
    pub fn with_logger<L: Into<Option<Logger>>>(mut self, logger: L) -> Program {
        self.logger = logger
            .into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("component" => "program"));
        self
    }

    pub fn arena(&self) -> &StringArena {
        &self.arena
    }

    pub fn lines(&self) -> &LineStore {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn check_line(&self, line: usize) -> Result<(), ProgramError> {
        if line < self.lines.len() {
            Ok(())
        } else {
            Err(ProgramError::NoSuchLine {
                line,
                len: self.lines.len(),
            })
        }
    }

    fn check_range(&self, first: usize, last: usize) -> Result<(), ProgramError> {
        self.check_line(last)?;

        if first > last {
            return Err(ProgramError::BadRange { first, last });
        }

        Ok(())
    }

    /// Parses `fields` and inserts the line before line `at`. Returns the parser's remarks.
    pub fn insert<S: AsRef<str>>(
        &mut self,
        at: usize,
        fields: &[S],
    ) -> Result<Vec<Diagnostic>, ProgramError> {
        if at > self.lines.len() {
            return Err(ProgramError::NoSuchLine {
                line: at,
                len: self.lines.len(),
            });
        }

        if self.lines.is_full() {
            return Err(ProgramError::OutOfLines {
                capacity: self.lines.capacity(),
            });
        }

        let parsed = parse_line(&mut self.arena, fields)?;

        trace!(self.logger, "insert line"; "line" => at, "kind" => parsed.line.tag());

        self.lines.insert(at, parsed.line);

        Ok(parsed
            .warnings
            .into_iter()
            .map(|warning| Diagnostic::warning(Some(at), warning))
            .collect())
    }

    /// Inserts after the last line.
    pub fn append<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<Vec<Diagnostic>, ProgramError> {
        self.insert(self.lines.len(), fields)
    }

    /// Splits `text` at whitespace and appends it.
    pub fn append_line(&mut self, text: &str) -> Result<Vec<Diagnostic>, ProgramError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        self.append(&fields)
    }

    /// Replaces line `at`. The old line is only dropped once the new one parsed successfully.
    pub fn replace<S: AsRef<str>>(
        &mut self,
        at: usize,
        fields: &[S],
    ) -> Result<Vec<Diagnostic>, ProgramError> {
        self.check_line(at)?;

        let parsed = parse_line(&mut self.arena, fields)?;

        trace!(self.logger, "replace line"; "line" => at, "kind" => parsed.line.tag());

        let old = self.lines.replace(at, parsed.line);
        old.free_handles(&mut self.arena);

        Ok(parsed
            .warnings
            .into_iter()
            .map(|warning| Diagnostic::warning(Some(at), warning))
            .collect())
    }

    /// Deletes lines `first..=last` and returns how many were removed.
    pub fn delete(&mut self, first: usize, last: usize) -> Result<usize, ProgramError> {
        self.check_range(first, last)?;

        let removed = self.lines.remove(first, last);

        for line in &removed {
            line.free_handles(&mut self.arena);
        }

        trace!(self.logger, "delete lines"; "first" => first, "last" => last);

        Ok(removed.len())
    }

    /// Moves lines `first..=last` to just before line `before`. `before` may equal the number of
    /// lines, which moves the range to the end.
    pub fn move_lines(
        &mut self,
        first: usize,
        last: usize,
        before: usize,
    ) -> Result<(), ProgramError> {
        self.check_range(first, last)?;

        if before > self.lines.len() {
            return Err(ProgramError::NoSuchLine {
                line: before,
                len: self.lines.len(),
            });
        }

        if before >= first && before <= last {
            return Err(ProgramError::MoveIntoRange { before });
        }

        if before == last + 1 {
            return Err(ProgramError::MoveToSameLocation);
        }

        trace!(self.logger, "move lines"; "first" => first, "last" => last, "before" => before);

        self.lines.move_range(first, last, before);

        Ok(())
    }

    /// Source text of line `at`.
    pub fn print_line(&self, at: usize) -> Result<String, ProgramError> {
        self.check_line(at)?;

        Ok(self
            .lines
            .get(at)
            .map(|line| line::print_line(&self.arena, line))
            .unwrap_or_default())
    }

    /// Source text of lines `first..=last`, each prefixed with its line number.
    pub fn list(&self, first: usize, last: usize) -> Result<Vec<String>, ProgramError> {
        self.check_range(first, last)?;

        Ok(self
            .lines
            .iter()
            .enumerate()
            .skip(first)
            .take(last - first + 1)
            .map(|(index, line)| format!("{:03X} {}", index, line::print_line(&self.arena, line)))
            .collect())
    }

    pub fn stat(&self) -> Stat {
        Stat {
            lines: self.lines.len(),
            line_capacity: self.lines.capacity(),
            slots: self.arena.used_count(),
            slot_capacity: self.arena.capacity() - 1,
        }
    }

    /// Drops every line and releases every arena slot.
    pub fn reset(&mut self) {
        let lines: Vec<Line> = self.lines.clear();

        for line in &lines {
            line.free_handles(&mut self.arena);
        }

        self.arena.clear();

        debug!(self.logger, "program reset"; "lines" => lines.len());
    }

    pub fn compile(&self) -> CompileResult {
        compile_with_logger(&self.arena, &self.lines, self.logger.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaError;
    use crate::error::ParseErrorKind;

    fn program(source: &[&str]) -> Program {
        let mut program = Program::new();

        for line in source {
            program.append_line(line).unwrap();
        }

        program
    }

    fn listing(program: &Program) -> Vec<String> {
        (0..program.len())
            .map(|i| program.print_line(i).unwrap().trim().to_string())
            .collect()
    }

    #[test]
    fn failed_insert_leaves_no_trace() {
        let mut program = program(&["NOP"]);
        let free = program.arena().free_count();

        let err = program.insert(0, &["start", "LDA", "(ptr),Z"]).unwrap_err();

        match err {
            ProgramError::Parse(err) => match err.kind {
                ParseErrorKind::OperandSyntax(_) => {}
                other => panic!("unexpected error {:?}", other),
            },
            other => panic!("unexpected error {:?}", other),
        }

        assert_eq!(program.len(), 1);
        assert_eq!(program.arena().free_count(), free);
    }

    #[test]
    fn replace_releases_old_slots() {
        let mut program = program(&["loop JMP loop"]);
        let free = program.arena().free_count();

        program.replace(0, &["NOP"]).unwrap();

        assert_eq!(program.arena().free_count(), free + 2);
        assert_eq!(listing(&program), vec!["NOP"]);
    }

    #[test]
    fn failed_replace_keeps_old_line() {
        let mut program = program(&["loop JMP loop"]);

        assert!(program.replace(0, &["FOO"]).is_err());
        assert_eq!(listing(&program), vec!["loop     JMP loop"]);
    }

    #[test]
    fn delete_and_move() {
        let mut program = program(&["INX", "INY", "DEX", "DEY"]);

        program.move_lines(2, 3, 0).unwrap();
        assert_eq!(listing(&program), vec!["DEX", "DEY", "INX", "INY"]);

        program.move_lines(0, 0, 4).unwrap();
        assert_eq!(listing(&program), vec!["DEY", "INX", "INY", "DEX"]);

        assert_eq!(
            program.move_lines(0, 1, 1),
            Err(ProgramError::MoveIntoRange { before: 1 })
        );
        assert_eq!(program.move_lines(0, 1, 2), Err(ProgramError::MoveToSameLocation));
        assert_eq!(program.delete(2, 1), Err(ProgramError::BadRange { first: 2, last: 1 }));

        assert_eq!(program.delete(1, 2), Ok(2));
        assert_eq!(listing(&program), vec!["DEY", "DEX"]);
    }

    #[test]
    fn capacity() {
        let mut program = Program::with_capacity(2, 8);

        program.append_line("NOP").unwrap();
        program.append_line("NOP").unwrap();

        assert_eq!(
            program.append_line("NOP"),
            Err(ProgramError::OutOfLines { capacity: 2 })
        );
        assert_eq!(
            program.insert(5, &["NOP"]),
            Err(ProgramError::NoSuchLine { line: 5, len: 2 })
        );
    }

    #[test]
    fn stat_and_reset() {
        let mut program = program(&["cnt .EB 01", "; hello", "LDA #cnt"]);

        assert_eq!(
            program.stat().to_string(),
            "lines used 3/32\nlabels used 3/63"
        );

        program.reset();

        assert!(program.is_empty());
        assert_eq!(program.arena().free_count(), DEFAULT_SLOTS - 1);
    }

    #[test]
    fn list_prefixes_line_numbers() {
        let program = program(&["NOP", "; done"]);

        assert_eq!(
            program.list(0, 1).unwrap(),
            vec!["000          NOP".to_string(), "001 ; done".to_string()]
        );
    }

    #[test]
    fn exhausted_arena_rolls_back() {
        let mut program = Program::with_capacity(8, 3);
        program.append_line("q NOP").unwrap();

        let free = program.arena().free_count();
        assert_eq!(free, 1);

        for text in &["lbl LDA sym", "tbl .DB 01", "wq .DW 0200", "lbl JMP away"] {
            match program.append_line(text) {
                Err(ProgramError::Parse(err)) => assert_eq!(
                    err.kind,
                    ParseErrorKind::Arena(ArenaError::Exhausted),
                    "{}",
                    text
                ),
                other => panic!("{}: {:?}", text, other),
            }

            assert_eq!(program.arena().free_count(), free, "{}", text);
            assert_eq!(program.len(), 1, "{}", text);
        }

        assert!(program.append_line("lbl JMP x").is_err());
        assert_eq!(program.arena().free_count(), free);
        assert_eq!(program.len(), 1);
    }
}
