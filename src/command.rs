//! The `prog` command surface of the monitor.
//!
//! ```text
//! insert [<num> [<line>]]    insert a line, or start streaming lines, before line <num>
//! replace <num> <line>       replace line <num>
//! list [<num1> [<num2>]]     list lines, `-` meaning the first or last line
//! move <num1> <num2> <num3>  move lines <num1>..<num2> before line <num3>
//! delete <num1> [<num2>]     delete lines
//! compile [list|map|hex|install]
//! stat [strings]             line and string memory usage
//! new                        discard the program
//! ```
//!
//! Command names may be abbreviated to any prefix. Numbers are hexadecimal.

use std::fmt;

use crate::arena::StringArena;
use crate::emit;
use crate::error::{EmitError, ProgramError};
use crate::memory::Memory;
use crate::parsing::parse_hex;
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileAction {
    /// Only report the diagnostics.
    Check,
    List,
    Map,
    Hex,
    Install,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `line` empty means streaming insert.
    Insert { at: Option<usize>, line: Vec<String> },
    Replace { at: usize, line: Vec<String> },
    List { first: Option<usize>, last: Option<usize> },
    Move { first: usize, last: usize, before: usize },
    Delete { first: Option<usize>, last: Option<usize> },
    Compile(CompileAction),
    Stat { strings: bool },
    New,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    MissingCommand,
    UnknownCommand(String),
    UnknownArgument(String),
    MissingArgument(&'static str),
    TooManyArguments,
    BadNumber(String),
    Program(ProgramError),
    Emit(EmitError),
}

impl From<ProgramError> for CommandError {
    fn from(err: ProgramError) -> CommandError {
        CommandError::Program(err)
    }
}

impl From<EmitError> for CommandError {
    fn from(err: EmitError) -> CommandError {
        CommandError::Emit(err)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::MissingCommand => write!(f, "missing command"),
            CommandError::UnknownCommand(name) => write!(f, "unknown command '{}'", name),
            CommandError::UnknownArgument(arg) => write!(f, "unknown argument '{}'", arg),
            CommandError::MissingArgument(name) => write!(f, "missing argument <{}>", name),
            CommandError::TooManyArguments => write!(f, "too many arguments"),
            CommandError::BadNumber(text) => write!(f, "'{}' is not a hex number", text),
            CommandError::Program(err) => write!(f, "{}", err),
            CommandError::Emit(err) => write!(f, "{}", err),
        }
    }
}

/// Text produced by a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub text: Vec<String>,
    /// Set by `insert` without a line: the caller should read lines and insert them starting at
    /// this line number until an empty line.
    pub stream: Option<usize>,
}

impl Outcome {
    fn text(text: Vec<String>) -> Outcome {
        Outcome { text, stream: None }
    }
}

const COMMANDS: &[&str] = &[
    "insert", "replace", "list", "move", "delete", "compile", "stat", "new",
];

/// `word` is a non-empty prefix of `name`, ignoring case.
fn abbreviates(word: &str, name: &str) -> bool {
    !word.is_empty() && name.starts_with(word.to_ascii_lowercase().as_str())
}

fn number(text: &str) -> Result<usize, CommandError> {
    parse_hex(text)
        .map(usize::from)
        .map_err(|_| CommandError::BadNumber(text.to_string()))
}

/// A number or `-`.
fn optional_number(text: Option<&str>) -> Result<Option<usize>, CommandError> {
    match text {
        None | Some("-") => Ok(None),
        Some(text) => number(text).map(Some),
    }
}

fn required_number(text: Option<&str>, name: &'static str) -> Result<usize, CommandError> {
    text.ok_or(CommandError::MissingArgument(name))
        .and_then(number)
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| word.to_string()).collect()
}

fn at_most(args: &[&str], n: usize) -> Result<(), CommandError> {
    if args.len() > n {
        Err(CommandError::TooManyArguments)
    } else {
        Ok(())
    }
}

impl Command {
    /// Parses the words following `prog`.
    pub fn parse<S: AsRef<str>>(words: &[S]) -> Result<Command, CommandError> {
        let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();

        let (name, args) = match words.split_first() {
            Some((name, args)) => (*name, args),
            None => return Err(CommandError::MissingCommand),
        };

        let command = COMMANDS
            .iter()
            .copied()
            .find(|command| abbreviates(name, command))
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        match command {
            "insert" => Ok(Command::Insert {
                at: args.first().map(|text| number(text)).transpose()?,
                line: args.get(1..).map(owned).unwrap_or_default(),
            }),
            "replace" => {
                let at = required_number(args.first().copied(), "num")?;

                if args.len() < 2 {
                    return Err(CommandError::MissingArgument("line"));
                }

                Ok(Command::Replace {
                    at,
                    line: owned(&args[1..]),
                })
            }
            "list" => {
                at_most(args, 2)?;

                let first = optional_number(args.get(0).copied())?;
                let last = match args.get(1).copied() {
                    Some(text) => optional_number(Some(text))?,
                    None if first.is_some() => first,
                    None => None,
                };

                Ok(Command::List { first, last })
            }
            "move" => {
                at_most(args, 3)?;

                Ok(Command::Move {
                    first: required_number(args.get(0).copied(), "num1")?,
                    last: required_number(args.get(1).copied(), "num2")?,
                    before: required_number(args.get(2).copied(), "num3")?,
                })
            }
            "delete" => {
                at_most(args, 2)?;

                let first = match args.get(0).copied() {
                    Some(text) => optional_number(Some(text))?,
                    None => return Err(CommandError::MissingArgument("num1")),
                };

                let last = match args.get(1).copied() {
                    Some(text) => optional_number(Some(text))?,
                    None => first,
                };

                Ok(Command::Delete { first, last })
            }
            "compile" => {
                at_most(args, 1)?;

                let action = match args.first() {
                    None => CompileAction::Check,
                    Some(arg) if abbreviates(arg, "list") => CompileAction::List,
                    Some(arg) if abbreviates(arg, "map") => CompileAction::Map,
                    Some(arg) if abbreviates(arg, "hex") => CompileAction::Hex,
                    Some(arg) if abbreviates(arg, "install") => CompileAction::Install,
                    Some(arg) => return Err(CommandError::UnknownArgument(arg.to_string())),
                };

                Ok(Command::Compile(action))
            }
            "stat" => {
                at_most(args, 1)?;

                match args.first() {
                    None => Ok(Command::Stat { strings: false }),
                    Some(arg) if abbreviates(arg, "strings") => Ok(Command::Stat { strings: true }),
                    Some(arg) => Err(CommandError::UnknownArgument(arg.to_string())),
                }
            }
            _ => {
                at_most(args, 0)?;
                Ok(Command::New)
            }
        }
    }

    /// Runs the command against `program`. `memory` receives `compile install`.
    pub fn execute<M: Memory>(
        &self,
        program: &mut Program,
        memory: &mut M,
    ) -> Result<Outcome, CommandError> {
        match self {
            Command::Insert { at, line } => {
                let at = at.unwrap_or_else(|| program.len());

                if line.is_empty() {
                    if at > program.len() {
                        return Err(ProgramError::NoSuchLine {
                            line: at,
                            len: program.len(),
                        }
                        .into());
                    }

                    return Ok(Outcome {
                        text: Vec::new(),
                        stream: Some(at),
                    });
                }

                let warnings = program.insert(at, line.as_slice())?;
                Ok(Outcome::text(warnings.iter().map(ToString::to_string).collect()))
            }
            Command::Replace { at, line } => {
                let warnings = program.replace(*at, line.as_slice())?;
                Ok(Outcome::text(warnings.iter().map(ToString::to_string).collect()))
            }
            Command::List { first, last } => {
                if program.is_empty() {
                    return Ok(Outcome::default());
                }

                let first = first.unwrap_or(0);
                let last = last.unwrap_or(program.len() - 1);

                Ok(Outcome::text(program.list(first, last)?))
            }
            Command::Move {
                first,
                last,
                before,
            } => {
                program.move_lines(*first, *last, *before)?;
                Ok(Outcome::default())
            }
            Command::Delete { first, last } => {
                if program.is_empty() {
                    return Err(ProgramError::NoSuchLine { line: 0, len: 0 }.into());
                }

                let first = first.unwrap_or(0);
                let last = last.unwrap_or(program.len() - 1);
                let removed = program.delete(first, last)?;

                Ok(Outcome::text(vec![format!("{} line(s) deleted", removed)]))
            }
            Command::Compile(action) => compile(program, *action, memory),
            Command::Stat { strings } => {
                let mut text: Vec<String> = program
                    .stat()
                    .to_string()
                    .lines()
                    .map(ToString::to_string)
                    .collect();

                if *strings {
                    text.extend(slot_dump(program.arena()));
                }

                Ok(Outcome::text(text))
            }
            Command::New => {
                program.reset();
                Ok(Outcome::default())
            }
        }
    }
}

/// One row per allocated slot. Bytes outside printable ASCII are escaped.
fn slot_dump(arena: &StringArena) -> Vec<String> {
    arena
        .slots()
        .map(|handle| {
            let text: String = arena
                .get(handle)
                .iter()
                .flat_map(|b| std::ascii::escape_default(*b))
                .map(char::from)
                .collect();

            format!("{} {}", handle, text)
        })
        .collect()
}

fn compile<M: Memory>(
    program: &Program,
    action: CompileAction,
    memory: &mut M,
) -> Result<Outcome, CommandError> {
    let result = program.compile();
    let arena = program.arena();
    let lines = program.lines();

    let mut text: Vec<String> = result.diagnostics.iter().map(ToString::to_string).collect();

    let report = match action {
        CompileAction::Check => Ok(Vec::new()),
        CompileAction::List => emit::listing(arena, lines, &result),
        CompileAction::Map => Ok(emit::map(arena, &result)),
        CompileAction::Hex => emit::hex_dump(arena, lines, &result),
        CompileAction::Install => emit::install(arena, lines, &result, memory)
            .map(|written| vec![format!("{} bytes installed", written)]),
    };

    match report {
        Ok(rows) => text.extend(rows),
        Err(err @ EmitError::CompileErrors { .. }) => text.push(err.to_string()),
        Err(err) => return Err(err.into()),
    }

    text.push(result.summary());

    Ok(Outcome::text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, CommandError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        Command::parse(&words)
    }

    fn run(program: &mut Program, memory: &mut Vec<u8>, line: &str) -> Vec<String> {
        parse(line).unwrap().execute(program, memory).unwrap().text
    }

    #[test]
    fn abbreviations_and_numbers() {
        assert_eq!(
            parse("i 1F LDA #01"),
            Ok(Command::Insert {
                at: Some(0x1F),
                line: vec!["LDA".to_string(), "#01".to_string()],
            })
        );
        assert_eq!(parse("ins"), Ok(Command::Insert { at: None, line: vec![] }));
        assert_eq!(parse("l - 4"), Ok(Command::List { first: None, last: Some(4) }));
        assert_eq!(parse("l 3"), Ok(Command::List { first: Some(3), last: Some(3) }));
        assert_eq!(parse("c h"), Ok(Command::Compile(CompileAction::Hex)));
        assert_eq!(parse("st str"), Ok(Command::Stat { strings: true }));
        assert_eq!(
            parse("mo 1 2 A"),
            Ok(Command::Move { first: 1, last: 2, before: 10 })
        );
        assert_eq!(parse("d 2"), Ok(Command::Delete { first: Some(2), last: Some(2) }));
    }

    #[test]
    fn malformed_commands() {
        assert_eq!(parse(""), Err(CommandError::MissingCommand));
        assert_eq!(parse("x"), Err(CommandError::UnknownCommand("x".to_string())));
        assert_eq!(parse("replace 1"), Err(CommandError::MissingArgument("line")));
        assert_eq!(parse("move 1 2"), Err(CommandError::MissingArgument("num3")));
        assert_eq!(parse("list g"), Err(CommandError::BadNumber("g".to_string())));
        assert_eq!(parse("compile now"), Err(CommandError::UnknownArgument("now".to_string())));
        assert_eq!(parse("new 1"), Err(CommandError::TooManyArguments));
    }

    #[test]
    fn edit_and_install() {
        let mut program = Program::new();
        let mut memory = vec![0u8; 0x10000];

        let outcome = parse("insert").unwrap().execute(&mut program, &mut memory).unwrap();
        assert_eq!(outcome.stream, Some(0));

        run(&mut program, &mut memory, "insert 0 .ORG 0300");
        run(&mut program, &mut memory, "insert 1 LDA #01");
        run(&mut program, &mut memory, "insert 2 RTS");

        assert_eq!(
            run(&mut program, &mut memory, "list"),
            vec!["000          .ORG 0300", "001          LDA #01", "002          RTS"]
        );

        let text = run(&mut program, &mut memory, "compile install");

        assert_eq!(
            text,
            vec![
                "WARNING: reset vector missing (FFFC/FFFD), assuming 0200",
                "5 bytes installed",
                "errors 0, warnings 1",
            ]
        );
        assert_eq!(&memory[0x300..0x303], &[0xA9, 0x01, 0x60]);
        assert_eq!(&memory[0xFFFC..], &[0x00, 0x02]);
    }

    #[test]
    fn compile_errors_suppress_listing() {
        let mut program = Program::new();
        let mut memory = vec![0u8; 0x10000];

        run(&mut program, &mut memory, "insert 0 JMP away");

        let text = run(&mut program, &mut memory, "compile list");

        assert_eq!(
            text,
            vec![
                "WARNING: line 000: no .ORG, assuming 0200",
                "ERROR: line 000: no definition for away",
                "WARNING: reset vector missing (FFFC/FFFD), assuming 0200",
                "program has 1 compile error(s)",
                "errors 1, warnings 2",
            ]
        );
    }

    #[test]
    fn stat_strings() {
        let mut program = Program::new();
        let mut memory = vec![0u8; 0x10000];

        run(&mut program, &mut memory, "insert 0 ; hi");
        run(&mut program, &mut memory, "insert 1 .DB 00");

        assert_eq!(
            run(&mut program, &mut memory, "stat strings"),
            vec!["lines used 2/32", "labels used 2/63", "01 hi", "02 \\x80\\x80"]
        );

        run(&mut program, &mut memory, "new");
        assert_eq!(run(&mut program, &mut memory, "stat"), vec!["lines used 0/32", "labels used 0/63"]);
    }
}
