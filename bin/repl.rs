use std::io::{self, BufRead, Write};

use clap::{App, Arg, ArgMatches};
use slog::{debug, o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use prog6502::{
    arena::DEFAULT_SLOTS,
    command::{Command, CommandError},
    line::DEFAULT_LINES,
    memory::ADDRESS_SPACE,
    Program,
};

const HELP: &[&str] = &[
    "Available commands:",
    "  prog insert [<num> [<line>]]    Insert a line, or stream lines until an empty line",
    "  prog replace <num> <line>       Replace a line",
    "  prog list [<num1> [<num2>]]     List lines, '-' for first or last",
    "  prog move <num1> <num2> <num3>  Move lines <num1>..<num2> before line <num3>",
    "  prog delete <num1> [<num2>]     Delete lines",
    "  prog compile [list|map|hex|install]",
    "  prog stat [strings]             Show memory usage",
    "  prog new                        Discard the program",
    "  help                            Show this text",
    "  quit                            Leave",
    "Numbers are hexadecimal, command names may be abbreviated.",
];

struct REPL {
    program: Program,
    memory: Vec<u8>,
    /// Next line of a streaming insert.
    stream: Option<usize>,
    logger: Logger,
}

impl REPL {
    fn new(lines: usize, slots: usize) -> REPL {
        REPL {
            program: Program::with_capacity(lines, slots),
            memory: vec![0; ADDRESS_SPACE],
            stream: None,
            logger: Logger::root(Discard, o!()),
        }
    }

    fn set_logger(&mut self, logger: Logger) {
        self.logger = logger.clone();
        self.program = std::mem::take(&mut self.program).with_logger(logger);
    }

    fn prompt(&self) -> String {
        match self.stream {
            Some(line) => format!("P:{:03X}> ", line),
            None => "> ".to_string(),
        }
    }

    fn stream_line(&mut self, at: usize, input: &str) {
        let fields: Vec<&str> = input.split_whitespace().collect();

        if fields.is_empty() {
            self.stream = None;
            return;
        }

        match self.program.insert(at, &fields) {
            Ok(warnings) => {
                for warning in warnings {
                    println!("{}", warning);
                }

                self.stream = Some(at + 1);
            }
            Err(err) => eprintln!("ERROR: {}", err),
        }
    }

    fn handle_command(&mut self, words: &[&str]) -> Result<(), CommandError> {
        let command = Command::parse(words)?;

        debug!(self.logger, "command"; "command" => ?command);

        let outcome = command.execute(&mut self.program, &mut self.memory)?;

        for line in outcome.text {
            println!("{}", line);
        }

        self.stream = outcome.stream;

        Ok(())
    }

    /// Returns `false` when the user wants to leave.
    fn handle_line(&mut self, input: &str) -> bool {
        if let Some(at) = self.stream {
            self.stream_line(at, input);
            return true;
        }

        let words: Vec<&str> = input.split_whitespace().collect();

        match words.as_slice() {
            [] => {}
            ["help"] => {
                for line in HELP {
                    println!("{}", line);
                }
            }
            ["quit"] | ["exit"] => return false,
            [prog, rest @ ..] if prog.eq_ignore_ascii_case("prog") => {
                if let Err(err) = self.handle_command(rest) {
                    eprintln!("ERROR: {}", err);
                }
            }
            [other, ..] => eprintln!("unknown command '{}', try help", other),
        }

        true
    }

    fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        writeln!(output, "Type help for a list of all available commands")?;

        let mut line = String::new();

        loop {
            write!(output, "{}", self.prompt())?;
            output.flush()?;

            line.clear();

            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }

            if !self.handle_line(&line) {
                return Ok(());
            }
        }
    }
}

fn parse_args() -> ArgMatches<'static> {
    App::new("prog6502repl")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Interactive line editor and assembler for 6502 programs")
        .arg(
            Arg::with_name("verbose")
                .help("Enables verbose logging")
                .long("verbose")
                .short("v"),
        )
        .arg(
            Arg::with_name("lines")
                .help("Number of program lines")
                .long("lines")
                .value_name("N")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("slots")
                .help("Number of string slots")
                .long("slots")
                .value_name("N")
                .takes_value(true),
        )
        .get_matches()
}

fn capacity(args: &ArgMatches, name: &str, default: usize) -> usize {
    match args.value_of(name).map(|text| text.parse::<usize>()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            eprintln!("invalid --{}, using {}", name, default);
            default
        }
        None => default,
    }
}

fn main() {
    let args = parse_args();

    let lines = capacity(&args, "lines", DEFAULT_LINES);
    let slots = capacity(&args, "slots", DEFAULT_SLOTS);

    let mut repl = REPL::new(lines, slots);

    if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        repl.set_logger(Logger::root(drain, o!()));
    }

    let stdin = io::stdin();

    if let Err(err) = repl.run(stdin.lock(), io::stdout()) {
        eprintln!("IO error: {}", err);
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"))
        }
    }

    #[test]
    fn run_stops_at_quit() {
        let mut repl = REPL::new(8, 16);
        let mut output = Vec::new();

        repl.run(&b"quit\n"[..], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Type help"), "{}", text);
        assert!(text.ends_with("> "), "{}", text);
    }

    #[test]
    fn run_reports_failed_flush() {
        let mut repl = REPL::new(8, 16);

        let err = repl.run(&b"quit\n"[..], ClosedOutput).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
