use prog6502::{
    arena::DEFAULT_SLOTS,
    emit,
    error::{EmitError, ProgramError},
    line::DEFAULT_LINES,
    Program,
};

use clap::{App, Arg, ArgMatches};
use slog::{o, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

enum Error {
    /// A source line was rejected. `line` counts from 1.
    Program { line: usize, error: ProgramError },
    Emit(EmitError),
    CompileErrors(usize),
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<EmitError> for Error {
    fn from(e: EmitError) -> Error {
        Error::Emit(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("prog6502asm")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Utility for assembling 6502 programs")
        .arg(Arg::with_name("source")
             .help("File containing the program, one line per text line")
             .value_name("SOURCE")
             .required(true)
             .index(1))
        .arg(Arg::with_name("list")
             .help("Print the listing")
             .long("list")
             .short("l"))
        .arg(Arg::with_name("map")
             .help("Print the symbol and section map")
             .long("map")
             .short("m"))
        .arg(Arg::with_name("hex")
             .help("Print a hex dump of the generated bytes")
             .long("hex")
             .short("x"))
        .arg(Arg::with_name("lines")
             .help("Number of program lines")
             .long("lines")
             .value_name("N")
             .takes_value(true))
        .arg(Arg::with_name("slots")
             .help("Number of string slots")
             .long("slots")
             .value_name("N")
             .takes_value(true))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

fn main() {
    let args = parse_arguments();

    match run(&args) {
        Ok(()) => (),
        Err(Error::IO(io)) => {
            eprintln!("IO error: {}", io);
            std::process::exit(2);
        }
        Err(Error::Program { line, error }) => {
            eprintln!("line {}: {}", line, error);
            std::process::exit(1);
        }
        Err(Error::Emit(error)) => {
            eprintln!("{}", error);
            std::process::exit(1);
        }
        Err(Error::CompileErrors(errors)) => {
            eprintln!("{} compile error(s)", errors);
            std::process::exit(1);
        }
    }
}

fn capacity(args: &ArgMatches, name: &str, default: usize) -> usize {
    args.value_of(name)
        .and_then(|text| text.parse::<usize>().ok())
        .unwrap_or(default)
}

fn run(args: &ArgMatches) -> Result<(), Error> {
    let file_path = args.value_of("source").unwrap_or_default();
    let source = std::fs::read_to_string(file_path)?;

    let mut program = Program::with_capacity(
        capacity(args, "lines", DEFAULT_LINES),
        capacity(args, "slots", DEFAULT_SLOTS),
    );

    if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        program = program.with_logger(Logger::root(drain, o!("file" => file_path.to_string())));
    }

    for (number, text) in source.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }

        let warnings = program
            .append_line(text)
            .map_err(|error| Error::Program { line: number + 1, error })?;

        for warning in warnings {
            println!("{}", warning);
        }
    }

    let result = program.compile();

    for diagnostic in &result.diagnostics {
        println!("{}", diagnostic);
    }

    if args.is_present("map") {
        for row in emit::map(program.arena(), &result) {
            println!("{}", row);
        }
    }

    if !result.is_ok() {
        return Err(Error::CompileErrors(result.errors()));
    }

    if args.is_present("list") {
        for row in emit::listing(program.arena(), program.lines(), &result)? {
            println!("{}", row);
        }
    }

    if args.is_present("hex") {
        for row in emit::hex_dump(program.arena(), program.lines(), &result)? {
            println!("{}", row);
        }
    }

    println!("{}", result.summary());

    Ok(())
}
