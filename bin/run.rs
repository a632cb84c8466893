use clap::{App, Arg, ArgMatches};
use slog::{o, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use rv32::{
    emulator::{Context, MemoryLayout},
    error::suggest_mnemonic,
    lexer::{lex_line, split_lines},
    outcome::{run_with, Outcome, Stage},
};

enum Error {
    BadArgument(String),
    Failed,
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("rv32run")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility for assembling and executing rv32 programs")
        .arg(
            Arg::with_name("source")
                .help("File containing assembly source")
                .value_name("SOURCE")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("data")
                .long("data")
                .help("File whose bytes seed the data segment")
                .value_name("FILE")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("stack-size")
                .long("stack-size")
                .help("Stack segment size in bytes")
                .value_name("BYTES")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .help("Log the pipeline stages to the terminal"),
        )
        .get_matches()
}

fn main() {
    let args = parse_arguments();

    match run(&args) {
        Ok(()) => (),
        Err(Error::BadArgument(message)) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
        Err(Error::IO(io)) => {
            eprintln!("IO error: {}", io);
            std::process::exit(2);
        }
        Err(Error::Failed) => std::process::exit(1),
    }
}

fn run(args: &ArgMatches) -> Result<(), Error> {
    let source_path = args.value_of("source").unwrap();
    let text = std::fs::read_to_string(source_path)?;

    let data = match args.value_of("data") {
        Some(path) => std::fs::read(path)?,
        None => Vec::new(),
    };

    let mut layout = MemoryLayout::with_data_size(data.len());

    if let Some(size) = args.value_of("stack-size") {
        layout.stack_size = size
            .parse()
            .map_err(|_| Error::BadArgument(format!("invalid stack size: {}", size)))?;
    }

    let logger = match args.is_present("verbose") {
        true => {
            let decorator = TermDecorator::new().build();
            let drain = FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();

            Some(Logger::root(drain, o!()))
        }
        false => None,
    };

    let outcome = run_with(&text, &data, &Context::default(), layout, logger);

    if !outcome.ok {
        report_failure(&text, &outcome);

        if outcome.stage == Stage::Runtime {
            print_registers(&outcome);
        }

        return Err(Error::Failed);
    }

    println!(
        "halted normally after {} steps at pc {}",
        outcome.execution.steps, outcome.execution.pc
    );
    print_registers(&outcome);

    if !outcome.execution.data.is_empty() {
        println!();
        print_bytes(&outcome.execution.data);
    }

    Ok(())
}

fn report_failure(text: &str, outcome: &Outcome) {
    let message = outcome.error.map(|e| e.message).unwrap_or("unknown error");

    let stage = match outcome.stage {
        Stage::FirstPass | Stage::SecondPass => "assembly error",
        Stage::Runtime => "runtime trap",
        Stage::Ok => unreachable!(),
    };

    if outcome.line >= 0 {
        eprintln!("{} at line {}: {}", stage, outcome.line, message);
    } else {
        eprintln!("{}: {}", stage, message);
    }

    if message == "unknown mnemonic" {
        if let Some(candidate) = line_mnemonic(text, outcome.line).and_then(suggest_mnemonic) {
            eprintln!("        (did you mean '{}'?)", candidate);
        }
    }
}

/// The first token of the given 1-based source line.
fn line_mnemonic(text: &str, line: i32) -> Option<&str> {
    if line < 1 {
        return None;
    }

    let source = split_lines(text);
    let index = (line - 1) as usize;

    if index >= source.line_count() {
        return None;
    }

    lex_line(source.line(index)).tokens.first().copied()
}

fn print_registers(outcome: &Outcome) {
    for (row, registers) in outcome.execution.registers.chunks(4).enumerate() {
        let line = registers
            .iter()
            .enumerate()
            .map(|(column, value)| format!("x{:<2} = {:08x}", row * 4 + column, value))
            .collect::<Vec<_>>()
            .join("   ");

        println!("{}", line);
    }
}

fn print_bytes(bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex = chunk
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<Vec<_>>()
            .join(" ");

        let text: String = chunk
            .iter()
            .map(|&byte| match byte {
                0x20..=0x7e => byte as char,
                _ => '.',
            })
            .collect();

        println!("{:08x}  {:<47}  {}", row * 16, hex, text);
    }
}
