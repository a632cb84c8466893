use clap::{App, Arg, ArgMatches};

use rv32::{
    assembler::{first_pass, second_pass},
    lexer::split_lines,
    symbol_table::LabelTable,
};

fn parse_arguments() -> ArgMatches<'static> {
    App::new("rv32asm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility for assembling rv32 programs and printing the listing")
        .arg(
            Arg::with_name("source")
                .help("File containing assembly source")
                .value_name("SOURCE")
                .required(true)
                .index(1),
        )
        .get_matches()
}

fn main() {
    let args = parse_arguments();
    let source_path = args.value_of("source").unwrap();

    let text = match std::fs::read_to_string(source_path) {
        Ok(text) => text,
        Err(io) => {
            eprintln!("IO error: {}", io);
            std::process::exit(2);
        }
    };

    let source = split_lines(&text);
    let mut labels = LabelTable::new();

    let program = first_pass(&source, &mut labels).and_then(|_| second_pass(&source, &labels));

    match program {
        Ok(program) => {
            println!("{}", program);

            if !labels.is_empty() {
                println!();

                for label in labels.iter() {
                    println!("{:>16} = {}", label.name, label.pc);
                }
            }
        }
        Err(error) => {
            eprintln!("{}: {}", source_path, error);
            std::process::exit(1);
        }
    }
}
