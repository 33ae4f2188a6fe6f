use std::fmt;

use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use fpcore::{
    compile_with_logger,
    instruction::{Vec4, INPUT_NAMES, MAX_INPUTS, OUTPUT_NAMES},
    interpreter::{Interpreter, Outcome, SolidColor},
    span::{Fragment, Span},
};

enum Error {
    IO(std::io::Error),
    Parse(String),
    Argument(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(io) => write!(f, "IO error: {}", io),
            Error::Parse(msg) => write!(f, "Parse error {}", msg),
            Error::Argument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("fprun")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Utility for compiling and running NV_fragment_program programs")
        .arg(Arg::with_name("program")
             .help("File containing the fragment program")
             .value_name("PROGRAM")
             .required(true)
             .index(1))
        .arg(Arg::with_name("input")
             .help("Sets a fragment input, for example COL0=1,0,0,1")
             .long("input")
             .short("i")
             .value_name("NAME=X,Y,Z,W")
             .multiple(true)
             .number_of_values(1))
        .arg(Arg::with_name("param")
             .help("Sets a program local parameter, for example 0=1,1,1,1")
             .long("param")
             .short("p")
             .value_name("INDEX=X,Y,Z,W")
             .multiple(true)
             .number_of_values(1))
        .arg(Arg::with_name("texture")
             .help("Color returned by every texture lookup")
             .long("texture")
             .short("t")
             .value_name("X,Y,Z,W"))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

/// Parses `x,y,z,w`. Missing components default to `(0, 0, 0, 1)`.
fn parse_vector(text: &str) -> Result<Vec4, Error> {
    let mut value = [0.0, 0.0, 0.0, 1.0];

    for (i, part) in text.split(',').enumerate() {
        if i >= 4 {
            return Err(Error::Argument(format!("too many components in '{}'", text)));
        }

        value[i] = part
            .trim()
            .parse()
            .map_err(|_| Error::Argument(format!("invalid number '{}'", part)))?;
    }

    Ok(value)
}

fn split_assignment(text: &str) -> Result<(&str, Vec4), Error> {
    let mut parts = text.splitn(2, '=');

    match (parts.next(), parts.next()) {
        (Some(name), Some(value)) => Ok((name.trim(), parse_vector(value)?)),
        _ => Err(Error::Argument(format!("expected NAME=X,Y,Z,W, got '{}'", text))),
    }
}

fn run(args: &ArgMatches, logger: Logger) -> Result<(), Error> {
    let file_path = args.value_of("program").unwrap_or_default();
    let source = std::fs::read_to_string(file_path)?;

    let mut program = compile_with_logger(&source, logger.clone())
        .map_err(|err| Error::Parse(err.verbose(&source).to_string()))?;

    print!("{}", program);

    let mut inputs = [[0.0; 4]; MAX_INPUTS];

    for assignment in args.values_of("input").into_iter().flatten() {
        let (name, value) = split_assignment(assignment)?;

        let index = INPUT_NAMES
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| Error::Argument(format!("unknown input register '{}'", name)))?;

        inputs[index] = value;
    }

    for assignment in args.values_of("param").into_iter().flatten() {
        let (index, value) = split_assignment(assignment)?;

        let slot = index
            .parse::<usize>()
            .ok()
            .and_then(|index| program.local_parameters.get_mut(index))
            .ok_or_else(|| Error::Argument(format!("invalid local parameter '{}'", index)))?;

        *slot = value;
    }

    let texture = match args.value_of("texture") {
        Some(text) => parse_vector(text)?,
        None => [1.0; 4],
    };

    let span = Span::single(Fragment::new(inputs));
    let mut interpreter = Interpreter::with_logger(&program, SolidColor(texture), logger);

    match interpreter.execute(&span, 0) {
        Outcome::Killed => println!("fragment killed"),
        Outcome::Complete => {
            for (index, name) in OUTPUT_NAMES.iter().enumerate() {
                if program.writes_output(index) {
                    let value = interpreter.machine.outputs[index];
                    println!("o[{}] = ({}, {}, {}, {})", name, value[0], value[1], value[2], value[3]);
                }
            }
        },
    }

    Ok(())
}

fn main() {
    let args = parse_arguments();

    let logger = if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        Logger::root(drain, o!())
    } else {
        Logger::root(Discard, o!())
    };

    if let Err(err) = run(&args, logger) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
