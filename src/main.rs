//! Slate CLI - REPL, file and one-liner execution

use std::env;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;

use log::{LevelFilter, Log, Metadata, Record};

use slate::codegen::vm;
use slate::errors::{render_eval_error, render_syntax_error, ErrorConfig};
use slate::{compile, parse, Config, Error, Interpreter, Mode, SourceMap, Value};

const USAGE: &str = "usage: slate [--compile|-c] [--dump] [--no-color] [FILE | -e CODE]";

/// Writes log records to stderr, filtered by `SLATE_LOG`
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging() {
    let level = env::var("SLATE_LOG")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[derive(Debug, Default)]
struct Options {
    mode: Mode,
    dump: bool,
    color: bool,
    file: Option<String>,
    code: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        color: io::stderr().is_terminal(),
        ..Options::default()
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--compile" | "-c" => options.mode = Mode::Compile,
            "--dump" => options.dump = true,
            "--no-color" => options.color = false,
            "-e" => match args.next() {
                Some(code) => options.code = Some(code),
                None => return Err("-e needs an argument".to_string()),
            },
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("unknown option '{flag}'\n{USAGE}")),
            _ if options.file.is_some() || options.code.is_some() => {
                return Err(format!("unexpected argument '{arg}'\n{USAGE}"));
            }
            _ => options.file = Some(arg),
        }
    }
    Ok(options)
}

fn main() -> ExitCode {
    init_logging();
    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    match (&options.file, &options.code) {
        (Some(path), _) => run_file(path, &options),
        (None, Some(code)) => run_code(code, "<command line>", &options),
        (None, None) => {
            repl(&options);
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &str, options: &Options) -> ExitCode {
    match fs::read_to_string(path) {
        Ok(source) => run_code(&source, path, options),
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_code(source: &str, name: &str, options: &Options) -> ExitCode {
    let config = Config::from_env().with_source_name(name);
    let mut interpreter = Interpreter::new(config);
    let errors = ErrorConfig::new(options.color).with_filename(name);
    match evaluate(source, name, &mut interpreter, options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render_error(&e, source, &errors));
            ExitCode::FAILURE
        }
    }
}

/// Parse `source` and run it in `interpreter`'s global frame with the
/// selected engine
fn evaluate(source: &str, name: &str, interpreter: &mut Interpreter, options: &Options) -> Result<Value, Error> {
    let program = parse(source, name)?;
    match options.mode {
        Mode::Interpret => Ok(interpreter.run(&program)?),
        Mode::Compile => {
            let unit = compile(&program)?;
            if options.dump {
                eprint!("{}", unit.disassemble());
            }
            Ok(vm::run_unit(interpreter, &unit)?)
        }
    }
}

fn render_error(err: &Error, source: &str, errors: &ErrorConfig) -> String {
    match err {
        Error::Syntax(e) => render_syntax_error(e, &SourceMap::new(source), errors),
        Error::Eval(e) => render_eval_error(e, errors),
        Error::Compile(e) => format!("Compile error: {e}"),
    }
}

fn repl(options: &Options) {
    let engine = match options.mode {
        Mode::Interpret => "interpreter",
        Mode::Compile => "compiled",
    };
    println!("Slate v0.1.0 ({engine}) - Type :help for help, :quit to exit");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let errors = ErrorConfig::new(options.color).with_filename("<repl>");
    let mut interpreter = Interpreter::new(Config::from_env().with_source_name("<repl>"));

    loop {
        print!("slate> ");
        if stdout.flush().is_err() {
            break;
        }

        let Some(line) = read_line(&stdin) else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with(':') {
            match trimmed {
                ":quit" | ":q" => break,
                ":help" | ":h" => {
                    println!("Commands:");
                    println!("  :quit, :q    Exit the REPL");
                    println!("  :help, :h    Show this help");
                    println!();
                    println!("A line ending in ':' starts a block; finish it with an empty line.");
                    println!();
                }
                _ => eprintln!("Unknown command: {trimmed}"),
            }
            continue;
        }

        let mut source = line.clone();
        if trimmed.ends_with(':') {
            loop {
                print!("  ...> ");
                if stdout.flush().is_err() {
                    break;
                }
                match read_line(&stdin) {
                    Some(more) if !more.trim().is_empty() => source.push_str(&more),
                    _ => break,
                }
            }
        }

        match evaluate(&source, "<repl>", &mut interpreter, options) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{}", value.repr()),
            Err(e) => eprintln!("{}", render_error(&e, &source, &errors)),
        }
    }

    println!("Goodbye!");
}

/// One line including its terminator; `None` at end of input
fn read_line(stdin: &io::Stdin) -> Option<String> {
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            Some(line)
        }
    }
}
