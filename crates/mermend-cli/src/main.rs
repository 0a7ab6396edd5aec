use mermend_core::{DiagramKind, NamingMode, RepairOptions, Repairer};
use serde::Serialize;
use std::io::{Read, Write};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Config(mermend_core::Error),
    Json(serde_json::Error),
    NoDiagram,
    Invalid(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Config(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::NoDiagram => write!(f, "No Mermaid diagram detected"),
            CliError::Invalid(reason) => write!(f, "Diagram is not structurally sound: {reason}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<mermend_core::Error> for CliError {
    fn from(value: mermend_core::Error) -> Self {
        Self::Config(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Extract,
    Repair,
    Validate,
    Detect,
    Fix,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    config: Option<String>,
    naming: Option<NamingMode>,
    out: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectOut {
    has_diagram_content: bool,
    kinds: Vec<DiagramKind>,
}

fn usage() -> &'static str {
    "mermend\n\
\n\
USAGE:\n\
  mermend [extract] [--pretty] [--config <json>] [--naming positional|headings] [--out <path>] [<path>|-]\n\
  mermend repair [--config <json>] [--out <path>] [<path>|-]\n\
  mermend validate [--pretty] [--config <json>] [<path>|-]\n\
  mermend detect [--pretty] [<path>|-]\n\
  mermend fix [--config <json>] [--naming positional|headings] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - extract prints a JSON object mapping diagram names to {kind, text, verdict}.\n\
  - repair treats the whole input as one diagram and prints the repaired text.\n\
  - validate exits with status 1 when the input is not structurally sound.\n\
  - fix prints the input with every diagram repaired in place.\n\
  - --config takes a JSON object, or a path to a file holding one; unknown keys are ignored.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "extract" => args.command = Command::Extract,
            "repair" => args.command = Command::Repair,
            "validate" => args.command = Command::Validate,
            "detect" => args.command = Command::Detect,
            "fix" => args.command = Command::Fix,
            "--pretty" => args.pretty = true,
            "--config" => {
                let Some(config) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(config.clone());
            }
            "--naming" => {
                let Some(mode) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.naming = Some(match mode.as_str() {
                    "positional" => NamingMode::Positional,
                    "headings" => NamingMode::Headings,
                    _ => return Err(CliError::Usage(usage())),
                });
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_options(args: &Args) -> Result<RepairOptions, CliError> {
    let mut options = match args.config.as_deref() {
        None => RepairOptions::default(),
        Some(inline) if inline.trim_start().starts_with('{') => {
            RepairOptions::from_json_str(inline)?
        }
        Some(path) => RepairOptions::from_json_str(&std::fs::read_to_string(path)?)?,
    };
    if let Some(naming) = args.naming {
        options.naming = naming;
    }
    Ok(options)
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    write_text(&text, out)
}

fn run(args: Args) -> Result<(), CliError> {
    let repairer = Repairer::with_options(load_options(&args)?)?;
    let text = read_input(args.input.as_deref())?;
    let out = args.out.as_deref();

    match args.command {
        Command::Extract => {
            let diagrams = repairer.parse_diagrams(&text);
            if diagrams.is_empty() {
                return Err(CliError::NoDiagram);
            }
            write_json(&diagrams, args.pretty, out)
        }
        Command::Repair => write_text(&repairer.repair(&text), out),
        Command::Validate => {
            let verdict = repairer.validate(&text);
            write_json(&verdict, args.pretty, out)?;
            match verdict.reason {
                Some(reason) if !verdict.is_valid => Err(CliError::Invalid(reason)),
                _ => Ok(()),
            }
        }
        Command::Detect => {
            let detected = DetectOut {
                has_diagram_content: repairer.has_diagram_content(&text),
                kinds: repairer.detect_kinds(&text),
            };
            write_json(&detected, args.pretty, out)
        }
        Command::Fix => write_text(&repairer.extract_and_fix(&text).content, out),
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(CliError::NoDiagram) => {
            eprintln!("{}", CliError::NoDiagram);
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
