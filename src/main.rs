//! Command-line front end: validate catalogues and commands, encode a
//! command to its raw signal, round-trip a command through its wire
//! encoding and back, and list the loaded protocol catalogue.
//!
//! Grounded on the Python source's `__main__.py` for the subcommand shapes.
//! `convert` has no equivalent there (the original's `encode` subcommand
//! folds encode and decode together); it is its own subcommand here.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use remoteproto::{ProtocolDef, ProtocolRegistry, RemoteProtoError};

#[derive(Parser)]
#[command(name = "remoteproto", about = "Declarative IR/RF remote-control protocol toolkit", version)]
struct Cli {
    /// Extra catalogue file or directory to load alongside the builtin catalogue
    #[arg(long, global = true)]
    catalogue: Vec<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Validate one or more catalogue YAML files
    ValidateProtocol {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate one or more `name:arg:arg` command strings
    ValidateCommand {
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Encode commands and print the resulting raw signal
    Encode {
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Encode then decode commands, reporting every protocol that recognizes the result
    Convert {
        #[arg(required = true)]
        commands: Vec<String>,
        /// Fractional tolerance applied to burst matching (0.25 = 25%)
        #[arg(long, default_value_t = 0.25)]
        tolerance: f64,
        /// Restrict decoding to these protocol names (comma separated)
        #[arg(long = "protocols", value_delimiter = ',')]
        protocols: Vec<String>,
        /// Print match quality (uniqueness, tolerance used, toggle bit)
        #[arg(long)]
        verbose: bool,
    },
    /// List every protocol in the loaded catalogue
    List {
        protocols: Vec<String>,
        /// Print each protocol's argument list and signature
        #[arg(long)]
        verbose: bool,
        /// Render as a Markdown document instead of plain text
        #[arg(long)]
        markdown: bool,
    },
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with command output on stdout.
    let default_level = match cli.verbose {
        0 => "remoteproto=info",
        1 => "remoteproto=debug",
        _ => "remoteproto=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("remoteproto v{VERSION}");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_registry(extra: &[PathBuf]) -> anyhow::Result<ProtocolRegistry> {
    let mut registry = ProtocolRegistry::with_builtin()?;
    for path in extra {
        if path.is_dir() {
            registry.load_dir(path)?;
        } else {
            registry.load_file(path)?;
        }
    }
    Ok(registry)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::ValidateProtocol { files } => cmd_validate_protocol(&files),
        Command::ValidateCommand { commands } => cmd_validate_command(&cli.catalogue, &commands),
        Command::Encode { commands } => cmd_encode(&cli.catalogue, &commands),
        Command::Convert {
            commands,
            tolerance,
            protocols,
            verbose,
        } => cmd_convert(&cli.catalogue, &commands, tolerance, &protocols, verbose),
        Command::List {
            protocols,
            verbose,
            markdown,
        } => cmd_list(&cli.catalogue, &protocols, verbose, markdown),
    }
}

fn cmd_validate_protocol(files: &[PathBuf]) -> anyhow::Result<()> {
    let mut failed = 0usize;

    for file in files {
        let text = std::fs::read_to_string(file)?;
        let label = file.display().to_string();
        match remoteproto::catalogue::parse_catalogue(&label, &text) {
            Ok(protocols) => {
                for (name, _) in &protocols {
                    println!("{label}: {name}: OK");
                }
            }
            Err(RemoteProtoError::Catalogue(issues)) => {
                failed += 1;
                for issue in issues {
                    eprintln!("{issue}");
                }
            }
            Err(err) => {
                failed += 1;
                eprintln!("{label}: {err}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed validation");
    }
    Ok(())
}

fn cmd_validate_command(catalogue: &[PathBuf], commands: &[String]) -> anyhow::Result<()> {
    let registry = load_registry(catalogue)?;
    let mut failed = 0usize;

    for command in commands {
        match registry.parse_command(command) {
            Ok(parsed) => println!("{command}: OK -> {}", parsed.protocol.to_command(&parsed.args)),
            Err(err) => {
                failed += 1;
                eprintln!("{command}: {err}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} command(s) failed validation");
    }
    Ok(())
}

fn cmd_encode(catalogue: &[PathBuf], commands: &[String]) -> anyhow::Result<()> {
    let registry = load_registry(catalogue)?;
    for command in commands {
        let parsed = registry.parse_command(command)?;
        let signal = parsed.protocol.encode(&parsed.args)?;
        println!("{command}: {signal}");

        if let Some(duration) = registry.get_protocol("duration") {
            let raw_args = duration.decode(&signal, 0.0).into_iter().next().map(|m| m.args);
            if let Some(raw_args) = raw_args {
                println!("  {}", duration.to_command(&raw_args));
            }
        }
    }
    Ok(())
}

fn cmd_convert(catalogue: &[PathBuf], commands: &[String], tolerance: f64, protocols: &[String], verbose: bool) -> anyhow::Result<()> {
    let registry = load_registry(catalogue)?;
    let filter = if protocols.is_empty() { None } else { Some(protocols) };

    for command in commands {
        let mut matches = registry.convert(command, tolerance, filter)?;
        if matches.is_empty() {
            println!("{command}: no protocol decoded the resulting signal");
            continue;
        }

        // Alternative renderings are listed best-match-first.
        matches.sort_by(|a, b| a.tolerance.total_cmp(&b.tolerance));

        for m in &matches {
            let rendered = registry.get_protocol(&m.protocol).map(|p| p.to_command(&m.args)).unwrap_or_else(|| m.protocol.clone());

            if verbose {
                println!(
                    "{command}: {rendered} (unique={}, tolerance used={:.3}, toggle={})",
                    m.uniquematch, m.tolerance, m.toggle_bit
                );
            } else {
                println!("{command}: {rendered}");
            }
        }
    }
    Ok(())
}

fn cmd_list(catalogue: &[PathBuf], protocols: &[String], verbose: bool, markdown: bool) -> anyhow::Result<()> {
    let registry = load_registry(catalogue)?;
    let mut names = registry.list_protocols();
    if !protocols.is_empty() {
        names.retain(|n| protocols.iter().any(|p| p == n));
    }

    for name in names {
        let protocol = registry.get_protocol(name).expect("just listed from the same registry");

        if markdown {
            println!("## {name} ({})\n\n{}\n", protocol.kind(), protocol.desc());
            if verbose {
                println!("signature: `{}`\n", protocol.get_signature());
                for arg in protocol.args() {
                    println!("- `{}`: {}", arg.name, arg.desc);
                }
                println!();
            }
        } else if verbose {
            println!("{name} [{}]: {}", protocol.kind(), protocol.desc());
            println!("  signature: {}", protocol.get_signature());
            for arg in protocol.args() {
                println!("    {}: {}", arg.name, arg.desc);
            }
        } else {
            println!("{name} [{}]: {}", protocol.kind(), protocol.desc());
        }
    }
    Ok(())
}
