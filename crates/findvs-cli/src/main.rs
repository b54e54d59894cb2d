use std::fmt::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{LevelFilter, debug};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use findvs::InstanceRecord;

/// Locate installed Visual Studio instances.
#[derive(Parser, Debug)]
#[command(name = "findvs", version)]
struct Args {
    /// Log level: off, error, warn, info, debug or trace.
    #[arg(short, long, default_value = "warn", global = true)]
    verbosity: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List installed instances.
    List(ListOpts),
    /// Print the product version embedded in an executable or DLL.
    Version { path: PathBuf },
}

#[derive(clap::Args, Debug, Default)]
struct ListOpts {
    /// Also list every installed package.
    #[arg(long)]
    packages: bool,

    /// Print a JSON array instead of text.
    #[arg(long)]
    json: bool,

    /// Only instances that have this package. May be repeated; all must match.
    #[arg(long = "with-all", value_name = "ID")]
    with_all: Vec<String>,

    /// Only instances that have at least one of these packages. May be repeated.
    #[arg(long = "with-any", value_name = "ID")]
    with_any: Vec<String>,
}

enum Failure {
    #[cfg_attr(not(windows), allow(dead_code))]
    Platform(findvs::Error),
    Json(serde_json::Error),
    #[cfg_attr(windows, allow(dead_code))]
    Unsupported,
}

impl From<findvs::Error> for Failure {
    fn from(error: findvs::Error) -> Self {
        Self::Platform(error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform(error) => core::write!(f, "{error}"),
            Self::Json(error) => core::write!(f, "failed to write JSON: {error}"),
            Self::Unsupported => f.write_str("Visual Studio can only be located on Windows"),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _ = TermLogger::init(
        args.verbosity,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Platform(error)) => {
            eprintln!("{error}");
            // FIXME: use ExitCode once ExitCode::from_raw is stable.
            std::process::exit(error.code().0)
        }
        Err(failure) => {
            eprintln!("{failure}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Failure> {
    match command {
        Command::List(opts) => {
            let instances = select(instances()?, &opts);
            debug!("{} instance(s) after filtering", instances.len());
            if opts.json {
                let json = serde_json::to_string_pretty(&instances).map_err(Failure::Json)?;
                println!("{json}");
            } else if instances.is_empty() {
                println!("Visual Studio is not installed");
            } else {
                print!("{}", render(&instances, opts.packages));
            }
            Ok(())
        }
        Command::Version { path } => {
            match product_version(&path)? {
                Some(version) => println!("{version}"),
                None => println!("{} has no product version", path.display()),
            }
            Ok(())
        }
    }
}

#[cfg(windows)]
fn instances() -> Result<Vec<InstanceRecord>, Failure> {
    Ok(findvs::enumerate()?)
}

#[cfg(not(windows))]
fn instances() -> Result<Vec<InstanceRecord>, Failure> {
    Err(Failure::Unsupported)
}

#[cfg(windows)]
fn product_version(path: &std::path::Path) -> Result<Option<String>, Failure> {
    Ok(findvs::read_product_version(path)?)
}

#[cfg(not(windows))]
fn product_version(_path: &std::path::Path) -> Result<Option<String>, Failure> {
    Err(Failure::Unsupported)
}

/// Apply the `--with-all` and `--with-any` filters.
fn select(mut instances: Vec<InstanceRecord>, opts: &ListOpts) -> Vec<InstanceRecord> {
    instances.retain(|instance| instance.has_all_packages(&opts.with_all));
    if !opts.with_any.is_empty() {
        instances.retain(|instance| instance.has_any_package(&opts.with_any));
    }
    instances
}

fn render(instances: &[InstanceRecord], packages: bool) -> String {
    let mut out = String::new();
    for (i, instance) in instances.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        // Writing to a String can't fail.
        let _ = writeln!(out, "displayName: {}", instance.display_name);
        let _ = writeln!(out, "instanceId: {}", instance.instance_id);
        let _ = writeln!(out, "installationVersion: {}", instance.version);
        let _ = writeln!(out, "installationPath: {}", instance.install_path.display());
        let _ = writeln!(out, "enginePath: {}", instance.engine_path.display());
        if packages {
            out.push_str("packages: [\n");
            for package in &instance.packages {
                let _ = writeln!(out, "    {} {} ({})", package.id, package.version, package.kind);
            }
            out.push_str("]\n");
        } else {
            let _ = writeln!(out, "packages: {}", instance.packages.len());
        }
    }
    out
}
