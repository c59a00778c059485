//! `babydkc` — the BabyDuck compiler driver: `.baby` source in, `.obj`
//! bundle and `.ovejota` text dump out.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "babydkc", about = "Compile a BabyDuck source file")]
struct Args {
    /// Path to the `.baby` source file.
    src: PathBuf,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args.src) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(src_path: &Path) -> anyhow::Result<()> {
    let source = fs::read_to_string(src_path)
        .with_context(|| format!("reading source file {}", src_path.display()))?;

    let filename = src_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| src_path.display().to_string());

    log::info!("compiling {filename}");
    let bundle = babyduck::compile(&source, &filename)?;

    let base = src_path.with_extension("");
    let obj_path = base.with_extension("obj");
    let ovejota_path = base.with_extension("ovejota");

    let mut obj_file = fs::File::create(&obj_path)
        .with_context(|| format!("creating object file {}", obj_path.display()))?;
    babyduck::bundle::write_obj(&bundle, &mut obj_file)?;

    let dump = babyduck::bundle::render_ovejota(&bundle);
    fs::write(&ovejota_path, dump)
        .with_context(|| format!("writing dump file {}", ovejota_path.display()))?;

    log::info!("wrote {} and {}", obj_path.display(), ovejota_path.display());
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str())).init();
}
