//! `babydvm` — the BabyDuck virtual machine: loads a compiled `.obj`
//! bundle and runs it, printing one line per executed `PRINT`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use babyduck::bundle;
use babyduck::vm::VirtualMachine;

#[derive(Parser, Debug)]
#[command(name = "babydvm", about = "Run a compiled BabyDuck object bundle")]
struct Args {
    /// Path to the `.obj` bundle (the extension may be elided).
    path: PathBuf,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args.path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("runtime error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path) -> anyhow::Result<()> {
    let obj_path = resolve_obj_path(path);
    let mut file = fs::File::open(&obj_path)
        .with_context(|| format!("opening object file {}", obj_path.display()))?;
    let loaded = bundle::read_obj(&mut file)?;

    log::info!("running {}", loaded.header.filename);
    let vm = VirtualMachine::new(&loaded);
    let output = vm.run()?;
    for line in output {
        println!("{line}");
    }
    Ok(())
}

fn resolve_obj_path(path: &Path) -> PathBuf {
    if path.extension().is_some() || path.exists() {
        path.to_path_buf()
    } else {
        path.with_extension("obj")
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str())).init();
}
