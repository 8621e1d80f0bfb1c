// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Word-frequency driver over the four map engines

use clap::{ArgAction, Parser};
use quadmap::words::words;
use quadmap::{AnyMap, Config, Dictionary, MapKind};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
    registry::Registry,
};

macro_rules! die {
    ($fmt:literal, $($arg:tt)*) => {{
        eprintln!($fmt, $($arg)*);
        std::process::exit(1);
    }};

    ($msg:literal) => {{
        eprintln!($msg);
        std::process::exit(1);
    }};

    () => {{
        eprintln!("Program terminated unexpectedly");
        std::process::exit(1);
    }};
}

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

pub fn init_tracing(quiet: bool, verbose: u8) -> (bool, LevelFilter) {
    let is_verbose = !quiet && verbose > 0;

    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Bridge log crate macros to tracing (for library code that uses log::*)
    tracing_log::LogTracer::init().expect("Failed to set log tracer");

    let registry = Registry::default();

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("WORDFREQ_LOG")
        .from_env_lossy();

    let subscriber = registry.with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact(),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        die!("INTERNAL ERROR: setting default tracing::subscriber failed");
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing_panic::panic_hook(info);
        prev_hook(info); // daisy-chain to old panic hook
    }));

    (is_verbose, level_filter)
}

/// Word-frequency driver over the four map engines
#[derive(Parser, Debug)]
#[command(name = "wordfreq")]
#[command(about = "Builds word-frequency dictionaries from books with the four map engines")]
struct ToolArgs {
    /// Suppress all output except for errors. This overrides the -v flag.
    #[arg(short, long)]
    quiet: bool,

    /// Turn on verbose output. Supply -v multiple times to increase verbosity.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Work list: `general_test STRUCTURE STEM RUNS`, or repeated
    /// `STRUCTURE STEM` pairs. STRUCTURE is one of dictionary_avl,
    /// dictionary_rbt, dictionary_chained_hash, dictionary_open_hash or all;
    /// STEM names livros/STEM.txt. Unknown tokens are skipped with a warning.
    #[arg(value_name = "TOKEN", required = true)]
    tokens: Vec<String>,
}

/// Canonical structure names and the engine families they select.
fn structure_kinds(token: &str) -> Option<Vec<(&'static str, MapKind)>> {
    match token {
        "dictionary_avl" => Some(vec![("dictionary_avl", MapKind::Avl)]),
        "dictionary_rbt" => Some(vec![("dictionary_rbt", MapKind::RedBlack)]),
        "dictionary_chained_hash" => Some(vec![("dictionary_chained_hash", MapKind::ChainedHash)]),
        "dictionary_open_hash" => Some(vec![("dictionary_open_hash", MapKind::OpenAddressing)]),
        "all" => Some(vec![
            ("dictionary_avl", MapKind::Avl),
            ("dictionary_rbt", MapKind::RedBlack),
            ("dictionary_chained_hash", MapKind::ChainedHash),
            ("dictionary_open_hash", MapKind::OpenAddressing),
        ]),
        _ => None,
    }
}

/// Reads `livros/<stem>.txt` and counts every normalized word into a fresh
/// dictionary of the given family.
fn build_dictionary(
    kind: MapKind,
    stem: &str,
) -> quadmap::Result<Dictionary<AnyMap<String, u64>>> {
    let path = Path::new("livros").join(format!("{stem}.txt"));
    let file = File::open(&path)?;

    let mut dictionary = Dictionary::new(Config::new(kind).open::<String, u64>());

    for line in BufReader::new(file).lines() {
        let line = line?;
        for word in words(&line) {
            *dictionary.entry_or_default(word)? += 1;
        }
    }

    Ok(dictionary)
}

/// Builds one dictionary and writes its report to
/// `resultados/<stem>_<structure>.txt`.
fn run_structure(structure: &str, kind: MapKind, stem: &str) -> quadmap::Result<()> {
    info!("building {structure} over livros/{stem}.txt");

    let dictionary = build_dictionary(kind, stem)?;

    let mut report = String::new();
    dictionary
        .show(&mut report)
        .expect("writing to a String cannot fail");

    std::fs::create_dir_all("resultados")?;
    let out_path = Path::new("resultados").join(format!("{stem}_{structure}.txt"));
    std::fs::write(&out_path, report)?;

    info!("wrote {}", out_path.display());
    Ok(())
}

/// Repeats the build and prints total and average construction time.
fn run_general_test(kinds: &[(&'static str, MapKind)], stem: &str, runs: u32) -> bool {
    let mut ok = true;

    for (structure, kind) in kinds {
        let mut total: u128 = 0;
        let mut structure_ok = true;

        for _ in 0..runs {
            match build_dictionary(*kind, stem) {
                Ok(dictionary) => total += dictionary.duration(),
                Err(e) => {
                    eprintln!("Falha ao construir {structure} sobre '{stem}': {e}");
                    ok = false;
                    structure_ok = false;
                    break;
                }
            }
        }

        if structure_ok {
            println!("{structure} x{runs} sobre '{stem}':");
            println!("  Tempo total de construção: {total}ms");
            println!(
                "  Tempo médio de construção: {}ms",
                total / u128::from(runs.max(1)),
            );
        }
    }

    ok
}

fn main() {
    let args = ToolArgs::parse();
    let (_, level_filter) = init_tracing(args.quiet, args.verbose);

    info!(
        "starting wordfreq ({} {}), log level: {level_filter}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let mut failed = false;
    let mut tokens = args.tokens.iter();

    while let Some(token) = tokens.next() {
        if token == "general_test" {
            let (Some(structure), Some(stem), Some(runs)) =
                (tokens.next(), tokens.next(), tokens.next())
            else {
                eprintln!("Erro: 'general_test' exige estrutura, arquivo e número de repetições");
                failed = true;
                break;
            };

            let Ok(runs) = runs.parse::<u32>() else {
                eprintln!("Erro: número de repetições inválido: '{runs}'");
                failed = true;
                continue;
            };

            match structure_kinds(structure) {
                Some(kinds) => {
                    if !run_general_test(&kinds, stem, runs) {
                        failed = true;
                    }
                }
                None => warn!("ignoring unknown structure {structure:?}"),
            }
        } else if let Some(kinds) = structure_kinds(token) {
            let Some(stem) = tokens.next() else {
                eprintln!("Erro: '{token}' exige um argumento de caminho");
                failed = true;
                break;
            };

            for (structure, kind) in kinds {
                if let Err(e) = run_structure(structure, kind, stem) {
                    eprintln!("Falha ao processar '{stem}' com {structure}: {e}");
                    failed = true;
                }
            }
        } else {
            warn!("ignoring unknown token {token:?}");
        }
    }

    if failed {
        std::process::exit(1);
    }
}
