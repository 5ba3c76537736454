//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open a store with the requested backend, initialize it and print stats.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `notevault [object|relational] [path]`. Without a path the store
//! lives in memory.

use notevault_core::{BackendKind, NoteStore, StoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let backend_arg = args.next().unwrap_or_else(|| "relational".to_string());
    let Some(backend) = BackendKind::parse(&backend_arg) else {
        eprintln!("unknown backend `{backend_arg}`; expected object|relational");
        return ExitCode::from(2);
    };
    let config = match args.next() {
        Some(path) => StoreConfig::at_path(backend, path),
        None => StoreConfig::in_memory(backend),
    };

    println!("notevault_core ping={}", notevault_core::ping());
    println!("notevault_core version={}", notevault_core::core_version());

    let mut store = NoteStore::open(config);
    if let Err(err) = store.initialize() {
        eprintln!("initialize failed: {err}");
        return ExitCode::FAILURE;
    }

    let result = store.get_stats().map(|stats| {
        println!("backend={}", store.backend_kind().as_str());
        println!("native_search={}", store.supports_native_search());
        println!(
            "notes={} categories={} tags={}",
            stats.note_count, stats.category_count, stats.tag_count
        );
    });
    if let Err(err) = result.and_then(|()| store.close()) {
        eprintln!("stats failed: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
