//! `ydoc-inspect`: decode one or more updates (files, or stdin) and print
//! what they hold.
//!
//! Usage:
//!   ydoc-inspect [--state-vector] [--verbose] [FILE...]
//!
//! Without `--state-vector` the updates are applied to an empty document
//! and its JSON is printed, followed by any pending counts on stderr.

use std::io::{self, Read, Write};
use std::process;

use tracing_subscriber::EnvFilter;
use ydoc::{Document, Update};

fn main() {
    let mut state_vector = false;
    let mut verbose = false;
    let mut files = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--state-vector" => state_vector = true,
            "--verbose" => verbose = true,
            _ => files.push(arg),
        }
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let inputs = match read_inputs(&files) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let mut doc = Document::with_replica(0);
    let mut merged = Update::new();
    for (name, data) in &inputs {
        let update = match Update::decode(data) {
            Ok(update) => update,
            Err(e) => {
                eprintln!("{name}: {e}");
                process::exit(1);
            }
        };
        if state_vector {
            merged.merge(update);
        } else {
            doc.apply(update);
        }
    }

    let out = if state_vector {
        format!("{}\n", merged.state_vector())
    } else {
        match serde_json::to_string_pretty(&doc.to_json()) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    };
    if let Err(e) = io::stdout().write_all(out.as_bytes()) {
        eprintln!("{e}");
        process::exit(1);
    }

    let pending = doc.pending();
    if !pending.is_empty() {
        eprintln!(
            "pending: {} items, {} delete ranges",
            pending.items, pending.delete_ranges
        );
    }
}

fn read_inputs(files: &[String]) -> io::Result<Vec<(String, Vec<u8>)>> {
    if files.is_empty() {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        return Ok(vec![("<stdin>".to_owned(), buf)]);
    }
    files
        .iter()
        .map(|path| Ok((path.clone(), std::fs::read(path)?)))
        .collect()
}
