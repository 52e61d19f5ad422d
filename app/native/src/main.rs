#![allow(clippy::multiple_crate_versions)]

//! Sysbars - per-display system bar visibility policy.
//!
//! This binary exposes the policy evaluator and the policy daemon:
//! - `sysbars eval` / `sysbars policy` inspect a policy string or settings file
//! - `sysbars run` drives the per-display coordinators from stdin events

fn main() {
    if let Err(err) = sysbars_lib::cli::run() {
        eprintln!("sysbars: {err}");
        std::process::exit(1);
    }
}
