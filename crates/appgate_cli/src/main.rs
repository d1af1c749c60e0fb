//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `appgate_core` linkage.
//! - Exercise storage bootstrap end to end on a throwaway in-memory database.

use appgate_core::db::open_db_in_memory;
use appgate_core::db::registry::registered_permission_count;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("appgate_core ping={}", appgate_core::ping());
    println!("appgate_core version={}", appgate_core::core_version());

    let registered = open_db_in_memory()
        .map_err(|err| err.to_string())
        .and_then(|conn| registered_permission_count(&conn).map_err(|err| err.to_string()));

    match registered {
        Ok(count) => {
            println!("appgate_core permissions={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("appgate_core bootstrap_error={err}");
            ExitCode::FAILURE
        }
    }
}
