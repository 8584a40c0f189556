pub mod clock;
pub mod logging;

use anyhow::{Context, Result};
use std::path::PathBuf;
use which::which;

/// Finds the dump executable in the system PATH (or checks an explicit path).
pub fn find_dump_executable(program: &str) -> Result<PathBuf> {
    which(program).with_context(|| {
        format!(
            "{} executable not found in PATH. Please ensure the database client tools are installed and in your PATH.",
            program
        )
    })
}
