//! insert command - Insert an entry into a changelog file

use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::changelog::insert_entry;
use crate::core::ops::{edit_file, Outcome};

/// Insert an entry read from `entry_file` (or stdin) under Unreleased.
pub fn insert(ctx: &Context, file: Option<&Path>, entry_file: Option<&Path>) -> Result<()> {
    let entry = match entry_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read entry from '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read entry from stdin")?;
            buf
        }
    };

    let path = ctx.changelog_file(file);
    let outcome = edit_file(&path, |text| insert_entry(text, &entry))?;
    match outcome {
        Outcome::Written => println!("Inserted entry into {}", path.display()),
        Outcome::Unchanged => println!("{} unchanged", path.display()),
    }
    Ok(())
}
