//! release command - Stamp the Unreleased section with a date

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;

use crate::cli::Context;
use crate::core::changelog;
use crate::core::ops::{edit_file, Outcome};

/// Release the Unreleased section of a changelog file.
pub fn release(ctx: &Context, file: Option<&Path>, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(changelog::today);
    let path = ctx.changelog_file(file);

    let outcome = edit_file(&path, |text| changelog::release(text, date))?;
    match outcome {
        Outcome::Written => println!("Released {date} in {}", path.display()),
        Outcome::Unchanged => println!("No Unreleased section in {}; nothing to do", path.display()),
    }
    Ok(())
}
