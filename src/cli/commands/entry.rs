//! entry command - Generate a changelog entry for a revision range
//!
//! Runs the diff and the entry generator locally, without pushing or opening
//! a pull request. With `--apply` the entry is inserted into the changelog
//! file on disk.

use std::path::Path;

use anyhow::{bail, Result};

use super::build_generator;
use crate::cli::Context;
use crate::core::changelog::insert_entry;
use crate::core::ops::edit_file;
use crate::git::extract_diff;

pub fn entry(ctx: &Context, old: &str, new: &str, apply: bool, file: Option<&Path>) -> Result<()> {
    let diff = extract_diff(&ctx.repo_path(), old, new)?;
    if diff.is_empty() {
        bail!("{old}..{new} changes no files");
    }

    let generator = build_generator(ctx)?;
    let rt = tokio::runtime::Runtime::new()?;
    let entry = rt.block_on(generator.generate(&diff.patch))?;

    if apply {
        let path = ctx.changelog_file(file);
        edit_file(&path, |text| insert_entry(text, &entry))?;
        println!("Inserted entry into {}", path.display());
    } else {
        println!("{entry}");
    }
    Ok(())
}
