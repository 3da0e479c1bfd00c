//! diff command - Print the diff between two revisions

use anyhow::Result;

use crate::cli::Context;
use crate::git::extract_diff;

/// Print the patch (or changed paths) between `old` and `new`.
pub fn diff(ctx: &Context, old: &str, new: &str, name_only: bool) -> Result<()> {
    let output = extract_diff(&ctx.repo_path(), old, new)?;
    if name_only {
        for path in &output.changed_files {
            println!("{path}");
        }
    } else {
        print!("{}", output.patch);
    }
    Ok(())
}
