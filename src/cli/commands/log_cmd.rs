//! log command - Display the tracked forest

use anyhow::Result;

use crate::cli::commands::open_session;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::engine::cache::MetaCache;

/// Print the tracked branches as a tree rooted at trunk, marking the current
/// branch and branches that need a restack.
pub fn log(ctx: &Context) -> Result<()> {
    let session = open_session(ctx)?;
    let mut rendered = String::new();
    render(&session.cache, session.cache.trunk(), 0, &mut rendered)?;
    print!("{rendered}");
    Ok(())
}

fn render(
    cache: &MetaCache,
    branch: &BranchName,
    depth: usize,
    out: &mut String,
) -> Result<()> {
    let marker = if cache.current_branch() == Some(branch) {
        "◉"
    } else {
        "◯"
    };
    let revision = cache.revision(branch)?;
    let note = if cache.is_branch_fixed(branch)? {
        ""
    } else {
        " (needs restack)"
    };
    out.push_str(&format!(
        "{}{marker} {branch} {}{note}\n",
        "  ".repeat(depth),
        revision.short(7),
    ));
    for child in cache.children(branch)? {
        render(cache, &child, depth + 1, out)?;
    }
    Ok(())
}
