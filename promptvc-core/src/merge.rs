//! Fast-forward-or-flag merge policy
//!
//! Snapshots are opaque, so the only merge that can be automated safely is a
//! fast-forward: the target's history must be a prefix of the source's.
//! Anything else is reported as a conflict carrying both heads; resolving it
//! is left to the user, who composes new commits.

use crate::branch::Branch;
use crate::error::{Result, VcsError};

/// Result of a successful merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Target already had exactly the source's history
    UpToDate,
    /// Target now equals source; `added` commits were appended
    FastForwarded { added: usize },
}

/// Decide how `source` merges into `target` without touching either
pub fn plan(source: &Branch, target: &Branch) -> Result<MergeOutcome> {
    if !target.is_prefix_of(source) {
        return Err(VcsError::MergeConflict {
            source_branch: source.name().to_string(),
            target: target.name().to_string(),
            source_head: source.head().cloned().map(Box::new),
            target_head: target.head().cloned().map(Box::new),
        });
    }

    let added = source.len() - target.len();
    if added == 0 {
        Ok(MergeOutcome::UpToDate)
    } else {
        Ok(MergeOutcome::FastForwarded { added })
    }
}
