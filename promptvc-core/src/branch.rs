//! Named, append-only commit sequences

use crate::object::{Commit, CommitId};
use serde::{Deserialize, Serialize};

/// A branch: commits ordered oldest first. The last one is the head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    name: String,
    commits: Vec<Commit>,
}

impl Branch {
    /// Create an empty branch
    pub fn new(name: String) -> Self {
        Self {
            name,
            commits: Vec::new(),
        }
    }

    /// Create a branch holding a copy of `commits`
    pub fn with_commits(name: String, commits: Vec<Commit>) -> Self {
        Self { name, commits }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Head commit, `None` for an empty branch
    pub fn head(&self) -> Option<&Commit> {
        self.commits.last()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.commits.iter().any(|c| c.id() == id)
    }

    /// Whether this branch's history is a prefix of `other`'s
    pub fn is_prefix_of(&self, other: &Branch) -> bool {
        is_prefix(&self.commits, &other.commits)
    }

    pub(crate) fn push(&mut self, commit: Commit) {
        self.commits.push(commit);
    }

    pub(crate) fn pop(&mut self) -> Option<Commit> {
        self.commits.pop()
    }

    pub(crate) fn replace_commits(&mut self, commits: Vec<Commit>) {
        self.commits = commits;
    }
}

/// Prefix check by commit id
pub fn is_prefix(prefix: &[Commit], of: &[Commit]) -> bool {
    prefix.len() <= of.len() && prefix.iter().zip(of).all(|(a, b)| a.id() == b.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Snapshot;

    fn commit(msg: &str) -> Commit {
        Commit::new(msg.to_string(), Snapshot::new(msg))
    }

    #[test]
    fn test_head_is_last() {
        let mut branch = Branch::new("main".into());
        assert!(branch.head().is_none());

        let a = commit("a");
        let b = commit("b");
        branch.push(a);
        branch.push(b.clone());
        assert_eq!(branch.head().unwrap().id(), b.id());
        assert_eq!(branch.len(), 2);
    }

    #[test]
    fn test_is_prefix() {
        let a = commit("a");
        let b = commit("b");
        let c = commit("c");

        assert!(is_prefix(&[], &[a.clone()]));
        assert!(is_prefix(&[a.clone()], &[a.clone(), b.clone()]));
        assert!(is_prefix(&[a.clone(), b.clone()], &[a.clone(), b.clone()]));
        assert!(!is_prefix(&[a.clone(), c.clone()], &[a.clone(), b.clone()]));
        assert!(!is_prefix(&[a.clone(), b.clone()], &[a]));
    }
}
