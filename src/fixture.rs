//! Throwaway Git repositories for tests.

use git2::{Oid, Repository, Signature};
use std::path::Path;
use tempfile::TempDir;

pub struct FixtureRepo {
    pub repo: Repository,
    pub dir: TempDir,
}

impl Default for FixtureRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { repo, dir }
    }

    /// Working directory, usable as a clone URL.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Commits an empty tree on top of HEAD.
    pub fn commit(&self, message: &str) -> Oid {
        let parents = match self.repo.head() {
            Ok(head) => vec![head.target().unwrap()],
            Err(_) => vec![],
        };
        self.commit_with_parents(Some("HEAD"), message, &parents)
    }

    pub fn commit_with_parents(
        &self,
        update_ref: Option<&str>,
        message: &str,
        parents: &[Oid],
    ) -> Oid {
        let signature = Signature::now("imagediff", "imagediff@example.com").unwrap();
        let tree_id = self.repo.index().unwrap().write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let parents: Vec<git2::Commit> = parents
            .iter()
            .map(|id| self.repo.find_commit(*id).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        self.repo
            .commit(
                update_ref,
                &signature,
                &signature,
                message,
                &tree,
                &parent_refs,
            )
            .unwrap()
    }

    /// `root -> c1 -> c2 -> c3`, returned oldest first.
    pub fn linear(count: usize) -> (Self, Vec<Oid>) {
        let fixture = Self::new();
        let ids = (0..count)
            .map(|i| fixture.commit(&format!("commit {}\n\nbody of commit {}\n", i, i)))
            .collect();
        (fixture, ids)
    }
}
