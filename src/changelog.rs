//! Changelog between two commits of the same history.
//!
//! [`walk_lineage`] hands the commits reachable from a starting point to a
//! visitor, children before parents, and the visitor decides whether to keep
//! going with [`ControlFlow`]. Commits reachable from an optional boundary are
//! hidden, so [`changelog`] only ever loads the commits in `(from, to]`, not
//! the history behind `from`.

use std::ops::ControlFlow;

use git2::{Oid, Repository, Sort};
use log::debug;

use crate::commit::{Change, Commit};
use crate::error::NotFoundError;

/// Visits the commits reachable from `start` and not from `boundary`.
///
/// Each commit is visited once and only after every visited commit that has
/// it as a parent, so merge histories come out in a valid topological order.
/// Among commits that are free to go next, the most recent one goes first.
/// Returns `ControlFlow::Break` if the visitor stopped the walk and
/// `ControlFlow::Continue` if every commit was visited.
pub fn walk_lineage<F>(
    repo: &Repository,
    start: Oid,
    boundary: Option<Oid>,
    mut visit: F,
) -> Result<ControlFlow<()>, git2::Error>
where
    F: FnMut(&git2::Commit<'_>) -> ControlFlow<()>,
{
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push(start)?;
    if let Some(boundary) = boundary {
        revwalk.hide(boundary)?;
    }

    for id in revwalk {
        let commit = repo.find_commit(id?)?;
        if visit(&commit).is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }

    Ok(ControlFlow::Continue(()))
}

/// Lists the changes after `from` up to and including `to`, most recent first.
///
/// A change is any commit reachable from `to` but not from `from`, which on a
/// merge history includes branches merged since `from`. Fails with
/// [`NotFoundError::Boundary`] when `from` is not an ancestor of `to`.
pub fn changelog(
    repo: &Repository,
    from: &Commit,
    to: &Commit,
) -> Result<Vec<Change>, NotFoundError> {
    let boundary_error = |source: git2::Error| NotFoundError::Boundary {
        hash: from.hash(),
        source: Some(source),
    };

    if from.id() == to.id() {
        return Ok(Vec::new());
    }
    if !repo
        .graph_descendant_of(to.id(), from.id())
        .map_err(boundary_error)?
    {
        return Err(NotFoundError::boundary(&from.hash()));
    }

    let mut changes = Vec::new();
    walk_lineage(repo, to.id(), Some(from.id()), |commit| {
        changes.push(Change::from(commit));
        ControlFlow::Continue(())
    })
    .map_err(boundary_error)?;

    debug!(
        "Found {} changes between {} and {}",
        changes.len(),
        from.short_hash(),
        to.short_hash()
    );
    Ok(changes)
}
