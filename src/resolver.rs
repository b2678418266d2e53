use git2::{Repository, Sort};
use log::{debug, trace};

use crate::commit::Commit;
use crate::error::NotFoundError;

/// Resolves a full or abbreviated commit hash by walking history from HEAD,
/// newest first, and returning the first commit whose hash starts with
/// `reference`.
///
/// An ambiguous prefix resolves to whichever match the walk reaches first;
/// no attempt is made to find a second match.
pub fn resolve_commit(repo: &Repository, reference: &str) -> Result<Commit, NotFoundError> {
    if reference.is_empty() {
        return Err(NotFoundError::revision(reference));
    }

    let walk_failed = |source: git2::Error| NotFoundError::Revision {
        reference: reference.to_string(),
        source: Some(source),
    };

    let mut revwalk = repo.revwalk().map_err(walk_failed)?;
    revwalk.push_head().map_err(walk_failed)?;
    revwalk.set_sorting(Sort::TIME).map_err(walk_failed)?;

    let mut visited = 0usize;
    for oid in revwalk {
        let oid = oid.map_err(walk_failed)?;
        visited += 1;
        if oid.to_string().starts_with(reference) {
            let commit = repo.find_commit(oid).map_err(walk_failed)?;
            debug!("Resolved {} to {} after {} commits", reference, oid, visited);
            return Ok(Commit::from(&commit));
        }
    }

    trace!("Walked {} commits without matching {}", visited, reference);
    Err(NotFoundError::revision(reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureRepo;

    #[test]
    fn test_resolve_short_hash() {
        let (fixture, ids) = FixtureRepo::linear(4);
        let target = ids[1];
        let short = &target.to_string()[..7];

        let commit = resolve_commit(&fixture.repo, short).unwrap();
        assert_eq!(commit.id(), target);
        assert_eq!(commit.summary(), "commit 1");
        assert_eq!(commit.short_hash(), short);
    }

    #[test]
    fn test_resolve_full_hash() {
        let (fixture, ids) = FixtureRepo::linear(3);
        let full = ids[0].to_string();

        let commit = resolve_commit(&fixture.repo, &full).unwrap();
        assert_eq!(commit.hash(), full);
        assert_eq!(commit.summary(), "commit 0");
    }

    #[test]
    fn test_resolve_unknown_hash() {
        let (fixture, ids) = FixtureRepo::linear(3);
        let unknown = "0000000000";
        if ids.iter().any(|id| id.to_string().starts_with(unknown)) {
            return;
        }

        let err = resolve_commit(&fixture.repo, unknown).unwrap_err();
        assert!(matches!(
            err,
            NotFoundError::Revision { ref reference, source: None } if reference == unknown
        ));
    }

    #[test]
    fn test_resolve_non_hex_reference() {
        let (fixture, _) = FixtureRepo::linear(2);
        let err = resolve_commit(&fixture.repo, "main").unwrap_err();
        assert!(matches!(err, NotFoundError::Revision { .. }));
    }

    #[test]
    fn test_resolve_empty_reference() {
        let (fixture, _) = FixtureRepo::linear(2);
        assert!(resolve_commit(&fixture.repo, "").is_err());
    }

    #[test]
    fn test_resolve_in_empty_repository() {
        let fixture = FixtureRepo::new();
        let err = resolve_commit(&fixture.repo, "abc1234").unwrap_err();
        assert!(matches!(err, NotFoundError::Revision { source: Some(_), .. }));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (fixture, ids) = FixtureRepo::linear(5);
        let short = &ids[3].to_string()[..8];

        let first = resolve_commit(&fixture.repo, short).unwrap();
        let second = resolve_commit(&fixture.repo, short).unwrap();
        assert_eq!(first.hash(), second.hash());
        assert_eq!(first.summary(), second.summary());
    }
}
