use git2::Oid;

const SHORT_HASH_LEN: usize = 7;

/// A commit read from a cloned repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    id: Oid,
    message: String,
}

impl Commit {
    pub fn id(&self) -> Oid {
        self.id
    }

    /// Full hexadecimal hash.
    pub fn hash(&self) -> String {
        self.id.to_string()
    }

    pub fn short_hash(&self) -> String {
        short(&self.hash()).to_string()
    }

    pub fn summary(&self) -> &str {
        first_line(&self.message)
    }
}

impl From<&git2::Commit<'_>> for Commit {
    fn from(commit: &git2::Commit<'_>) -> Self {
        Self {
            id: commit.id(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        }
    }
}

/// One entry of a changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub revision: String,
    pub message: String,
}

impl Change {
    pub fn short_revision(&self) -> &str {
        short(&self.revision)
    }

    pub fn summary(&self) -> &str {
        first_line(&self.message)
    }
}

impl From<&git2::Commit<'_>> for Change {
    fn from(commit: &git2::Commit<'_>) -> Self {
        Self {
            revision: commit.id().to_string(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}
