use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::debug;

/// Persistent storage for the single opaque bearer token. Absence of the
/// file (or an empty file) means unauthenticated. Written only by the
/// login and logout paths; read before every outgoing request.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("token"),
        }
    }

    pub fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    #[tracing::instrument(skip(self, token))]
    pub fn save(&self, token: &str) -> anyhow::Result<()> {
        debug!(file = %self.path.display(), "persisting session token");

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        writeln!(temp, "{token}")?;
        temp.flush()?;

        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        debug!(file = %self.path.display(), "clearing session token");
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let temp = tempdir().expect("tempdir");
        let store = TokenStore::new(temp.path());

        assert_eq!(store.load(), None);
        store.save("abc.def.ghi").expect("save");
        assert_eq!(store.load().as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn clear_is_idempotent() {
        let temp = tempdir().expect("tempdir");
        let store = TokenStore::new(temp.path());

        store.clear().expect("clear missing");
        store.save("tok").expect("save");
        store.clear().expect("clear");
        store.clear().expect("clear again");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn whitespace_only_file_counts_as_no_token() {
        let temp = tempdir().expect("tempdir");
        let store = TokenStore::new(temp.path());
        std::fs::write(temp.path().join("token"), "\n  \n").expect("write");
        assert_eq!(store.load(), None);
    }
}
