//! Layout of the conversation directory inside a project.
//!
//! ```text
//! <project>/.conversations/
//! ├── .gitignore      # ignores .state/ and .parts/
//! ├── index.md        # chain-grouped session list
//! ├── sessions/       # generated documents, rebuilt on every update
//! ├── .parts/         # rendered messages per session
//! └── .state/         # per-session sync state
//! ```

use crate::error::{Error, Result};
use crate::render::INDEX_HEADER;
use crate::state::JsonStateStore;
use std::path::{Path, PathBuf};

/// Entries the conversation `.gitignore` must carry.
const IGNORED: [&str; 2] = [".state/", ".parts/"];

/// Paths of one project's conversation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationDir {
    root: PathBuf,
}

impl ConversationDir {
    pub fn new(project_root: &Path, dir_name: &str) -> Self {
        Self {
            root: project_root.join(dir_name),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn parts_dir(&self) -> PathBuf {
        self.root.join(".parts")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".state")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.md")
    }

    pub fn gitignore_path(&self) -> PathBuf {
        self.root.join(".gitignore")
    }

    pub fn part_path(&self, session_id: &str) -> PathBuf {
        self.parts_dir().join(format!("{}.md", session_id))
    }

    pub fn state_store(&self) -> JsonStateStore {
        JsonStateStore::new(self.state_dir())
    }

    /// Set up before; a missing state dir means this is the first run.
    pub fn is_initialized(&self) -> bool {
        self.state_dir().is_dir()
    }

    /// Create the layout and repair the `.gitignore`. Safe to repeat.
    pub fn ensure_setup(&self) -> Result<()> {
        for dir in [self.sessions_dir(), self.parts_dir(), self.state_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| Error::file(&dir, e))?;
        }

        self.ensure_gitignore()?;

        let index = self.index_path();
        if !index.exists() {
            std::fs::write(&index, INDEX_HEADER).map_err(|e| Error::file(&index, e))?;
        }

        Ok(())
    }

    fn ensure_gitignore(&self) -> Result<()> {
        let path = self.gitignore_path();

        let mut content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::file(&path, e)),
        };

        let missing: Vec<&str> = IGNORED
            .iter()
            .copied()
            .filter(|entry| !content.lines().any(|line| line.trim() == *entry))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        for entry in missing {
            content.push_str(entry);
            content.push('\n');
        }

        std::fs::write(&path, content).map_err(|e| Error::file(&path, e))
    }

    /// Rendered messages for a session, if it has any.
    pub fn read_part(&self, session_id: &str) -> Option<String> {
        std::fs::read_to_string(self.part_path(session_id)).ok()
    }

    pub fn write_part(&self, session_id: &str, body: &str) -> Result<()> {
        let path = self.part_path(session_id);
        std::fs::write(&path, body).map_err(|e| Error::file(&path, e))
    }

    /// Session ids that have a part file, sorted.
    pub fn part_ids(&self) -> Vec<String> {
        let mut ids = markdown_stems(&self.parts_dir());
        ids.sort();
        ids
    }

    /// Remove every generated `sessions/*.md`.
    pub fn clear_sessions(&self) -> Result<()> {
        let dir = self.sessions_dir();
        let Ok(read_dir) = std::fs::read_dir(&dir) else {
            return Ok(());
        };
        for path in read_dir.flatten().map(|entry| entry.path()) {
            if path.extension().is_some_and(|ext| ext == "md") {
                std::fs::remove_file(&path).map_err(|e| Error::file(&path, e))?;
            }
        }
        Ok(())
    }

    pub fn write_session_doc(&self, file_name: &str, content: &str) -> Result<()> {
        let path = self.sessions_dir().join(file_name);
        std::fs::write(&path, content).map_err(|e| Error::file(&path, e))
    }

    pub fn write_index(&self, content: &str) -> Result<()> {
        let path = self.index_path();
        std::fs::write(&path, content).map_err(|e| Error::file(&path, e))
    }
}

fn markdown_stems(dir: &Path) -> Vec<String> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
        .collect()
}
