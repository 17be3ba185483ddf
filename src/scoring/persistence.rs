/// Game state persistence
///
/// The current game is rewritten after every scoring change through a temp
/// file in the same directory followed by a rename, so a crash leaves either
/// the previous or the new snapshot on disk. Finished games get a small
/// archive record under `completed/`.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::best_ball::Candidate;
use super::bowler::Bowler;
use crate::error::PersistenceError;

const CURRENT_GAME_FILE: &str = "current_game.json";
const COMPLETED_DIR: &str = "completed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: String,
    pub game_type: String,
    pub lane_id: u32,
    pub game_number: u32,
    /// Roster position of the bowler who is up
    pub current_turn_index: usize,
    #[serde(default)]
    pub held: bool,
    /// Best-ball results waiting for a pick
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_selection: Vec<Candidate>,
    pub bowlers: Vec<Bowler>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub name: String,
    pub final_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedGame {
    pub game_id: String,
    pub game_type: String,
    pub bowlers: Vec<FinalScore>,
}

#[derive(Debug, Clone)]
pub struct GameStore {
    root: PathBuf,
}

impl GameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_GAME_FILE)
    }

    pub fn archive_path(&self, game_id: &str) -> PathBuf {
        self.root.join(COMPLETED_DIR).join(format!("5pin_{game_id}.json"))
    }

    pub fn save_current(&self, snapshot: &GameSnapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(PersistenceError::SerializeFailed)?;
        write_atomic(&self.current_path(), &json)
    }

    /// The last saved snapshot, if any.
    pub fn load_current(&self) -> Result<Option<GameSnapshot>, PersistenceError> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| PersistenceError::ReadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let snapshot = serde_json::from_str(&content).map_err(|e| PersistenceError::ReadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        Ok(Some(snapshot))
    }

    pub fn clear_current(&self) -> Result<(), PersistenceError> {
        let path = self.current_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::WriteFailed {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    pub fn archive(&self, game: &CompletedGame) -> Result<PathBuf, PersistenceError> {
        let path = self.archive_path(&game.game_id);
        let json = serde_json::to_vec_pretty(game).map_err(PersistenceError::SerializeFailed)?;
        write_atomic(&path, &json)?;
        Ok(path)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| PersistenceError::DirectoryCreationFailed {
        path: dir.display().to_string(),
        source: e,
    })?;

    let write_failed = |source: std::io::Error| PersistenceError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    temp.write_all(bytes).map_err(write_failed)?;
    temp.as_file().sync_all().map_err(write_failed)?;
    temp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GameSnapshot {
        GameSnapshot {
            game_id: "20261014_190000-g1".to_string(),
            game_type: "5-pin".to_string(),
            lane_id: 3,
            game_number: 1,
            current_turn_index: 1,
            held: false,
            pending_selection: Vec::new(),
            bowlers: vec![Bowler::new(1, "Iron Man"), Bowler::new(2, "Superman")],
        }
    }

    #[test]
    fn test_save_and_load_current() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStore::new(dir.path().join("saves"));
        assert_eq!(store.load_current().unwrap(), None);

        store.save_current(&snapshot()).unwrap();
        assert_eq!(store.load_current().unwrap(), Some(snapshot()));

        // Only the canonical file remains after the rename.
        let entries: Vec<_> = fs::read_dir(store.root()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        store.clear_current().unwrap();
        assert_eq!(store.load_current().unwrap(), None);
        store.clear_current().unwrap();
    }

    #[test]
    fn test_snapshot_field_names() {
        let value = serde_json::to_value(snapshot()).unwrap();
        for field in ["game_id", "game_type", "current_turn_index", "bowlers"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_archive_holds_names_and_scores_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStore::new(dir.path());
        let game = CompletedGame {
            game_id: "20261014_190000-g1".to_string(),
            game_type: "5-pin".to_string(),
            bowlers: vec![FinalScore { name: "Snoopi".to_string(), final_score: 212 }],
        };

        let path = store.archive(&game).unwrap();
        assert!(path.ends_with("completed/5pin_20261014_190000-g1.json"));
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["bowlers"], serde_json::json!([{"name": "Snoopi", "final_score": 212}]));
    }

    #[test]
    fn test_corrupt_snapshot_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStore::new(dir.path());
        fs::write(store.current_path(), "{ not json").unwrap();
        assert!(matches!(store.load_current(), Err(PersistenceError::ReadFailed { .. })));
    }
}
