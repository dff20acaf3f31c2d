use std::sync::Arc;

use crate::config::PersistenceMode;
use crate::error::{MoveError, PersistenceError, SessionError};
use crate::game::{GameRules, GameSession, GameStatus, Player};
use crate::store::DocumentStore;

use super::codec;
use super::writer::WriteQueue;

/// Message shown when the chosen column cannot take another piece.
pub const COLUMN_FULL_NOTICE: &str = "Column is full, choose another column";

/// What happened on a [`GameController::drop_piece`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveNotice {
    /// The piece landed and the game goes on.
    Placed { column: usize },
    Won(Player),
    Draw,
    /// Nothing changed: the column has no empty cell.
    ColumnFull { column: usize },
    /// Nothing changed: the game had already ended.
    GameOver,
}

impl MoveNotice {
    /// Text for the player, if this outcome deserves one.
    pub fn message(self) -> Option<String> {
        match self {
            MoveNotice::Placed { .. } => None,
            MoveNotice::Won(player) => Some(format!("{} wins!", player.name())),
            MoveNotice::Draw => Some("It's a draw!".to_string()),
            MoveNotice::ColumnFull { .. } => Some(COLUMN_FULL_NOTICE.to_string()),
            MoveNotice::GameOver => Some("Game over! Press 'r' to restart.".to_string()),
        }
    }

    /// True when the session was left unchanged.
    pub fn is_rejected(self) -> bool {
        matches!(self, MoveNotice::ColumnFull { .. } | MoveNotice::GameOver)
    }
}

/// Result of a move request: the session to show next and what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub session: GameSession,
    pub notice: MoveNotice,
}

/// Drives a single game persisted under one document key.
///
/// The controller never holds the live session; callers pass the current
/// value in and keep the one handed back.
pub struct GameController {
    store: Arc<dyn DocumentStore>,
    writer: WriteQueue,
    rules: GameRules,
    key: String,
    mode: PersistenceMode,
}

impl GameController {
    /// Create a controller and start its write queue. Must be called from
    /// within a Tokio runtime.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        rules: GameRules,
        key: impl Into<String>,
        mode: PersistenceMode,
    ) -> Self {
        let key = key.into();
        let writer = WriteQueue::spawn(store.clone(), key.clone());
        GameController {
            store,
            writer,
            rules,
            key,
            mode,
        }
    }

    pub fn document_key(&self) -> &str {
        &self.key
    }

    /// Load the stored game, or create and store a fresh one.
    ///
    /// Storage failures never stop play: if the document cannot be read or
    /// decoded, a fresh in-memory session is returned and nothing is written.
    pub async fn initialize(&self) -> GameSession {
        let document = match self.store.get(&self.key).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(
                    "Could not load game '{}', playing without saved state: {}",
                    self.key,
                    e
                );
                return GameSession::new(&self.rules);
            }
        };

        match document {
            Some(document) => match codec::decode(&self.key, &document, &self.rules) {
                Ok(session) => {
                    tracing::info!(
                        "Resumed game '{}' after {} moves ({:?})",
                        self.key,
                        session.moves(),
                        session.status()
                    );
                    session
                }
                Err(e) => {
                    tracing::warn!("Ignoring unreadable game '{}': {}", self.key, e);
                    GameSession::new(&self.rules)
                }
            },
            None => {
                tracing::info!("No saved game '{}', creating a new one", self.key);
                let session = GameSession::new(&self.rules);
                // Stored before it is served; a failure only costs durability.
                if let Err(e) = self.writer.write(codec::encode(&session), false).await {
                    tracing::warn!("Could not store new game '{}': {}", self.key, e);
                }
                session
            }
        }
    }

    /// Drop the current player's piece into `column`.
    ///
    /// A full column or a finished game leaves the session unchanged and is
    /// reported through [`Turn::notice`]. An out-of-range column is a caller
    /// bug and returns [`SessionError::InvalidColumn`].
    pub async fn drop_piece(
        &self,
        session: &GameSession,
        column: usize,
    ) -> Result<Turn, SessionError> {
        let next = match session.apply_move(column, &self.rules) {
            Ok(next) => next,
            Err(MoveError::GameOver) => {
                return Ok(Turn {
                    session: session.clone(),
                    notice: MoveNotice::GameOver,
                });
            }
            Err(MoveError::ColumnFull { column }) => {
                tracing::debug!("Column {} is full", column);
                return Ok(Turn {
                    session: session.clone(),
                    notice: MoveNotice::ColumnFull { column },
                });
            }
            Err(MoveError::InvalidColumn { column, cols }) => {
                return Err(SessionError::InvalidColumn { column, cols });
            }
        };

        let notice = match next.status() {
            GameStatus::InProgress => MoveNotice::Placed { column },
            GameStatus::Won(player) => {
                tracing::info!(
                    "{} won in {} moves, score {}",
                    player.name(),
                    next.moves(),
                    next.score()
                );
                MoveNotice::Won(player)
            }
            GameStatus::Draw => {
                tracing::info!("Game ended in a draw after {} moves", next.moves());
                MoveNotice::Draw
            }
        };

        self.persist(&next, true).await?;
        Ok(Turn {
            session: next,
            notice,
        })
    }

    /// Start over with an empty board and the starting player, replacing the
    /// stored document.
    pub async fn restart(&self) -> Result<GameSession, SessionError> {
        let session = GameSession::new(&self.rules);
        tracing::info!("Restarting game '{}'", self.key);
        self.persist(&session, false).await?;
        Ok(session)
    }

    /// Wait for queued writes. Reports the latest background write failure.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.writer.flush().await
    }

    async fn persist(&self, session: &GameSession, merge: bool) -> Result<(), PersistenceError> {
        let document = codec::encode(session);
        match self.mode {
            PersistenceMode::BestEffort => {
                self.writer.submit(document, merge);
                Ok(())
            }
            PersistenceMode::MustSucceed => self.writer.write(document, merge).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Cell, ROWS};
    use crate::store::{Document, JsonFileStore, MemoryStore};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const KEY: &str = "games/partidaActual";

    /// Store whose reads and writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        reads_fail: AtomicBool,
        writes_fail: AtomicBool,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<Document>, PersistenceError> {
            if self.reads_fail.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unavailable("reads disabled".into()));
            }
            self.inner.get(key).await
        }

        async fn put(
            &self,
            key: &str,
            document: Document,
            merge: bool,
        ) -> Result<(), PersistenceError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.writes_fail.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unavailable("writes disabled".into()));
            }
            self.inner.put(key, document, merge).await
        }
    }

    fn controller(store: Arc<FlakyStore>, mode: PersistenceMode) -> GameController {
        GameController::new(store, GameRules::default(), KEY, mode)
    }

    async fn stored(store: &FlakyStore) -> Option<Document> {
        store.inner.get(KEY).await.unwrap()
    }

    async fn play(
        controller: &GameController,
        mut session: GameSession,
        columns: &[usize],
    ) -> GameSession {
        for &col in columns {
            session = controller.drop_piece(&session, col).await.unwrap().session;
        }
        session
    }

    #[tokio::test]
    async fn test_initialize_creates_and_stores_fresh_game() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store.clone(), PersistenceMode::BestEffort);

        let session = controller.initialize().await;
        assert_eq!(session, GameSession::new(&GameRules::default()));

        // Written before initialize returned, and equal to a restart
        let document = stored(&store).await.expect("document created");
        let restarted = controller.restart().await.unwrap();
        assert_eq!(document, codec::encode(&restarted));
        assert_eq!(session, restarted);
    }

    #[tokio::test]
    async fn test_initialize_resumes_stored_game() {
        let store = Arc::new(FlakyStore::default());
        let first = controller(store.clone(), PersistenceMode::BestEffort);
        let session = first.initialize().await;
        let session = play(&first, session, &[3, 4, 3]).await;
        first.flush().await.unwrap();

        let second = controller(store.clone(), PersistenceMode::BestEffort);
        let resumed = second.initialize().await;
        assert_eq!(resumed, session);
        assert_eq!(resumed.current_player(), Player::Yellow);
        assert_eq!(resumed.moves(), 3);
    }

    #[tokio::test]
    async fn test_initialize_falls_back_when_store_is_down() {
        let store = Arc::new(FlakyStore::default());
        store.reads_fail.store(true, Ordering::SeqCst);
        let controller = controller(store.clone(), PersistenceMode::BestEffort);

        let session = controller.initialize().await;
        assert_eq!(session, GameSession::new(&GameRules::default()));
        // No write is attempted after a failed load
        controller.flush().await.unwrap();
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialize_keeps_unreadable_document() {
        let store = Arc::new(FlakyStore::default());
        let bad = json!({"moves": "many"}).as_object().cloned().unwrap();
        store.inner.put(KEY, bad.clone(), false).await.unwrap();
        let controller = controller(store.clone(), PersistenceMode::BestEffort);

        let session = controller.initialize().await;
        assert_eq!(session.moves(), 0);
        controller.flush().await.unwrap();
        assert_eq!(stored(&store).await, Some(bad));
    }

    #[tokio::test]
    async fn test_initialize_survives_failed_create() {
        let store = Arc::new(FlakyStore::default());
        store.writes_fail.store(true, Ordering::SeqCst);
        let controller = controller(store.clone(), PersistenceMode::BestEffort);

        let session = controller.initialize().await;
        assert_eq!(session.status(), GameStatus::InProgress);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_vertical_win_in_column_three() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store.clone(), PersistenceMode::BestEffort);
        let mut session = controller.initialize().await;

        // Red in column 3, Yellow in column 0 in between
        for turn in 0..4 {
            let red = controller.drop_piece(&session, 3).await.unwrap();
            session = red.session;
            if turn < 3 {
                assert_eq!(red.notice, MoveNotice::Placed { column: 3 });
                session = controller.drop_piece(&session, 0).await.unwrap().session;
            } else {
                assert_eq!(red.notice, MoveNotice::Won(Player::Red));
            }
        }

        assert_eq!(session.status(), GameStatus::Won(Player::Red));
        assert_eq!(session.moves(), 7);
        assert_eq!(session.score(), 43);
        let line = session.board().winning_line().unwrap();
        let mut cells = line.cells.clone();
        cells.sort();
        assert_eq!(cells, vec![(2, 3), (3, 3), (4, 3), (5, 3)]);

        controller.flush().await.unwrap();
        let document = stored(&store).await.unwrap();
        assert_eq!(document["winner"], json!("🔴"));
        assert_eq!(document["gameOver"], json!(true));
        assert_eq!(document["score"], json!(43));
    }

    #[tokio::test]
    async fn test_full_column_leaves_session_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store.clone(), PersistenceMode::BestEffort);
        let session = controller.initialize().await;
        let session = play(&controller, session, &[5; ROWS]).await;
        controller.flush().await.unwrap();
        let puts_before = store.puts.load(Ordering::SeqCst);

        let turn = controller.drop_piece(&session, 5).await.unwrap();
        assert_eq!(turn.notice, MoveNotice::ColumnFull { column: 5 });
        assert_eq!(turn.notice.message().as_deref(), Some(COLUMN_FULL_NOTICE));
        assert!(turn.notice.is_rejected());
        assert_eq!(turn.session, session);
        assert_eq!(turn.session.status(), GameStatus::InProgress);

        controller.flush().await.unwrap();
        assert_eq!(store.puts.load(Ordering::SeqCst), puts_before);
    }

    #[tokio::test]
    async fn test_invalid_column_is_an_error() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store, PersistenceMode::BestEffort);
        let session = controller.initialize().await;

        let err = controller.drop_piece(&session, 7).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidColumn { column: 7, cols: 7 }
        ));
    }

    #[tokio::test]
    async fn test_moves_after_win_are_ignored() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store, PersistenceMode::BestEffort);
        let session = controller.initialize().await;
        let won = play(&controller, session, &[0, 0, 1, 1, 2, 2, 3]).await;

        let turn = controller.drop_piece(&won, 4).await.unwrap();
        assert_eq!(turn.notice, MoveNotice::GameOver);
        assert_eq!(turn.session, won);
    }

    #[tokio::test]
    async fn test_restart_after_win_resets_and_persists() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store.clone(), PersistenceMode::BestEffort);
        let session = controller.initialize().await;
        let won = play(&controller, session, &[0, 0, 1, 1, 2, 2, 3]).await;
        assert!(won.is_terminal());

        let fresh = controller.restart().await.unwrap();
        assert!(fresh
            .board()
            .row(ROWS - 1)
            .iter()
            .all(|&cell| cell == Cell::Empty));
        assert_eq!(fresh.status(), GameStatus::InProgress);
        assert_eq!(fresh.moves(), 0);
        assert_eq!(fresh.score(), 0);
        assert_eq!(fresh.current_player(), Player::Red);

        controller.flush().await.unwrap();
        let document = stored(&store).await.unwrap();
        assert_eq!(document, codec::encode(&fresh));
        assert_eq!(document["winner"], Value::Null);
    }

    #[tokio::test]
    async fn test_best_effort_keeps_playing_when_writes_fail() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store.clone(), PersistenceMode::BestEffort);
        let session = controller.initialize().await;
        store.writes_fail.store(true, Ordering::SeqCst);

        let turn = controller.drop_piece(&session, 2).await.unwrap();
        assert_eq!(turn.session.moves(), 1);
        assert!(controller.flush().await.is_err());

        // Stored copy is the last successful write
        let document = stored(&store).await.unwrap();
        assert_eq!(document["moves"], json!(0));

        store.writes_fail.store(false, Ordering::SeqCst);
        let turn = controller.drop_piece(&turn.session, 2).await.unwrap();
        controller.flush().await.unwrap();
        assert_eq!(stored(&store).await.unwrap()["moves"], json!(2));
        assert_eq!(turn.session.moves(), 2);
    }

    #[tokio::test]
    async fn test_must_succeed_surfaces_write_failure() {
        let store = Arc::new(FlakyStore::default());
        let controller = controller(store.clone(), PersistenceMode::MustSucceed);
        let session = controller.initialize().await;
        store.writes_fail.store(true, Ordering::SeqCst);

        let err = controller.drop_piece(&session, 1).await.unwrap_err();
        assert!(matches!(err, SessionError::Persistence(_)));
        assert!(controller.restart().await.is_err());

        store.writes_fail.store(false, Ordering::SeqCst);
        let turn = controller.drop_piece(&session, 1).await.unwrap();
        // Written before drop_piece returned
        assert_eq!(stored(&store).await.unwrap()["moves"], json!(1));
        assert_eq!(turn.session.moves(), 1);
    }

    #[tokio::test]
    async fn test_moves_merge_into_legacy_document() {
        let store = Arc::new(FlakyStore::default());
        let legacy = json!({
            "board": { "row_5": [null, null, null, "🔴", null, null, null] },
            "player": "🟡",
            "winner": null,
            "moves": 1,
            "score": 0
        });
        store
            .inner
            .put(KEY, legacy.as_object().cloned().unwrap(), false)
            .await
            .unwrap();
        let controller = controller(store.clone(), PersistenceMode::BestEffort);

        let session = controller.initialize().await;
        assert_eq!(session.current_player(), Player::Yellow);
        let turn = controller.drop_piece(&session, 3).await.unwrap();
        controller.flush().await.unwrap();

        let reloaded = controller.initialize().await;
        assert_eq!(reloaded, turn.session);
        assert_eq!(reloaded.board().get(4, 3), Cell::Filled(Player::Yellow));
    }

    fn file_controller(dir: &std::path::Path, mode: PersistenceMode) -> GameController {
        let store = Arc::new(JsonFileStore::new(dir));
        GameController::new(store, GameRules::default(), KEY, mode)
    }

    #[tokio::test]
    async fn test_file_store_create_move_restart_resume() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("games/partidaActual.json");

        let controller = file_controller(dir.path(), PersistenceMode::BestEffort);
        let session = controller.initialize().await;
        assert!(file.exists());

        let turn = controller.drop_piece(&session, 3).await.unwrap();
        let turn = controller.drop_piece(&turn.session, 3).await.unwrap();
        controller.flush().await.unwrap();

        let resumed = file_controller(dir.path(), PersistenceMode::BestEffort)
            .initialize()
            .await;
        assert_eq!(resumed, turn.session);
        assert_eq!(resumed.board().get(4, 3), Cell::Filled(Player::Yellow));

        let fresh = controller.restart().await.unwrap();
        controller.flush().await.unwrap();
        let resumed = file_controller(dir.path(), PersistenceMode::BestEffort)
            .initialize()
            .await;
        assert_eq!(resumed, fresh);
        assert_eq!(resumed.moves(), 0);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_document_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("games/partidaActual.json");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "{not json").unwrap();

        let controller = file_controller(dir.path(), PersistenceMode::BestEffort);
        let session = controller.initialize().await;
        assert_eq!(session, GameSession::new(&GameRules::default()));
        // Left alone until the player acts
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "{not json");

        let turn = controller.drop_piece(&session, 3).await.unwrap();
        controller.flush().await.unwrap();
        let resumed = file_controller(dir.path(), PersistenceMode::BestEffort)
            .initialize()
            .await;
        assert_eq!(resumed, turn.session);

        std::fs::write(&file, "{not json").unwrap();
        let strict = file_controller(dir.path(), PersistenceMode::MustSucceed);
        let fresh = strict.restart().await.unwrap();
        let stored = JsonFileStore::new(dir.path()).get(KEY).await.unwrap().unwrap();
        assert_eq!(stored, codec::encode(&fresh));
    }
}
