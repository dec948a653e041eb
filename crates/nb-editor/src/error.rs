use nb_core::CardId;

/// Requests the board cannot honor. Never fatal; the board is unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardError {
    #[error("no card with id {0}")]
    UnknownCard(CardId),
    #[error("nothing is selected")]
    EmptySelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("cannot change history while cards are being dragged")]
    DragInProgress,
}

/// Failures at the persistence boundary.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage rejected write: {0}")]
    WriteRejected(String),
    #[error("stored board is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to serialize board: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Reasons an import document is rejected. Raised before any mutation.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("document is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("document has no `cards` field")]
    MissingCards,
    #[error("`cards` must be an array, found {0}")]
    CardsNotArray(&'static str),
    #[error("card {index} is invalid: {source}")]
    InvalidCard {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("card id {0} appears more than once")]
    DuplicateId(CardId),
    #[error("`worldState` is invalid: {0}")]
    InvalidWorldState(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid board config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid board config: {0}")]
    OutOfRange(&'static str),
}
