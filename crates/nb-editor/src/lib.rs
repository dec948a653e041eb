pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod input;
pub mod interaction;
pub mod shortcuts;
pub mod storage;
pub mod timer;

pub use board::CardStore;
pub use config::BoardConfig;
pub use engine::NoteBoard;
pub use error::{BoardError, ConfigError, HistoryError, ImportError, StorageError};
pub use events::{BoardEvent, NoticeLevel};
pub use history::{HistoryManager, HistoryStatus, Operation, OperationMeta};
pub use input::{InputEvent, Modifiers, PointerTarget};
pub use interaction::{FixedHeight, HeightMeasure};
pub use storage::{BoardStorage, MemoryStorage, PersistedBoard, validate_cards};
pub use timer::{Clock, ManualClock, SystemClock};
