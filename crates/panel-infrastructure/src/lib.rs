//! Infrastructure layer for Panel: config paths, secret and settings
//! storage, file-backed repositories, and CSV/JSON export.

pub mod export;
pub mod file_repository;
pub mod paths;
pub mod storage;

pub use file_repository::{DemoSnapshotRepository, FilePersonaRepository, load_results, save_results};
pub use paths::PanelPaths;
pub use storage::{ConfigStorage, SecretStorage};
