//! Remote client implementations

mod folder;

pub use folder::FolderRemote;
