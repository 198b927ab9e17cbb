//! Folder domain types.
//!
//! Folders form a tree; backends that model folders as labels derive the
//! hierarchy from separator characters in label names.

use serde::{Deserialize, Serialize};

use super::FolderName;

/// Well-known folder roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderType {
    /// Incoming mail.
    Inbox,
    /// Sent mail.
    Sent,
    /// Unsent drafts.
    Drafts,
    /// Deleted mail awaiting permanent removal.
    Trash,
    /// Suspected junk mail.
    Spam,
    /// Archived mail.
    Archive,
    /// User-created folder.
    Custom,
}

impl FolderType {
    /// Maps a well-known system folder or label name to its role.
    ///
    /// Unrecognized names map to [`FolderType::Custom`].
    pub fn from_name(name: &str) -> Self {
        match name.to_uppercase().as_str() {
            "INBOX" => FolderType::Inbox,
            "SENT" => FolderType::Sent,
            "DRAFT" | "DRAFTS" => FolderType::Drafts,
            "TRASH" => FolderType::Trash,
            "SPAM" => FolderType::Spam,
            "ARCHIVE" => FolderType::Archive,
            _ => FolderType::Custom,
        }
    }
}

/// A mail folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Display name of this folder (last path segment for nested folders).
    pub name: FolderName,
    /// Full path from the root, using `/` as separator.
    pub path: String,
    /// Role of this folder.
    pub kind: FolderType,
    /// Number of unread messages, when the backend reports it.
    pub unread_count: u32,
    /// Total number of messages, when the backend reports it.
    pub total_count: u32,
    /// Child folders in backend order.
    pub children: Vec<Folder>,
}

impl Folder {
    /// Creates an empty folder with the given name and role.
    ///
    /// The path defaults to the name; nested folders overwrite it.
    pub fn new(name: impl Into<FolderName>, kind: FolderType) -> Self {
        let name = name.into();
        let path = name.0.clone();
        Self {
            name,
            path,
            kind,
            unread_count: 0,
            total_count: 0,
            children: Vec::new(),
        }
    }

    /// Recursively searches this folder and its children for a folder whose
    /// name or full path matches.
    pub fn find(&self, name: &str) -> Option<&Folder> {
        if self.name.0 == name || self.path == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}
