//! Label domain types.
//!
//! Represents email labels (tags) used for organization. Backends that
//! model folders as labels expose both views; the label view carries the
//! backend identifier needed for mutations.

use serde::{Deserialize, Serialize};

use super::LabelId;

/// Prefix that label-based backends assign to user-created label ids.
const USER_LABEL_PREFIX: &str = "Label_";

/// An email label (tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Unique identifier for this label.
    pub id: LabelId,
    /// Display name of the label.
    pub name: String,
    /// Color for UI display (hex format, e.g., "#ff0000").
    pub color: Option<String>,
}

impl Label {
    /// Creates a label with no color.
    pub fn new(id: impl Into<LabelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
        }
    }

    /// Returns true if this label was created by the user.
    ///
    /// User labels live in the backend's user id namespace (ids with the
    /// `Label_` prefix); everything else is a built-in system label.
    pub fn is_user(&self) -> bool {
        self.id.0.starts_with(USER_LABEL_PREFIX)
    }

    /// Returns true if this is a built-in system label (INBOX, SENT, etc.).
    pub fn is_system(&self) -> bool {
        !self.is_user()
    }
}

/// Well-known system label IDs.
pub mod system_labels {
    use super::LabelId;

    /// Returns the inbox label ID.
    pub fn inbox() -> LabelId {
        LabelId::from("INBOX")
    }

    /// Returns the sent label ID.
    pub fn sent() -> LabelId {
        LabelId::from("SENT")
    }

    /// Returns the draft label ID.
    pub fn draft() -> LabelId {
        LabelId::from("DRAFT")
    }

    /// Returns the trash label ID.
    pub fn trash() -> LabelId {
        LabelId::from("TRASH")
    }

    /// Returns the spam label ID.
    pub fn spam() -> LabelId {
        LabelId::from("SPAM")
    }

    /// Returns the starred label ID.
    pub fn starred() -> LabelId {
        LabelId::from("STARRED")
    }

    /// Returns the unread label ID.
    pub fn unread() -> LabelId {
        LabelId::from("UNREAD")
    }
}
