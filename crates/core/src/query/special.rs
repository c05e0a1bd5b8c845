//! Special filter tokens understood by every query dimension.

pub const GLOBAL_ACTIVITY_TAG: &str = ":global";
pub const ANY_ACTIVITY_TAG: &str = ":any";
pub const CURRENT_ACTIVITY_TAG: &str = ":current";

pub const GLOBAL_AGENT_TAG: &str = ":global";
pub const ANY_AGENT_TAG: &str = ":any";
pub const CURRENT_AGENT_TAG: &str = ":current";

pub const ANY_TYPE_TAG: &str = ":any";
pub const FILES_TYPE_TAG: &str = ":files";
pub const DIRECTORIES_TYPE_TAG: &str = ":directories";

/// Glob that matches every value, including the empty string.
pub const ANY_PATTERN: &str = "*";

/// Mimetype the store uses for folders.
pub const DIRECTORY_MIMETYPE: &str = "inode/directory";
