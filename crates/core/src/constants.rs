/// Hard ceiling of the storage engine for one indexed row, in bytes.
pub const STORAGE_ROW_HARD_LIMIT_BYTES: usize = 2704;

/// Working threshold for one stored fragment payload, in bytes.
///
/// Kept well under [`STORAGE_ROW_HARD_LIMIT_BYTES`] so the row overhead of the
/// other columns never pushes an index entry past the ceiling.
pub const DEFAULT_MAX_FRAGMENT_BYTES: usize = 2000;

/// Soft cap on the number of array elements carried by one fragment.
pub const DEFAULT_MAX_ROWS_PER_FRAGMENT: usize = 150;

/// Payloads above this size are logged when they are appended.
pub const LARGE_FRAGMENT_WARN_BYTES: usize = 2500;

/// Separator used when joining narrative text parts.
pub const INSIGHTS_LINE_BREAK: &str = "<br>";

/// Prefix of the deep link generated for a referenced document.
pub const DOCUMENTS_URL_PREFIX: &str = "/documents/";

/// First sequence number handed out for a message.
pub const FIRST_SEQUENCE: u32 = 1;
