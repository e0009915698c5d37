/// TLB capacity used when a configuration does not set one.
pub const DEFAULT_TLB_CAPACITY: usize = 4;

/// Separator between the pid and the address in a `PID:VA` token.
pub const ACCESS_SEPARATOR: char = ':';

/// Separator between tokens in a textual access sequence or process list.
pub const LIST_SEPARATOR: char = ',';

/// Comment marker in scenario files.
pub const COMMENT_MARKER: char = '#';
