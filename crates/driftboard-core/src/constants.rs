// Shared tuning knobs. Window sizes and ceilings mirror what the board UI
// actually generates: a moderate API budget per user, a tight per-connection
// budget for high-frequency low-value messages (cursor moves).

use std::time::Duration;

// Rate limits
pub const API_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
pub const API_RATE_LIMIT_MAX_REQUESTS: u32 = 60;
pub const WS_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);
pub const WS_RATE_LIMIT_MAX_MESSAGES: u32 = 30;

// Read cache
pub const BOARD_CACHE_TTL: Duration = Duration::from_secs(60);

// Minimum interval between forwarded cursor updates per connection
pub const CURSOR_THROTTLE: Duration = Duration::from_millis(50);

// Validation
pub const MAX_TITLE_LENGTH: usize = 500;
pub const MAX_COMMENT_LENGTH: usize = 5_000;

// Event replay paging
pub const DEFAULT_EVENTS_LIMIT: i64 = 50;
pub const MAX_EVENTS_LIMIT: i64 = 100;
