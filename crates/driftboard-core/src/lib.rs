// Driftboard core: domain DTOs, the board event tagged union, the realtime
// wire protocol, and shared constants. No I/O lives here.

pub mod constants;
pub mod event;
pub mod protocol;
pub mod types;

pub use event::{EventBody, EventParseError, UndoOutcome};
pub use protocol::{ClientMessage, ServerMessage};
pub use types::{
    Board, BoardEvent, BoardPatch, BoardSnapshot, Comment, CommentSnapshot, Task, TaskPatch,
    TaskSnapshot, UserSummary,
};
