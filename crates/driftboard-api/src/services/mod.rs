// Services layer for business logic.
//
// Every mutation follows the same discipline: domain write + event log
// append in one transaction, then cache invalidation for the board, then a
// live publish through the hub. A failed append aborts the whole
// transaction; a failed publish after commit is the subscriber's problem
// (it resynchronizes from the log).

pub mod board;
pub mod comment;
pub mod event;
pub mod task;
pub mod undo;

pub use board::BoardService;
pub use comment::CommentService;
pub use event::EventService;
pub use task::TaskService;
pub use undo::UndoEngine;
