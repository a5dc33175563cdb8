//! Presentation-side state: adaptive paging, the pagination state machine
//! with its cycling timer, and the frames handed to whatever draws them.

pub mod frame;
pub mod paging;
pub mod scheduler;

pub use frame::{Frame, PageView, ProposalEntry};
pub use paging::{PageLayout, PaginationState};
pub use scheduler::{CycleTick, FetchTicket, PaginationScheduler, ViewState};
