//! Rate limiting logic and state management.

mod clock;
mod limiter;
mod quota;
mod sweeper;

pub use clock::{Clock, SystemClock};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use quota::{OperationClass, Quota};
pub use sweeper::spawn_sweeper;
