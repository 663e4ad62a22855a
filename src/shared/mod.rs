pub mod clock;
pub mod errors;
pub mod pagination;
pub mod shutdown;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use errors::{DomainError, DomainResult};
pub use pagination::{PaginatedResult, PaginationParams};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
