pub mod clock;
pub mod datetime;
pub mod retry;
pub mod shutdown;

pub use clock::{Clock, ManualClock, SystemClock};
pub use shutdown::ShutdownSignal;
