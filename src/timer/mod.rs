//! Match clocks
//!
//! All clocks here are passive: they advance only when the owning event
//! loop calls `tick()` once per second. A clock that is not running ignores
//! ticks, so a tick that was already in flight when the clock stopped
//! cannot move it.

pub mod clock;
pub mod countdown;
pub mod format;
pub mod overtime;

pub use clock::{ClockTick, ElapsedClock};
pub use countdown::{CountdownTick, PauseCountdown};
pub use format::mm_ss;
pub use overtime::OvertimeClock;
