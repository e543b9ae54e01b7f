//! Application Layer
//!
//! Window-level wiring: close negotiation, the idle driver, the window
//! core and the cooperative main loop.

pub mod close;
pub mod event_loop;
pub mod idle;
pub mod window;

pub use close::{CloseCoordinator, CloseDecision};
pub use event_loop::{AppEvent, LoopExit, MainLoop};
pub use idle::{IdleAction, IdleDriver, StatusDisplay};
pub use window::{AppWindow, WindowEvent};
