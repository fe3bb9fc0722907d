//! Cooperative frame scheduling for boltpage components.
//!
//! Every visual component on the page follows the same contract: it is mounted once,
//! asks for a frame, draws when the frame arrives, and re-requests itself at the end of
//! the tick. The host owns the real clock and the real "next frame" primitive (a winit
//! redraw request); this crate only keeps the bookkeeping honest:
//!
//! ```text
//!   host event loop ──▶ FrameLoop::dispatch(HostEvent) ──▶ listeners (registration order)
//!          │
//!          └─ redraw ──▶ FrameLoop::tick(now) ──▶ Component::frame() ──▶ Continue | Stop
//! ```
//!
//! Unmounting (explicitly or by dropping the loop) cancels the pending frame and removes
//! every listener before returning, so no callback can reach a torn-down component.

mod clock;
mod host;

pub use clock::{BoxedTimeSource, SteppedTimeSource, SystemTimeSource, TimeSource};
pub use host::{
    Component, ComponentId, EventResponse, FrameContext, FrameLoop, FrameOutcome, HostEvent,
    HostEventKind, MountError, Registrar, SurfaceMetrics,
};
