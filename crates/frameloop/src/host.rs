use std::fmt;
use std::time::Duration;

use tracing::{debug, error, trace};

/// Logical size of the host surface plus the host's scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMetrics {
    pub logical_width: f64,
    pub logical_height: f64,
    /// Physical pixels per logical pixel as reported by the host (unclamped).
    pub scale_factor: f64,
}

impl SurfaceMetrics {
    pub fn new(logical_width: f64, logical_height: f64, scale_factor: f64) -> Self {
        Self {
            logical_width,
            logical_height,
            scale_factor,
        }
    }
}

impl Default for SurfaceMetrics {
    fn default() -> Self {
        Self::new(1280.0, 720.0, 1.0)
    }
}

/// Window-level notifications a component may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    Resize,
    ContextLost,
    ContextRestored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Resize(SurfaceMetrics),
    ContextLost,
    ContextRestored,
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::Resize(_) => HostEventKind::Resize,
            HostEvent::ContextLost => HostEventKind::ContextLost,
            HostEvent::ContextRestored => HostEventKind::ContextRestored,
        }
    }
}

/// Timing data handed to a component for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Monotonic timestamp of this frame relative to the host's time origin.
    pub now: Duration,
    /// Number of frames this component has already processed.
    pub frame_index: u64,
}

/// What a component wants after drawing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Request the next frame.
    Continue,
    /// End this component's loop; no further frames are scheduled.
    Stop,
}

/// Reaction of a component to a host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Handled,
    /// The component cannot recover in place and asks the host to rebuild the whole scene.
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("component '{name}' failed to mount: {source:#}")]
    Setup {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// A self-scheduling visual component.
///
/// The loop calls `mount` once, then `frame` once per granted frame request, and
/// `unmount` exactly once on teardown (including after a failed `mount`).
pub trait Component {
    fn name(&self) -> &str;

    /// Performs setup. Listener registrations made through `registrar` are removed
    /// automatically if this returns an error.
    fn mount(&mut self, registrar: &mut Registrar<'_>, now: Duration) -> anyhow::Result<()>;

    fn frame(&mut self, frame: &FrameContext) -> FrameOutcome;

    fn handle_event(&mut self, _event: &HostEvent) -> EventResponse {
        EventResponse::Handled
    }

    /// Releases everything the component acquired.
    fn unmount(&mut self) {}
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    owner: ComponentId,
    kind: HostEventKind,
}

/// Registration handle passed to [`Component::mount`].
pub struct Registrar<'a> {
    owner: ComponentId,
    metrics: SurfaceMetrics,
    listeners: &'a mut Vec<Listener>,
}

impl Registrar<'_> {
    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// Current host surface metrics.
    pub fn surface_metrics(&self) -> SurfaceMetrics {
        self.metrics
    }

    /// Subscribes the mounting component to a host event kind.
    pub fn listen(&mut self, kind: HostEventKind) {
        let owner = self.owner;
        let already = self
            .listeners
            .iter()
            .any(|listener| listener.owner == owner && listener.kind == kind);
        if !already {
            self.listeners.push(Listener { owner, kind });
        }
    }
}

struct Slot {
    component: Box<dyn Component>,
    frame_requested: bool,
    frames: u64,
}

/// Owns mounted components, their frame requests and their listener registrations.
pub struct FrameLoop {
    slots: Vec<Option<Slot>>,
    listeners: Vec<Listener>,
    metrics: SurfaceMetrics,
    last_now: Duration,
    reload_requested: bool,
}

impl FrameLoop {
    pub fn new(metrics: SurfaceMetrics) -> Self {
        Self {
            slots: Vec::new(),
            listeners: Vec::new(),
            metrics,
            last_now: Duration::ZERO,
            reload_requested: false,
        }
    }

    pub fn surface_metrics(&self) -> SurfaceMetrics {
        self.metrics
    }

    /// Mounts a component and schedules its first frame.
    pub fn mount<C>(&mut self, component: C, now: Duration) -> Result<ComponentId, MountError>
    where
        C: Component + 'static,
    {
        let mut component: Box<dyn Component> = Box::new(component);
        let id = ComponentId(self.slots.len());
        let now = self.clamp(now);
        let mut registrar = Registrar {
            owner: id,
            metrics: self.metrics,
            listeners: &mut self.listeners,
        };

        if let Err(source) = component.mount(&mut registrar, now) {
            let name = component.name().to_string();
            self.listeners.retain(|listener| listener.owner != id);
            component.unmount();
            error!(component = %name, error = %source, "component setup aborted");
            return Err(MountError::Setup { name, source });
        }

        debug!(component = component.name(), id = %id, "component mounted");
        self.slots.push(Some(Slot {
            component,
            frame_requested: true,
            frames: 0,
        }));
        Ok(id)
    }

    /// Runs every pending frame request in mount order and returns how many ran.
    pub fn tick(&mut self, now: Duration) -> usize {
        let now = self.clamp(now);
        let mut ran = 0;
        for slot in self.slots.iter_mut().flatten() {
            if !slot.frame_requested {
                continue;
            }
            slot.frame_requested = false;
            let context = FrameContext {
                now,
                frame_index: slot.frames,
            };
            slot.frames = slot.frames.saturating_add(1);
            ran += 1;
            match slot.component.frame(&context) {
                FrameOutcome::Continue => slot.frame_requested = true,
                FrameOutcome::Stop => {
                    debug!(
                        component = slot.component.name(),
                        frames = slot.frames,
                        "component stopped requesting frames"
                    );
                }
            }
        }
        ran
    }

    /// Delivers a host event to its listeners and returns how many received it.
    pub fn dispatch(&mut self, event: HostEvent) -> usize {
        if let HostEvent::Resize(metrics) = event {
            self.metrics = metrics;
        }
        let kind = event.kind();
        let owners: Vec<ComponentId> = self
            .listeners
            .iter()
            .filter(|listener| listener.kind == kind)
            .map(|listener| listener.owner)
            .collect();

        let mut delivered = 0;
        for owner in owners {
            let Some(slot) = self.slots.get_mut(owner.0).and_then(Option::as_mut) else {
                continue;
            };
            delivered += 1;
            if slot.component.handle_event(&event) == EventResponse::Reload {
                debug!(component = slot.component.name(), ?kind, "component requested reload");
                self.reload_requested = true;
            }
        }
        trace!(?kind, delivered, "dispatched host event");
        delivered
    }

    /// Returns and clears the latched reload request.
    pub fn take_reload_request(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    /// Cancels the component's pending frame, removes its listeners and tears it down.
    pub fn unmount(&mut self, id: ComponentId) -> bool {
        let Some(mut slot) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return false;
        };
        self.listeners.retain(|listener| listener.owner != id);
        slot.component.unmount();
        debug!(component = slot.component.name(), id = %id, "component unmounted");
        true
    }

    pub fn unmount_all(&mut self) {
        for index in 0..self.slots.len() {
            self.unmount(ComponentId(index));
        }
        self.slots.clear();
        self.reload_requested = false;
    }

    pub fn is_mounted(&self, id: ComponentId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    pub fn mounted_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn pending_frames(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.frame_requested)
            .count()
    }

    pub fn has_pending_frames(&self) -> bool {
        self.pending_frames() > 0
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn clamp(&mut self, now: Duration) -> Duration {
        let now = now.max(self.last_now);
        self.last_now = now;
        now
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.unmount_all();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::anyhow;

    use super::*;

    #[derive(Default, Debug)]
    struct Counters {
        frames: u32,
        events: Vec<HostEventKind>,
        unmounts: u32,
        seen: Vec<Duration>,
    }

    struct Tracked {
        counters: Rc<RefCell<Counters>>,
        listen: Vec<HostEventKind>,
        fail_mount: bool,
        stop_after: Option<u32>,
        reload_on_restore: bool,
    }

    impl Tracked {
        fn new(counters: &Rc<RefCell<Counters>>) -> Self {
            Self {
                counters: Rc::clone(counters),
                listen: vec![HostEventKind::Resize, HostEventKind::ContextLost],
                fail_mount: false,
                stop_after: None,
                reload_on_restore: false,
            }
        }
    }

    impl Component for Tracked {
        fn name(&self) -> &str {
            "tracked"
        }

        fn mount(&mut self, registrar: &mut Registrar<'_>, _now: Duration) -> anyhow::Result<()> {
            for kind in &self.listen {
                registrar.listen(*kind);
            }
            if self.fail_mount {
                return Err(anyhow!("no context available"));
            }
            Ok(())
        }

        fn frame(&mut self, frame: &FrameContext) -> FrameOutcome {
            let mut counters = self.counters.borrow_mut();
            counters.frames += 1;
            counters.seen.push(frame.now);
            match self.stop_after {
                Some(limit) if counters.frames >= limit => FrameOutcome::Stop,
                _ => FrameOutcome::Continue,
            }
        }

        fn handle_event(&mut self, event: &HostEvent) -> EventResponse {
            self.counters.borrow_mut().events.push(event.kind());
            if self.reload_on_restore && *event == HostEvent::ContextRestored {
                EventResponse::Reload
            } else {
                EventResponse::Handled
            }
        }

        fn unmount(&mut self) {
            self.counters.borrow_mut().unmounts += 1;
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn mounted_component_reschedules_itself_every_tick() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        frames.mount(Tracked::new(&counters), ms(0)).unwrap();

        assert_eq!(frames.pending_frames(), 1);
        for step in 1..=5 {
            assert_eq!(frames.tick(ms(step * 16)), 1);
        }
        assert_eq!(counters.borrow().frames, 5);
        assert_eq!(frames.pending_frames(), 1);
    }

    #[test]
    fn no_callbacks_fire_after_unmount() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        let id = frames.mount(Tracked::new(&counters), ms(0)).unwrap();
        frames.tick(ms(16));
        frames.dispatch(HostEvent::ContextLost);
        assert_eq!(frames.listener_count(), 2);

        assert!(frames.unmount(id));
        let frames_before = counters.borrow().frames;
        let events_before = counters.borrow().events.len();

        frames.tick(ms(32));
        frames.tick(ms(48));
        frames.dispatch(HostEvent::Resize(SurfaceMetrics::new(10.0, 10.0, 1.0)));
        frames.dispatch(HostEvent::ContextLost);

        let counters = counters.borrow();
        assert_eq!(counters.frames, frames_before);
        assert_eq!(counters.events.len(), events_before);
        assert_eq!(counters.unmounts, 1);
        assert_eq!(frames.listener_count(), 0);
        assert_eq!(frames.pending_frames(), 0);
        assert!(!frames.is_mounted(id));
    }

    #[test]
    fn unmount_twice_tears_down_once() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        let id = frames.mount(Tracked::new(&counters), ms(0)).unwrap();
        assert!(frames.unmount(id));
        assert!(!frames.unmount(id));
        assert_eq!(counters.borrow().unmounts, 1);
    }

    #[test]
    fn failed_mount_releases_listeners_and_tears_down() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        let mut tracked = Tracked::new(&counters);
        tracked.fail_mount = true;

        let err = frames.mount(tracked, ms(0)).unwrap_err();
        assert!(err.to_string().contains("no context available"));
        assert_eq!(frames.listener_count(), 0);
        assert_eq!(frames.pending_frames(), 0);
        assert_eq!(frames.mounted_count(), 0);
        assert_eq!(counters.borrow().unmounts, 1);

        frames.tick(ms(16));
        assert_eq!(counters.borrow().frames, 0);
    }

    #[test]
    fn stop_outcome_ends_the_loop() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        let mut tracked = Tracked::new(&counters);
        tracked.stop_after = Some(2);
        frames.mount(tracked, ms(0)).unwrap();

        for step in 1..=6 {
            frames.tick(ms(step * 16));
        }
        assert_eq!(counters.borrow().frames, 2);
        assert!(!frames.has_pending_frames());
    }

    #[test]
    fn timestamps_never_move_backward() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        frames.mount(Tracked::new(&counters), ms(0)).unwrap();
        frames.tick(ms(100));
        frames.tick(ms(50));
        frames.tick(ms(120));
        assert_eq!(counters.borrow().seen, vec![ms(100), ms(100), ms(120)]);
    }

    #[test]
    fn events_reach_only_subscribed_components() {
        let first = Rc::new(RefCell::new(Counters::default()));
        let second = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        frames.mount(Tracked::new(&first), ms(0)).unwrap();
        let mut quiet = Tracked::new(&second);
        quiet.listen = vec![HostEventKind::ContextRestored];
        frames.mount(quiet, ms(0)).unwrap();

        let metrics = SurfaceMetrics::new(800.0, 600.0, 2.0);
        assert_eq!(frames.dispatch(HostEvent::Resize(metrics)), 1);
        assert_eq!(frames.surface_metrics(), metrics);
        assert_eq!(first.borrow().events, vec![HostEventKind::Resize]);
        assert!(second.borrow().events.is_empty());
    }

    #[test]
    fn reload_request_is_latched_until_taken() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let mut frames = FrameLoop::new(SurfaceMetrics::default());
        let mut tracked = Tracked::new(&counters);
        tracked.listen.push(HostEventKind::ContextRestored);
        tracked.reload_on_restore = true;
        frames.mount(tracked, ms(0)).unwrap();

        assert!(!frames.take_reload_request());
        frames.dispatch(HostEvent::ContextRestored);
        assert!(frames.take_reload_request());
        assert!(!frames.take_reload_request());
    }

    #[test]
    fn dropping_the_loop_unmounts_everything() {
        let counters = Rc::new(RefCell::new(Counters::default()));
        {
            let mut frames = FrameLoop::new(SurfaceMetrics::default());
            frames.mount(Tracked::new(&counters), ms(0)).unwrap();
            frames.mount(Tracked::new(&counters), ms(0)).unwrap();
        }
        assert_eq!(counters.borrow().unmounts, 2);
    }
}
