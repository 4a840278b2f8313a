//! Shared fixture for the integration suites.
//!
//! Builds headless windows and hosted views around one registry and one turn
//! queue, the way an embedding application would wire them.

#![allow(dead_code)]

use std::rc::Rc;

use surface_portal::PortalConfig;
use surface_portal::geometry::Rect;
use surface_portal::platform::headless::{HeadlessHostedView, HeadlessNode, HeadlessWindow};
use surface_portal::platform::{HostedView, TurnDispatcher, TurnQueue, ViewNode, WindowId};
use surface_portal::portal::{EntrySnapshot, PortalRegistry, PortalSnapshot};

/// Content area used by most tests.
pub const CONTENT: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

pub struct TestFixture {
    pub queue: TurnQueue,
    pub registry: PortalRegistry,
}

impl Default for TestFixture {
    fn default() -> Self { Self::with_config(PortalConfig::default()) }
}

impl TestFixture {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: PortalConfig) -> Self {
        let queue = TurnQueue::new();
        let dispatcher: Rc<dyn TurnDispatcher> = Rc::new(queue.clone());
        Self { registry: PortalRegistry::new(dispatcher, config), queue }
    }

    /// A window at 1x scale whose content area is [`CONTENT`].
    pub fn window(&self, id: u64) -> Rc<HeadlessWindow> { HeadlessWindow::new(id, CONTENT, 1.0) }

    /// Bind through the registry with the same argument shapes an embedder uses.
    pub fn bind(
        &mut self,
        hosted: &Rc<HeadlessHostedView>,
        anchor: &Rc<HeadlessNode>,
        visible: bool,
        z_priority: i32,
    ) -> bool {
        let hosted: Rc<dyn HostedView> = hosted.clone();
        let anchor: Rc<dyn ViewNode> = anchor.clone();
        self.registry.bind(hosted, anchor, visible, z_priority)
    }

    /// Drain every pending pass.
    pub fn settle(&self) -> usize { self.queue.run_until_idle(16) }

    pub fn snapshot(&self, window: WindowId) -> PortalSnapshot {
        self.registry.snapshot(window).expect("window has a portal")
    }

    pub fn entry(&self, window: WindowId, hosted: &HeadlessHostedView) -> Option<EntrySnapshot> {
        self.snapshot(window).entry(hosted.id()).cloned()
    }
}
