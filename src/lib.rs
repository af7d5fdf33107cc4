pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod host;
pub mod schema;
pub mod state;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use config::SurfaceConfig;
use device::{Capabilities, EventSubscription, PanelEvent, PanelHardware, PanelInfo, SurfaceManager};
use display::RgbColor;
use error::DetachReason;
use host::SurfaceHost;
use state::DeviceConfig;

/// One attached X-keys panel as seen by the host
///
/// Owns the panel for its whole life: the event subscription is dropped on
/// the first fatal event or on shutdown, and the hardware is closed exactly
/// once.
pub struct XkeysSurface<H: PanelHardware> {
    manager: SurfaceManager<H>,
    host: Arc<dyn SurfaceHost>,
    subscription: Option<EventSubscription>,
    closed: bool,
}

impl<H: PanelHardware> XkeysSurface<H> {
    pub fn new(
        surface_id: impl Into<String>,
        hardware: H,
        subscription: EventSubscription,
        host: Arc<dyn SurfaceHost>,
    ) -> Self {
        let manager = SurfaceManager::new(surface_id, hardware, Arc::clone(&host));

        Self {
            manager,
            host,
            subscription: Some(subscription),
            closed: false,
        }
    }

    pub fn surface_id(&self) -> &str {
        self.manager.surface_id()
    }

    pub fn product_name(&self) -> String {
        format!("XKeys {}", self.manager.info().name)
    }

    pub fn info(&self) -> &PanelInfo {
        self.manager.info()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.manager.capabilities()
    }

    pub fn config(&self) -> DeviceConfig {
        self.manager.config()
    }

    pub fn manager(&self) -> &SurfaceManager<H> {
        &self.manager
    }

    /// Still receiving panel events
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Start from a dark panel
    pub async fn initialize(&mut self) {
        info!(surface = %self.surface_id(), "Initializing {}", self.product_name());

        let failed = self.manager.blank();
        if failed > 0 {
            debug!(surface = %self.surface_id(), "{} buttons could not be blanked", failed);
        }
    }

    /// Apply host config and resync brightness with it
    pub async fn reconfigure(&mut self, config: SurfaceConfig) {
        self.manager.set_illuminate_pressed(config.illuminate_pressed);

        let brightness = self.manager.config().brightness_percent;
        self.manager.set_brightness(brightness);
    }

    pub async fn set_brightness(&mut self, percent: u8) {
        self.manager.set_brightness(percent);
    }

    pub fn draw(&mut self, control_id: &str, color: RgbColor) {
        self.manager.draw(control_id, color);
    }

    /// Draw a color given as host text (`#RRGGBB` or `RRGGBB`)
    pub fn draw_str(&mut self, control_id: &str, color: &str) {
        match color.parse::<RgbColor>() {
            Ok(color) => self.manager.draw(control_id, color),
            Err(e) => {
                debug!(surface = %self.surface_id(), "Ignoring draw to {}: {}", control_id, e)
            }
        }
    }

    /// Wait for the next panel event
    ///
    /// Returns `None` once detached or when the transport hangs up.
    pub async fn next_event(&mut self) -> Option<PanelEvent> {
        self.subscription.as_mut()?.recv().await
    }

    pub fn handle_event(&mut self, event: PanelEvent) {
        if !self.is_attached() {
            debug!(surface = %self.surface_id(), "Dropping event after detach: {:?}", event);
            return;
        }

        if let Some(reason) = self.manager.handle_event(event) {
            self.detach(reason);
        }
    }

    /// Handle every event already queued, without waiting
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.subscription.as_mut().and_then(|s| s.try_recv()) {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Deliver events until the panel goes away
    pub async fn run(&mut self) {
        while let Some(event) = self.next_event().await {
            self.handle_event(event);
        }

        if self.is_attached() {
            // Transport dropped its sender without saying goodbye
            self.detach(DetachReason::Disconnected);
        }
    }

    fn detach(&mut self, reason: DetachReason) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        subscription.unsubscribe();

        match &reason {
            DetachReason::Disconnected => {
                warn!(surface = %self.surface_id(), "{}", reason)
            }
            DetachReason::Transport(_) => {
                error!(surface = %self.surface_id(), "{}", reason)
            }
        }
        self.host.detach(reason);
    }

    /// Blank the panel and release it
    ///
    /// Safe to call more than once; the hardware is only closed the first
    /// time.
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        info!(surface = %self.surface_id(), "Shutting down {}", self.product_name());

        // Best effort, the panel may already be gone
        self.manager.blank();

        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }

        self.closed = true;
        if let Err(e) = self.manager.hardware_mut().close() {
            debug!(surface = %self.surface_id(), "Failed to close panel: {}", e);
        }

        info!(surface = %self.surface_id(), "Shutdown complete");
    }
}
