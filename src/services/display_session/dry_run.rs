use crate::config::WindowConfig;
use crate::error::Result;
use crate::events::{BellEvent, Readiness, WindowGeometry};
use crate::visbell_error;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use super::r#trait::DisplaySession;

/// Размер эмулируемого экрана
pub const DRY_RUN_DISPLAY_WIDTH: u16 = 1920;
pub const DRY_RUN_DISPLAY_HEIGHT: u16 = 1080;

const DRY_RUN_BELL_INTERVAL: Duration = Duration::from_secs(5);

pub struct DryRunSession {
    geometry: Option<WindowGeometry>,
    visible: bool,
    bell_interval: Duration,
    /// Когда прозвенит следующий эмулированный звонок. `None` до arm
    next_bell: Option<Instant>,
    bell_pending: bool,
}

impl DryRunSession {
    pub fn new() -> Self {
        Self::with_bell_interval(DRY_RUN_BELL_INTERVAL)
    }

    pub fn with_bell_interval(bell_interval: Duration) -> Self {
        info!("Инициализация DryRunSession (звонок каждые {:?})", bell_interval);
        Self {
            geometry: None,
            visible: false,
            bell_interval,
            next_bell: None,
            bell_pending: false,
        }
    }
}

impl Default for DryRunSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DisplaySession for DryRunSession {
    fn create_window(&mut self, window: &WindowConfig) -> Result<WindowGeometry> {
        if self.geometry.is_some() {
            return Err(visbell_error!(internal, "Окно вспышки уже создано"));
        }

        let geometry = WindowGeometry::resolve(
            window.x,
            window.y,
            window.width,
            window.height,
            DRY_RUN_DISPLAY_WIDTH,
            DRY_RUN_DISPLAY_HEIGHT,
        );
        info!(
            "[DRY RUN] Окно вспышки создано: {}, цвет {}",
            geometry,
            window.color_name()
        );

        self.geometry = Some(geometry);
        Ok(geometry)
    }

    fn arm_bell_notifications(&mut self) -> Result<()> {
        info!("[DRY RUN] Эмуляция XKB звонков включена");
        self.next_bell = Some(Instant::now() + self.bell_interval);
        Ok(())
    }

    async fn poll_for_event(&mut self, timeout: Option<Duration>) -> Result<Readiness> {
        if self.bell_pending {
            return Ok(Readiness::EventsPending);
        }

        let timeout_at = timeout.map(|timeout| Instant::now() + timeout);
        let wake = match (timeout_at, self.next_bell) {
            (Some(timeout_at), Some(next_bell)) => timeout_at.min(next_bell),
            (Some(timeout_at), None) => timeout_at,
            (None, Some(next_bell)) => next_bell,
            // Звонков не будет, ждать нечего
            (None, None) => std::future::pending::<Instant>().await,
        };

        sleep_until(wake).await;

        let now = Instant::now();
        match self.next_bell {
            Some(next_bell) if now >= next_bell => {
                self.next_bell = Some(now + self.bell_interval);
                self.bell_pending = true;
                Ok(Readiness::EventsPending)
            }
            _ => Ok(Readiness::TimedOut),
        }
    }

    fn drain_events(&mut self) -> Result<Vec<BellEvent>> {
        if std::mem::take(&mut self.bell_pending) {
            debug!("[DRY RUN] Эмулированный звонок");
            Ok(vec![BellEvent::BellRang])
        } else {
            Ok(Vec::new())
        }
    }

    fn show_window(&mut self) -> Result<()> {
        if self.geometry.is_none() {
            return Err(visbell_error!(internal, "Окно вспышки ещё не создано"));
        }
        if !self.visible {
            info!("[DRY RUN] Окно показано");
        }
        self.visible = true;
        Ok(())
    }

    fn hide_window(&mut self) -> Result<()> {
        if self.visible {
            info!("[DRY RUN] Окно скрыто");
        }
        self.visible = false;
        Ok(())
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn close(&mut self) -> Result<()> {
        if self.geometry.take().is_some() {
            info!("[DRY RUN] Окно вспышки уничтожено");
        }
        self.visible = false;
        Ok(())
    }
}
