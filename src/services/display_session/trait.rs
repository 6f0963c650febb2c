use crate::config::WindowConfig;
use crate::error::Result;
use crate::events::{BellEvent, Readiness, WindowGeometry};
use std::time::Duration;

/// Сессия дисплея: настоящий X сервер или эмуляция для сухого запуска
#[async_trait::async_trait]
pub trait DisplaySession: Send {
    /// Создать окно вспышки. Вызывается один раз, окно переиспользуется
    fn create_window(&mut self, window: &WindowConfig) -> Result<WindowGeometry>;

    /// Подписаться на XKB звонки и заглушить звуковой сигнал сервера
    fn arm_bell_notifications(&mut self) -> Result<()>;

    /// Ждать событий в соединении не дольше `timeout`.
    /// `None` ждёт без ограничения
    async fn poll_for_event(&mut self, timeout: Option<Duration>) -> Result<Readiness>;

    /// Забрать все накопившиеся события
    fn drain_events(&mut self) -> Result<Vec<BellEvent>>;

    /// Показать окно поверх остальных. Повторный вызов безопасен
    fn show_window(&mut self) -> Result<()>;

    /// Спрятать окно. Повторный вызов безопасен
    fn hide_window(&mut self) -> Result<()>;

    fn is_visible(&self) -> bool;

    /// Уничтожить окно. После вызова сессия больше не используется
    fn close(&mut self) -> Result<()>;
}

/// Открыть сессию дисплея с учётом флага dry_run
pub fn create_display_session(dry_run: bool) -> Result<Box<dyn DisplaySession>> {
    if dry_run {
        Ok(Box::new(super::dry_run::DryRunSession::new()))
    } else {
        Ok(Box::new(super::x11_session::X11Session::open()?))
    }
}
