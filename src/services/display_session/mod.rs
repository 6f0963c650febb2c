//! DisplaySession: всё взаимодействие с X сервером
//!
//! Модуль отвечает ТОЛЬКО за соединение, окно вспышки и подписку на XKB
//! звонки. Решения о том, когда показывать и прятать окно, принимает
//! исключительно FlashController.

mod dry_run;
mod x11_session;
mod r#trait;

pub use self::r#trait::{create_display_session, DisplaySession};
