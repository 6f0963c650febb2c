use crate::error::{Result, VisbellError};
use tracing::{info, warn};

/// Проверить, что X сервер вообще может быть доступен
pub fn check_display_environment() -> Result<()> {
    info!("Проверка окружения...");

    check_display(
        std::env::var("DISPLAY").ok().as_deref(),
        std::env::var("XDG_SESSION_TYPE").ok().as_deref(),
    )?;

    info!("Проверка окружения завершена успешно");
    Ok(())
}

fn check_display(display: Option<&str>, session_type: Option<&str>) -> Result<()> {
    let name = match display {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return Err(VisbellError::DisplayUnavailable(
                "переменная DISPLAY не задана. Запустите программу внутри X сессии".to_string(),
            ))
        }
    };
    info!("Используется дисплей {}", name);

    if session_type == Some("wayland") {
        warn!("Wayland сессия: звонки придут только от X клиентов через XWayland");
    }

    Ok(())
}
