use crate::error::Result;
use crate::events::Extent;
use crate::visbell_error;
use std::time::Duration;

/// Цвет по умолчанию: белый пиксель экрана, без обращения к палитре
pub const DEFAULT_COLOR: &str = "white";
pub const DEFAULT_DURATION_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub window: WindowConfig,
    pub flash: FlashConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub x: i16,
    pub y: i16,
    pub width: Extent,
    pub height: Extent,
    /// Имя цвета X11. `None` означает белый
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    pub duration_ms: u64,
    pub one_shot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig {
                x: 0,
                y: 0,
                width: Extent::Display,
                height: Extent::Display,
                color: None,
            },
            flash: FlashConfig {
                duration_ms: DEFAULT_DURATION_MS,
                one_shot: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(visbell_error!(
                    invalid_config,
                    "Неверный уровень логирования: {}",
                    self.logging.level
                ))
            }
        }

        // X сервер отвергает окна нулевого размера
        if self.window.width == Extent::Pixels(0) || self.window.height == Extent::Pixels(0) {
            return Err(visbell_error!(invalid_config, "Размер окна должен быть больше 0"));
        }

        if let Some(color) = &self.window.color {
            if color.trim().is_empty() {
                return Err(visbell_error!(invalid_config, "Пустое имя цвета"));
            }
        }

        Ok(())
    }

    pub fn flash_duration(&self) -> Duration {
        Duration::from_millis(self.flash.duration_ms)
    }
}

impl WindowConfig {
    /// Имя цвета, которое будет показано пользователю
    pub fn color_name(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    /// Нужно ли разрешать цвет через палитру сервера
    pub fn wants_named_color(&self) -> bool {
        match &self.color {
            None => false,
            Some(color) => !color.trim().eq_ignore_ascii_case(DEFAULT_COLOR),
        }
    }
}

// Парсеры значений для clap. Ошибка должна называть исходное значение.

pub fn parse_position(value: &str) -> std::result::Result<i16, String> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| format!("некорректная позиция {}", value))?;

    i16::try_from(parsed).map_err(|_| {
        format!(
            "позиция {} вне диапазона. Должно быть целое число в диапазоне ({}, {})",
            value,
            i16::MIN,
            i16::MAX
        )
    })
}

pub fn parse_extent(value: &str) -> std::result::Result<Extent, String> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| format!("некорректный размер {}", value))?;

    if parsed < 0 {
        return Ok(Extent::Display);
    }
    if parsed == 0 {
        return Err(format!("некорректный размер {}. Размер должен быть больше 0", value));
    }

    u16::try_from(parsed)
        .map(Extent::Pixels)
        .map_err(|_| format!("некорректный размер {}. Максимальный размер {}", value, u16::MAX))
}

pub fn parse_duration_ms(value: &str) -> std::result::Result<u64, String> {
    value.trim().parse().map_err(|_| {
        format!(
            "некорректная длительность {}. Должно быть неотрицательное число миллисекунд",
            value
        )
    })
}

pub fn parse_color(value: &str) -> std::result::Result<String, String> {
    let color = value.trim();
    if color.is_empty() {
        return Err("имя цвета не может быть пустым".to_string());
    }
    Ok(color.to_string())
}
