use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};

#[derive(Error, Debug)]
pub enum VisbellError {
    #[error("Не удалось открыть дисплей: {0}")]
    Connect(#[from] ConnectError),

    #[error("Ошибка соединения с X сервером: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Ошибка X протокола: {0}")]
    Reply(#[from] ReplyError),

    #[error("Ошибка X протокола: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("X сервер недоступен: {0}")]
    DisplayUnavailable(String),

    #[error("X сервер не поддерживает расширение {0}")]
    ExtensionMissing(String),

    #[error("Цвет {0} не поддерживается. Используйте корректное имя цвета X11")]
    ColorNotFound(String),

    #[error("Некорректная конфигурация: {0}")]
    InvalidConfig(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl VisbellError {
    pub fn color_not_found<T>(name: impl Into<String>) -> Result<T> {
        Err(VisbellError::ColorNotFound(name.into()))
    }
}

pub type Result<T> = std::result::Result<T, VisbellError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! visbell_error {
    (extension_missing, $($arg:tt)*) => {
        $crate::error::VisbellError::ExtensionMissing(format!($($arg)*))
    };
    (invalid_config, $($arg:tt)*) => {
        $crate::error::VisbellError::InvalidConfig(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::VisbellError::Internal(format!($($arg)*))
    };
}
