use std::fmt;

/// Классифицированное событие X сервера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BellEvent {
    /// XKB BellNotify
    BellRang,
    /// Любое другое событие. Изменение размера корневого окна тоже попадает сюда
    Ignored,
}

impl fmt::Display for BellEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BellEvent::BellRang => write!(f, "bell"),
            BellEvent::Ignored => write!(f, "ignored"),
        }
    }
}

/// Результат ожидания готовности соединения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// В соединении есть непрочитанные события
    EventsPending,
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bell_event_display() {
        assert_eq!(BellEvent::BellRang.to_string(), "bell");
        assert_eq!(format!("Событие {}", BellEvent::Ignored), "Событие ignored");
    }
}
