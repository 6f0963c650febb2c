use crate::config::Config;
use crate::error::Result;
use crate::events::{BellEvent, Readiness, WindowGeometry};
use crate::services::DisplaySession;
use crate::{debug_if_enabled, trace_if_enabled};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::info;

/// Состояние вспышки. Дедлайн существует только пока окно видно
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashState {
    Hidden,
    Visible { deadline: Instant },
}

impl FlashState {
    pub fn is_visible(&self) -> bool {
        matches!(self, FlashState::Visible { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            FlashState::Hidden => None,
            FlashState::Visible { deadline } => Some(*deadline),
        }
    }

    /// Сколько ждать событий. `None` означает ждать бесконечно
    pub fn wait_timeout(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Дедлайн наступил (равенство тоже считается)
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self, FlashState::Visible { deadline } if now >= *deadline)
    }
}

pub struct FlashController {
    config: Arc<Config>,
    session: Box<dyn DisplaySession>,
    geometry: WindowGeometry,
    state: FlashState,
    flash_count: u64,
}

impl FlashController {
    pub fn new(config: Arc<Config>, mut session: Box<dyn DisplaySession>) -> Result<Self> {
        info!(
            "Инициализация FlashController (длительность: {}мс, one-shot: {})",
            config.flash.duration_ms, config.flash.one_shot
        );

        let geometry = session.create_window(&config.window)?;

        Ok(Self {
            config,
            session,
            geometry,
            state: FlashState::Hidden,
            flash_count: 0,
        })
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    #[allow(dead_code)]
    pub fn state(&self) -> FlashState {
        self.state
    }

    #[allow(dead_code)]
    pub fn flash_count(&self) -> u64 {
        self.flash_count
    }

    /// Запуск в режиме, выбранном конфигурацией.
    /// В непрерывном режиме возвращается только с ошибкой.
    pub async fn run(&mut self) -> Result<()> {
        if self.config.flash.one_shot {
            return self.flash_once().await;
        }

        self.session.arm_bell_notifications()?;
        info!("Ожидание звонков");

        loop {
            self.step().await?;
        }
    }

    /// Одна итерация цикла: ожидание, проверка дедлайна, обработка событий
    pub async fn step(&mut self) -> Result<()> {
        self.hide_if_expired(Instant::now())?;

        let timeout = self.state.wait_timeout(Instant::now());
        trace_if_enabled!("Ожидание событий, таймаут: {:?}", timeout);

        let readiness = self.session.poll_for_event(timeout).await?;

        // Ожидание могло завершиться событием уже после дедлайна
        self.hide_if_expired(Instant::now())?;

        if readiness == Readiness::TimedOut {
            trace_if_enabled!("Таймаут ожидания");
        }

        for event in self.session.drain_events()? {
            match event {
                BellEvent::BellRang => self.on_bell()?,
                BellEvent::Ignored => {}
            }
        }

        Ok(())
    }

    /// Показать окно один раз и спрятать по истечении длительности
    pub async fn flash_once(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.config.flash_duration();

        self.session.show_window()?;
        self.state = FlashState::Visible { deadline };
        self.flash_count += 1;
        info!("Одиночная вспышка на {}мс", self.config.flash.duration_ms);

        // Обычно не больше двух итераций
        while !self.hide_if_expired(Instant::now())? {
            sleep_until(deadline).await;
        }

        self.session.close()
    }

    /// Спрятать окно и уничтожить его. Безопасно вызывать повторно
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state.is_visible() || self.session.is_visible() {
            self.session.hide_window()?;
            self.state = FlashState::Hidden;
        }
        self.session.close()?;
        info!("Показано вспышек: {}", self.flash_count);
        Ok(())
    }

    fn on_bell(&mut self) -> Result<()> {
        // Повторный звонок во время вспышки только сдвигает дедлайн
        self.session.show_window()?;

        let deadline = Instant::now() + self.config.flash_duration();
        if self.state.is_visible() {
            debug_if_enabled!("Звонок во время вспышки, дедлайн продлён");
        } else {
            debug_if_enabled!("Звонок, окно показано");
        }

        self.state = FlashState::Visible { deadline };
        self.flash_count += 1;
        Ok(())
    }

    /// Возвращает true, если окно скрыто (или уже было скрыто)
    fn hide_if_expired(&mut self, now: Instant) -> Result<bool> {
        if !self.state.is_visible() {
            return Ok(true);
        }
        if !self.state.is_expired(now) {
            return Ok(false);
        }

        self.session.hide_window()?;
        self.state = FlashState::Hidden;
        debug_if_enabled!("Дедлайн наступил, окно скрыто");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::error::VisbellError;
    use crate::events::Extent;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const DISPLAY_WIDTH: u16 = 1280;
    const DISPLAY_HEIGHT: u16 = 800;
    const KNOWN_COLORS: &[&str] = &["white", "red", "black"];

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Action {
        Create,
        Arm,
        Show,
        Hide,
        Close,
    }

    type Journal = Arc<Mutex<Vec<(u64, Action)>>>;

    /// Сессия с заранее заданным расписанием событий на виртуальных часах
    struct ScriptedSession {
        start: Instant,
        script: VecDeque<(u64, BellEvent)>,
        pending: Vec<BellEvent>,
        visible: bool,
        journal: Journal,
    }

    impl ScriptedSession {
        fn new(script: &[(u64, BellEvent)]) -> (Self, Journal) {
            let journal: Journal = Arc::new(Mutex::new(Vec::new()));
            let session = Self {
                start: Instant::now(),
                script: script.iter().copied().collect(),
                pending: Vec::new(),
                visible: false,
                journal: journal.clone(),
            };
            (session, journal)
        }

        fn record(&self, action: Action) {
            let at = self.start.elapsed().as_millis() as u64;
            self.journal.lock().unwrap().push((at, action));
        }

        fn at(&self, offset_ms: u64) -> Instant {
            self.start + Duration::from_millis(offset_ms)
        }
    }

    #[async_trait::async_trait]
    impl DisplaySession for ScriptedSession {
        fn create_window(&mut self, window: &WindowConfig) -> Result<WindowGeometry> {
            if window.wants_named_color()
                && !KNOWN_COLORS.contains(&window.color_name())
            {
                return VisbellError::color_not_found(window.color_name());
            }
            self.record(Action::Create);
            Ok(WindowGeometry::resolve(
                window.x,
                window.y,
                window.width,
                window.height,
                DISPLAY_WIDTH,
                DISPLAY_HEIGHT,
            ))
        }

        fn arm_bell_notifications(&mut self) -> Result<()> {
            self.record(Action::Arm);
            Ok(())
        }

        async fn poll_for_event(&mut self, timeout: Option<Duration>) -> Result<Readiness> {
            if !self.pending.is_empty() {
                return Ok(Readiness::EventsPending);
            }

            let next_event = self.script.front().map(|(offset, _)| self.at(*offset));
            let timeout_at = timeout.map(|timeout| Instant::now() + timeout);
            let wake = match (next_event, timeout_at) {
                (Some(event), Some(timeout_at)) => event.min(timeout_at),
                (Some(event), None) => event,
                (None, Some(timeout_at)) => timeout_at,
                (None, None) => {
                    return Err(VisbellError::Internal("script exhausted".to_string()))
                }
            };

            sleep_until(wake).await;

            let now = Instant::now();
            while let Some((offset, event)) = self.script.front().copied() {
                if self.at(offset) > now {
                    break;
                }
                self.script.pop_front();
                self.pending.push(event);
            }

            if self.pending.is_empty() {
                Ok(Readiness::TimedOut)
            } else {
                Ok(Readiness::EventsPending)
            }
        }

        fn drain_events(&mut self) -> Result<Vec<BellEvent>> {
            Ok(std::mem::take(&mut self.pending))
        }

        fn show_window(&mut self) -> Result<()> {
            self.visible = true;
            self.record(Action::Show);
            Ok(())
        }

        fn hide_window(&mut self) -> Result<()> {
            if self.visible {
                self.visible = false;
                self.record(Action::Hide);
            }
            Ok(())
        }

        fn is_visible(&self) -> bool {
            self.visible
        }

        fn close(&mut self) -> Result<()> {
            self.record(Action::Close);
            Ok(())
        }
    }

    fn config_with(duration_ms: u64, one_shot: bool) -> Arc<Config> {
        let mut config = Config::default();
        config.flash.duration_ms = duration_ms;
        config.flash.one_shot = one_shot;
        Arc::new(config)
    }

    /// Гоняет цикл, пока сценарий не закончится
    async fn run_until_exhausted(controller: &mut FlashController) {
        match controller.run().await {
            Err(VisbellError::Internal(msg)) => assert_eq!(msg, "script exhausted"),
            other => panic!("неожиданный результат: {:?}", other),
        }
    }

    fn journal(journal: &Journal) -> Vec<(u64, Action)> {
        journal.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_bell_flashes_for_duration() {
        let (session, log) = ScriptedSession::new(&[(50, BellEvent::BellRang)]);
        let mut controller = FlashController::new(config_with(100, false), Box::new(session)).unwrap();

        run_until_exhausted(&mut controller).await;

        assert_eq!(
            journal(&log),
            vec![
                (0, Action::Create),
                (0, Action::Arm),
                (50, Action::Show),
                (150, Action::Hide),
            ]
        );
        assert_eq!(controller.state(), FlashState::Hidden);
        assert_eq!(controller.flash_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrigger_extends_deadline() {
        let (session, log) =
            ScriptedSession::new(&[(0, BellEvent::BellRang), (80, BellEvent::BellRang)]);
        let mut controller = FlashController::new(config_with(100, false), Box::new(session)).unwrap();

        run_until_exhausted(&mut controller).await;

        let hides: Vec<u64> = journal(&log)
            .into_iter()
            .filter(|(_, action)| *action == Action::Hide)
            .map(|(at, _)| at)
            .collect();
        // Окно не прячется в исходный дедлайн (100мс)
        assert_eq!(hides, vec![180]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bell_burst_sets_single_deadline() {
        let (session, log) = ScriptedSession::new(&[
            (10, BellEvent::BellRang),
            (10, BellEvent::Ignored),
            (10, BellEvent::BellRang),
        ]);
        let mut controller = FlashController::new(config_with(40, false), Box::new(session)).unwrap();

        controller.session.arm_bell_notifications().unwrap();
        controller.step().await.unwrap();

        let start = Instant::now() - Duration::from_millis(10);
        assert_eq!(
            controller.state(),
            FlashState::Visible {
                deadline: start + Duration::from_millis(50)
            }
        );

        run_until_exhausted(&mut controller).await;
        assert_eq!(journal(&log).last(), Some(&(50, Action::Hide)));
        assert_eq!(controller.flash_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_hides_on_next_iteration() {
        let (session, log) = ScriptedSession::new(&[(10, BellEvent::BellRang)]);
        let mut controller = FlashController::new(config_with(0, false), Box::new(session)).unwrap();

        controller.step().await.unwrap();
        assert!(controller.state().is_visible());

        run_until_exhausted(&mut controller).await;
        let actions: Vec<(u64, Action)> = journal(&log)
            .into_iter()
            .filter(|(_, action)| matches!(action, Action::Show | Action::Hide))
            .collect();
        assert_eq!(actions, vec![(10, Action::Show), (10, Action::Hide)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_events_change_nothing() {
        let (session, log) =
            ScriptedSession::new(&[(5, BellEvent::Ignored), (30, BellEvent::Ignored)]);
        let mut controller = FlashController::new(config_with(100, false), Box::new(session)).unwrap();

        run_until_exhausted(&mut controller).await;

        assert_eq!(journal(&log), vec![(0, Action::Create), (0, Action::Arm)]);
        assert_eq!(controller.state(), FlashState::Hidden);
        assert_eq!(controller.flash_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_matches_deadline() {
        let (session, _log) = ScriptedSession::new(&[
            (0, BellEvent::BellRang),
            (300, BellEvent::BellRang),
        ]);
        let mut controller = FlashController::new(config_with(100, false), Box::new(session)).unwrap();

        for _ in 0..4 {
            controller.step().await.unwrap();
            let state = controller.state();
            assert_eq!(state.is_visible(), state.deadline().is_some());
            assert_eq!(state.is_visible(), controller.session.is_visible());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_flash() {
        let (session, log) = ScriptedSession::new(&[]);
        let mut controller = FlashController::new(config_with(100, true), Box::new(session)).unwrap();

        controller.run().await.unwrap();

        assert_eq!(
            journal(&log),
            vec![
                (0, Action::Create),
                (0, Action::Show),
                (100, Action::Hide),
                (100, Action::Close),
            ]
        );
        assert_eq!(controller.state(), FlashState::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_hides_visible_window() {
        let (session, log) = ScriptedSession::new(&[(0, BellEvent::BellRang)]);
        let mut controller = FlashController::new(config_with(1000, false), Box::new(session)).unwrap();

        controller.step().await.unwrap();
        controller.shutdown().unwrap();

        let tail: Vec<Action> = journal(&log).into_iter().map(|(_, action)| action).collect();
        assert_eq!(tail, vec![Action::Create, Action::Show, Action::Hide, Action::Close]);
        assert_eq!(controller.state(), FlashState::Hidden);
    }

    #[test]
    fn test_default_geometry_matches_display() {
        let (session, _log) = ScriptedSession::new(&[]);
        let controller = FlashController::new(config_with(100, false), Box::new(session)).unwrap();

        assert_eq!(controller.geometry().width, DISPLAY_WIDTH);
        assert_eq!(controller.geometry().height, DISPLAY_HEIGHT);
    }

    #[test]
    fn test_explicit_geometry_is_exact() {
        let (session, _log) = ScriptedSession::new(&[]);
        let mut config = Config::default();
        config.window.x = -10;
        config.window.y = 20;
        config.window.width = Extent::Pixels(300);
        config.window.height = Extent::Display;

        let controller = FlashController::new(Arc::new(config), Box::new(session)).unwrap();
        assert_eq!(
            controller.geometry(),
            WindowGeometry {
                x: -10,
                y: 20,
                width: 300,
                height: DISPLAY_HEIGHT,
            }
        );
    }

    #[test]
    fn test_unknown_color_fails_before_window() {
        let (session, log) = ScriptedSession::new(&[]);
        let mut config = Config::default();
        config.window.color = Some("notacolor123".to_string());

        let err = FlashController::new(Arc::new(config), Box::new(session))
            .err()
            .expect("цвет должен быть отклонён");
        assert!(err.to_string().contains("notacolor123"));
        assert!(journal(&log).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_never_negative() {
        let now = Instant::now();
        let state = FlashState::Visible { deadline: now };

        assert_eq!(state.wait_timeout(now), Some(Duration::ZERO));
        assert_eq!(
            state.wait_timeout(now + Duration::from_millis(5)),
            Some(Duration::ZERO)
        );
        assert!(state.is_expired(now));
        assert!(!state.is_expired(now - Duration::from_millis(1)));

        assert_eq!(FlashState::Hidden.wait_timeout(now), None);
        assert!(!FlashState::Hidden.is_expired(now));
    }
}
