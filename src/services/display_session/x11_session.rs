use crate::config::WindowConfig;
use crate::error::{Result, VisbellError};
use crate::events::{BellEvent, Readiness, WindowGeometry};
use crate::{trace_if_enabled, visbell_error};
use std::collections::VecDeque;
use std::os::unix::io::{AsFd, OwnedFd};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyError;
use x11rb::protocol::xkb::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, StackMode, Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::r#trait::DisplaySession;

/// Версия XKB, с которой работает клиент
const XKB_MAJOR_VERSION: u16 = 1;
const XKB_MINOR_VERSION: u16 = 0;

/// Зарегистрировать в реакторе собственную копию дескриптора сокета
fn register_stream(stream: &impl AsFd) -> Result<AsyncFd<OwnedFd>> {
    Ok(AsyncFd::new(stream.as_fd().try_clone_to_owned()?)?)
}

pub struct X11Session {
    /// Дубликат дескриптора соединения, зарегистрированный в реакторе
    fd: AsyncFd<OwnedFd>,
    conn: RustConnection,
    screen_num: usize,
    window: Option<Window>,
    visible: bool,
    /// События, прочитанные из сокета во время ожидания
    pending: VecDeque<Event>,
}

impl X11Session {
    pub fn open() -> Result<Self> {
        info!("Подключение к X серверу");

        let (conn, screen_num) = x11rb::connect(None)?;
        Self::check_xkb(&conn)?;

        let fd = register_stream(conn.stream())?;

        let screen = &conn.setup().roots[screen_num];
        info!(
            "Подключено к X серверу, экран {}, корневое окно 0x{:x}, {}x{}",
            screen_num, screen.root, screen.width_in_pixels, screen.height_in_pixels
        );

        Ok(Self {
            fd,
            conn,
            screen_num,
            window: None,
            visible: false,
            pending: VecDeque::new(),
        })
    }

    fn check_xkb(conn: &RustConnection) -> Result<()> {
        if conn.extension_information(xkb::X11_EXTENSION_NAME)?.is_none() {
            return Err(visbell_error!(extension_missing, "{}", xkb::X11_EXTENSION_NAME));
        }

        let reply = conn
            .xkb_use_extension(XKB_MAJOR_VERSION, XKB_MINOR_VERSION)?
            .reply()?;
        if !reply.supported {
            return Err(visbell_error!(
                extension_missing,
                "{} {}.{} (версия сервера {}.{})",
                xkb::X11_EXTENSION_NAME,
                XKB_MAJOR_VERSION,
                XKB_MINOR_VERSION,
                reply.server_major,
                reply.server_minor
            ));
        }

        debug!(
            "XKB {}.{} доступен",
            reply.server_major, reply.server_minor
        );
        Ok(())
    }

    fn window(&self) -> Result<Window> {
        self.window
            .ok_or_else(|| visbell_error!(internal, "Окно вспышки ещё не создано"))
    }

    /// Пиксель фона: белый пиксель экрана или цвет из палитры по умолчанию
    fn resolve_color(&self, window: &WindowConfig) -> Result<u32> {
        let screen = &self.conn.setup().roots[self.screen_num];
        if !window.wants_named_color() {
            return Ok(screen.white_pixel);
        }

        let name = window.color_name();
        let cookie = self
            .conn
            .alloc_named_color(screen.default_colormap, name.as_bytes())?;

        match cookie.reply() {
            Ok(reply) => {
                debug!("Цвет {} разрешён в пиксель 0x{:06x}", name, reply.pixel);
                Ok(reply.pixel)
            }
            Err(ReplyError::X11Error(e)) => {
                debug!("Сервер отклонил цвет {}: {:?}", name, e.error_kind);
                VisbellError::color_not_found(name)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn classify(event: Event) -> BellEvent {
        let kind = match event {
            Event::XkbBellNotify(_) => BellEvent::BellRang,
            // TODO: пересчитать размер окна по ConfigureNotify корневого окна
            _ => BellEvent::Ignored,
        };
        trace_if_enabled!("Событие {}: {:?}", kind, event);
        kind
    }
}

#[async_trait::async_trait]
impl DisplaySession for X11Session {
    fn create_window(&mut self, window: &WindowConfig) -> Result<WindowGeometry> {
        if self.window.is_some() {
            return Err(visbell_error!(internal, "Окно вспышки уже создано"));
        }

        let screen = &self.conn.setup().roots[self.screen_num];
        let (root, depth, visual) = (screen.root, screen.root_depth, screen.root_visual);
        let geometry = WindowGeometry::resolve(
            window.x,
            window.y,
            window.width,
            window.height,
            screen.width_in_pixels,
            screen.height_in_pixels,
        );

        let pixel = self.resolve_color(window)?;

        // override_redirect: окно не видит оконный менеджер, фокус не уходит
        let aux = CreateWindowAux::new()
            .background_pixel(pixel)
            .override_redirect(1u32)
            .save_under(1u32);

        let id = self.conn.generate_id()?;
        self.conn
            .create_window(
                depth,
                id,
                root,
                geometry.x,
                geometry.y,
                geometry.width,
                geometry.height,
                0,
                WindowClass::INPUT_OUTPUT,
                visual,
                &aux,
            )?
            .check()?;

        self.window = Some(id);
        info!(
            "Окно вспышки 0x{:x} создано: {} (запрошено {}x{}), цвет {}",
            id,
            geometry,
            window.width,
            window.height,
            window.color_name()
        );
        Ok(geometry)
    }

    fn arm_bell_notifications(&mut self) -> Result<()> {
        let device: xkb::DeviceSpec = xkb::ID::USE_CORE_KBD.into();

        self.conn
            .xkb_select_events(
                device,
                0u8.into(),
                xkb::EventType::BELL_NOTIFY,
                0u8.into(),
                0u8.into(),
                &xkb::SelectEventsAux::new(),
            )?
            .check()?;

        // Сервер вернёт AudibleBell сам, когда клиент отключится
        self.conn
            .xkb_per_client_flags(
                device,
                xkb::PerClientFlag::AUTO_RESET_CONTROLS,
                xkb::PerClientFlag::AUTO_RESET_CONTROLS,
                xkb::BoolCtrl::AUDIBLE_BELL_MASK,
                xkb::BoolCtrl::AUDIBLE_BELL_MASK,
                xkb::BoolCtrl::AUDIBLE_BELL_MASK,
            )?
            .reply()?;

        // Меняем только enabled controls, остальные поля сервер игнорирует
        self.conn
            .xkb_set_controls(
                device,
                0u8.into(), // affect_internal_real_mods
                0u8.into(), // internal_real_mods
                0u8.into(), // affect_ignore_lock_real_mods
                0u8.into(), // ignore_lock_real_mods
                0u8.into(), // affect_internal_virtual_mods
                0u8.into(), // internal_virtual_mods
                0u8.into(), // affect_ignore_lock_virtual_mods
                0u8.into(), // ignore_lock_virtual_mods
                0u8.into(), // mouse_keys_dflt_btn
                0u8.into(), // groups_wrap
                0u8.into(), // access_x_options
                xkb::BoolCtrl::AUDIBLE_BELL_MASK,
                0u8.into(), // enabled_controls: звук выключен
                xkb::Control::CONTROLS_ENABLED,
                0u8.into(), // repeat_delay
                0u8.into(), // repeat_interval
                0u8.into(), // slow_keys_delay
                0u8.into(), // debounce_delay
                0u8.into(), // mouse_keys_delay
                0u8.into(), // mouse_keys_interval
                0u8.into(), // mouse_keys_time_to_max
                0u8.into(), // mouse_keys_max_speed
                0u8.into(), // mouse_keys_curve
                0u8.into(), // access_x_timeout
                0u8.into(), // access_x_timeout_mask
                0u8.into(), // access_x_timeout_values
                0u8.into(), // access_x_timeout_options_mask
                0u8.into(), // access_x_timeout_options_values
                &[0; 32],
            )?
            .check()?;

        info!("Подписка на XKB звонки активна, звуковой сигнал отключён");
        Ok(())
    }

    async fn poll_for_event(&mut self, timeout: Option<Duration>) -> Result<Readiness> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        loop {
            if !self.pending.is_empty() {
                return Ok(Readiness::EventsPending);
            }

            // x11rb мог уже прочитать события вместе с ответами на запросы
            if let Some(event) = self.conn.poll_for_event()? {
                self.pending.push_back(event);
                return Ok(Readiness::EventsPending);
            }

            let readable = match deadline {
                Some(deadline) => match timeout_at(deadline, self.fd.readable()).await {
                    Ok(readable) => readable,
                    Err(_) => return Ok(Readiness::TimedOut),
                },
                None => self.fd.readable().await,
            };

            // Данные из сокета заберёт poll_for_event на следующей итерации
            readable?.clear_ready();
        }
    }

    fn drain_events(&mut self) -> Result<Vec<BellEvent>> {
        let mut events: Vec<BellEvent> = self.pending.drain(..).map(Self::classify).collect();

        while let Some(event) = self.conn.poll_for_event()? {
            events.push(Self::classify(event));
        }

        Ok(events)
    }

    fn show_window(&mut self) -> Result<()> {
        let window = self.window()?;

        self.conn.map_window(window)?;
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.conn.flush()?;

        if !self.visible {
            debug!("Окно 0x{:x} показано", window);
        }
        self.visible = true;
        Ok(())
    }

    fn hide_window(&mut self) -> Result<()> {
        if !self.visible {
            return Ok(());
        }

        let window = self.window()?;
        self.conn.unmap_window(window)?;
        self.conn.flush()?;

        debug!("Окно 0x{:x} скрыто", window);
        self.visible = false;
        Ok(())
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn close(&mut self) -> Result<()> {
        if let Some(window) = self.window.take() {
            self.conn.destroy_window(window)?;
            self.conn.flush()?;
            self.visible = false;
            info!("Окно вспышки 0x{:x} уничтожено", window);
        }
        Ok(())
    }
}

impl Drop for X11Session {
    fn drop(&mut self) {
        if self.window.is_some() {
            warn!("X11Session закрывается с неуничтоженным окном");
        }
        info!("Закрытие соединения с X сервером");
    }
}
