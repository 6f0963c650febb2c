use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod services;
mod utils;

use config::{
    parse_color, parse_duration_ms, parse_extent, parse_position, Config, FlashConfig,
    LoggingConfig, WindowConfig, DEFAULT_DURATION_MS,
};
use events::Extent;
use services::{create_display_session, FlashController};

#[derive(Parser, Debug)]
#[command(name = "xvisbell", version)]
#[command(about = "Визуальный звонок для X11: вспышка окна вместо звукового сигнала")]
#[command(disable_help_flag = true)]
struct Args {
    /// Позиция левого верхнего угла по X
    #[arg(short = 'x', long = "x", default_value = "0", value_parser = parse_position, allow_negative_numbers = true)]
    x: i16,

    /// Позиция левого верхнего угла по Y
    #[arg(short = 'y', long = "y", default_value = "0", value_parser = parse_position, allow_negative_numbers = true)]
    y: i16,

    /// Ширина окна; отрицательное значение - ширина дисплея
    #[arg(short = 'w', long, default_value = "-1", value_parser = parse_extent, allow_negative_numbers = true)]
    width: Extent,

    /// Высота окна; отрицательное значение - высота дисплея
    #[arg(short = 'h', long, default_value = "-1", value_parser = parse_extent, allow_negative_numbers = true)]
    height: Extent,

    /// Имя цвета X11 (по умолчанию white)
    #[arg(short = 'c', long, visible_alias = "colour", value_parser = parse_color)]
    color: Option<String>,

    /// Длительность вспышки в миллисекундах
    #[arg(short = 'd', long, default_value_t = DEFAULT_DURATION_MS, value_parser = parse_duration_ms)]
    duration: u64,

    /// Мигнуть один раз и выйти
    #[arg(short = 'f', long)]
    flash: bool,

    /// Режим сухого запуска (без X сервера)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Показать справку
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            window: WindowConfig {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                color: self.color,
            },
            flash: FlashConfig {
                duration_ms: self.duration,
                one_shot: self.flash,
            },
            logging: LoggingConfig {
                level: self.log_level,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let dry_run = args.dry_run;
    let config = Arc::new(args.into_config());
    config.validate()?;

    // Инициализация системы логирования
    init_tracing(&config.logging.level)?;

    info!("Запуск xvisbell v{}", env!("CARGO_PKG_VERSION"));

    if dry_run {
        warn!("Режим сухого запуска - X сервер не используется");
    } else {
        utils::check_display_environment()?;
    }

    let session = create_display_session(dry_run).context("Не удалось открыть дисплей")?;
    let mut controller = FlashController::new(config.clone(), session)
        .context("Не удалось создать окно вспышки")?;
    info!("Окно вспышки: {}", controller.geometry());

    // Ожидание сигнала завершения параллельно с циклом событий
    let outcome = tokio::select! {
        result = controller.run() => result,
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }
            Ok(())
        }
    };

    if let Err(e) = controller.shutdown() {
        warn!("Не удалось корректно убрать окно: {}", e);
    }

    outcome.context("Ошибка в цикле событий")?;

    info!("xvisbell завершил работу");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}
