pub mod display_session;
pub mod flash_controller;

pub use display_session::{create_display_session, DisplaySession};
pub use flash_controller::FlashController;
