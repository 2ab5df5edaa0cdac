//! Embassy tasks

pub mod buttons;
pub mod console;
pub mod controller;
pub mod shell;

pub use buttons::buttons_task;
pub use console::console_task;
pub use controller::controller_task;
pub use shell::shell_task;
