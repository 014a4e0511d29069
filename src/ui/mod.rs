pub mod icons;
pub mod progress;

pub use progress::FleetUI;

use console::style;
use icons::{CHECK, CROSS, INFO, WARN};

/// Section header, e.g. `== FORK ==`.
pub fn header(title: &str) {
    println!();
    println!("{}", style(format!("== {} ==", title)).bold().cyan());
}

pub fn info(msg: impl AsRef<str>) {
    println!("{}{}", INFO, msg.as_ref());
}

pub fn success(msg: impl AsRef<str>) {
    println!("{}{}", CHECK, style(msg.as_ref()).green());
}

pub fn warning(msg: impl AsRef<str>) {
    println!("{}{}", WARN, style(msg.as_ref()).yellow());
}

pub fn error(msg: impl AsRef<str>) {
    eprintln!("{}{}", CROSS, style(msg.as_ref()).red());
}
