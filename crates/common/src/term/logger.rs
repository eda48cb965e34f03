use std::fmt::Display;

use cliclack::{intro as cliclack_intro, log, outro as cliclack_outro};
use console::{style, Term};

use crate::config::global_config;

fn term_write(msg: impl Display) {
    let _ = Term::stderr().write_str(&msg.to_string());
}

pub fn intro() {
    let _ = cliclack_intro(style(" vault-ops ").on_cyan().black());
}

pub fn outro(msg: impl Display) {
    let _ = cliclack_outro(msg);
}

pub fn info(msg: impl Display) {
    let _ = log::info(msg);
}

pub fn step(msg: impl Display) {
    let _ = log::step(msg);
}

pub fn success(msg: impl Display) {
    let _ = log::success(msg);
}

pub fn warn(msg: impl Display) {
    let _ = log::warning(msg);
}

pub fn error(msg: impl Display) {
    let _ = log::error(style(msg).red());
}

/// Printed only in verbose mode.
pub fn debug(msg: impl Display) {
    if global_config().verbose {
        let _ = log::remark(style(msg).dim());
    }
}

pub fn note(msg: impl Display, content: impl Display) {
    let _ = cliclack::note(msg, content);
}

pub fn new_empty_line() {
    term_write("\n");
}
