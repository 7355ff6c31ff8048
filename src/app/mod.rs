//! Application runtime composition modules.

pub(crate) mod command_dispatcher;
pub(crate) mod exit_handler;
pub(crate) mod terminal;
