//! # CLI Module
//!
//! Argument handling for the `webdispatch` binary.
//!
//! ```bash
//! webdispatch [REPOSITORY...] [--addr HOST:PORT] [--watch] [--strict] [--setup NAME]
//! ```
//!
//! Leading arguments up to the first one starting with `-` are repository
//! directories searched, in order, for the setup module. Without any, the
//! current directory is searched.
//!
//! ## Examples
//!
//! ```bash
//! # Serve ./app/setup.yaml on its httpConf address
//! webdispatch ./app
//!
//! # Search two repositories, listen on a fixed port, reload on edit
//! webdispatch ./site ./shared --addr 127.0.0.1:8080 --watch
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{build_app, parse_args, run, run_cli, split_repositories, Cli};
