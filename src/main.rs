use std::process::ExitCode;

mod app;
mod cli;
mod codec;
mod commands;
mod config;
mod context;
mod identity;
mod issue;
mod logger;
mod reconcile;
mod sync;
mod task;
mod tracker;


fn main() -> ExitCode {
    app::main()
}
