//! Binary entrypoint for the Bot AI chat server.

use std::process::ExitCode;

use bot_ai::start_bot_ai;

fn main() -> ExitCode {
    start_bot_ai::run()
}
