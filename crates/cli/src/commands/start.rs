use bootcamp_core::config::{AppConfig, LoadOptions};

use crate::commands::{check_listener, CommandResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "start",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let address = match check_listener(&config.server) {
        Ok(address) => address,
        Err(message) => return CommandResult::failure("start", "listener", message, 3),
    };

    CommandResult::success(
        "start",
        format!(
            "startup preflight passed; `bootcamp-server` will serve /slack/events, /github-starring and /health on {address} and relay stars to #{}",
            config.github.notify_channel
        ),
    )
}
