use std::process::ExitCode;

fn main() -> ExitCode {
    bootcamp_cli::run()
}
