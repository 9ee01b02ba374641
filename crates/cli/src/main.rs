use std::process::ExitCode;

fn main() -> ExitCode {
    leadquote_cli::run()
}
