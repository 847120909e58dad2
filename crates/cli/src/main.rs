use std::process::ExitCode;

fn main() -> ExitCode {
    tably_cli::run()
}
