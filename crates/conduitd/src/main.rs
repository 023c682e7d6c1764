use std::process::ExitCode;

fn main() -> ExitCode {
    match conduitd::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be installed when bootstrap fails early.
            eprintln!("conduitd: {error}");
            ExitCode::FAILURE
        }
    }
}
