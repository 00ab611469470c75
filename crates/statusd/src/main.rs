use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let daemon = match statusd::bootstrap() {
        Ok(daemon) => daemon,
        Err(error) => {
            eprintln!("statusd: {error}");
            return ExitCode::FAILURE;
        }
    };

    match daemon.serve(io::stdin().lock(), io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("statusd: observation feed failed: {error}");
            ExitCode::from(2)
        }
    }
}
