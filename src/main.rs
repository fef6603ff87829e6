use std::process::ExitCode;

fn main() -> ExitCode {
    promgine_lib::run()
}
