use status_updater::app;
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    app::main()
}
