#![allow(clippy::cargo_common_metadata)]

use std::process::ExitCode;

#[cfg(feature = "cli")]
pub(crate) mod cli;

use rbx_bundler::fmt::Label;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    #[cfg(feature = "cli")]
    {
        match cli::Cli::new().run().await {
            Ok(code) => code,
            Err(err) => {
                eprintln!("{}", Label::Error.line(format_args!("{err:?}")));
                ExitCode::FAILURE
            }
        }
    }

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("{}", Label::Error.line("CLI feature is disabled"));
        ExitCode::FAILURE
    }
}
