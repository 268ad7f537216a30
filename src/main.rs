use std::process::ExitCode;

use blob_extract_lib::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    // A local .env can supply overrides for the properties file
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match blob_extract_lib::run(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
