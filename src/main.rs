use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use vokabel_scan::cli::Cli;
use vokabel_scan::{logger, App, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 初始化日志
    logger::init(cli.verbose);

    // 加载配置
    let config = Config::from_env();

    // 初始化并执行命令
    let result = match App::initialize(config) {
        Ok(mut app) => app.execute(cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => {
            println!("{}", output.trim_end());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("{}", e);
            if e.is_credential_error() {
                eprintln!("API-Schlüssel setzen mit: vokabel-scan key set <SCHLÜSSEL>");
            }
            ExitCode::FAILURE
        }
    }
}
