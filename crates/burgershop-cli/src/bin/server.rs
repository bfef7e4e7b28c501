//! burgershop-server: run the shop on TCP until it sells out.

use std::process::ExitCode;

use burgershop::{SHOP_VERSION, ShopService};
use burgershop_cli::{ServerArgs, init_tracing};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = ServerArgs::parse();

    let service = match ShopService::new(args.shop_config()) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Invalid shop configuration");
            eprintln!("burgershop-server: {e}");
            return ExitCode::from(2);
        }
    };

    info!(version = SHOP_VERSION, "Starting burgershop");

    if let Err(e) = burgershop::transport::serve(args.server_config(), service).await {
        error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
