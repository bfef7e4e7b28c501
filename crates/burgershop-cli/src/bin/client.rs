//! burgershop-client: connect to a shop and order burgers.

use anyhow::Context;
use burgershop::{Customer, VisitOutcome};
use burgershop_cli::{ClientArgs, init_tracing};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = ClientArgs::parse();
    let addr = args.addr();

    let customer = Customer::connect(addr.as_str(), args.eat_schedule())
        .await
        .with_context(|| format!("could not reach shop at {addr}"))?;
    info!("Connected to shop at {}", addr);

    let visit = customer.visit(args.max_orders).await;
    match visit.outcome {
        VisitOutcome::Satisfied => info!(served = visit.served, "Order complete, leaving"),
        VisitOutcome::ShopClosed => info!(
            served = visit.served,
            ordered = visit.ordered,
            "Shop sold out before the order was complete"
        ),
        VisitOutcome::Disconnected => info!(
            served = visit.served,
            ordered = visit.ordered,
            "Lost the shop before the order was complete"
        ),
    }

    Ok(())
}
