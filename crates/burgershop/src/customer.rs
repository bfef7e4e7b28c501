//! Customer client: orders burgers from a shop and eats them.
//!
//! Orders are strictly sequential: one order in flight, wait for the reply,
//! eat, then order again.

use std::io;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{info, warn};

use crate::bridge::codec::JsonLinesCodec;
use crate::bridge::protocol::{ShopRequest, ShopResponse};
use crate::config::EatSchedule;

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("failed to connect to shop: {0}")]
    Connect(#[source] io::Error),
    #[error("connection to shop failed: {0}")]
    Io(#[from] io::Error),
}

/// How a visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// Every burger of the order was served.
    Satisfied,
    /// The shop answered `NoMoreBurgers`.
    ShopClosed,
    /// The connection ended or failed before the order was complete.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub ordered: u64,
    pub served: u64,
    pub outcome: VisitOutcome,
}

pub struct Customer {
    responses: FramedRead<OwnedReadHalf, JsonLinesCodec<ShopResponse>>,
    requests: FramedWrite<OwnedWriteHalf, JsonLinesCodec<ShopRequest>>,
    eat: EatSchedule,
}

impl Customer {
    pub async fn connect(
        addr: impl ToSocketAddrs,
        eat: EatSchedule,
    ) -> Result<Self, CustomerError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(CustomerError::Connect)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            responses: FramedRead::new(reader, JsonLinesCodec::new()),
            requests: FramedWrite::new(writer, JsonLinesCodec::new()),
            eat,
        })
    }

    /// Place one order and wait for the reply. `None` means the shop hung up.
    pub async fn order(&mut self) -> Result<Option<ShopResponse>, CustomerError> {
        self.requests.send(ShopRequest::Order).await?;
        match self.responses.next().await {
            Some(response) => Ok(Some(response?)),
            None => Ok(None),
        }
    }

    /// Order up to `max_orders` burgers, eating each one before the next order.
    pub async fn visit(mut self, max_orders: u64) -> Visit {
        let mut visit = Visit {
            ordered: 0,
            served: 0,
            outcome: VisitOutcome::Satisfied,
        };

        for i in 1..=max_orders {
            visit.ordered = i;
            info!(order = i, "Ordered burger #{}", i);

            match self.order().await {
                Ok(Some(ShopResponse::BurgerServed { burger, .. })) => {
                    visit.served += 1;
                    let eat_time = self.eat.step(0, i - 1);
                    tokio::time::sleep(eat_time).await;
                    info!(
                        order = i,
                        burger,
                        eat_ms = eat_time.as_millis() as u64,
                        "Finished eating burger #{} in {:?}",
                        i,
                        eat_time
                    );
                    if i < max_orders {
                        info!("{} burgers left in the order", max_orders - i);
                    }
                }
                Ok(Some(ShopResponse::NoMoreBurgers)) => {
                    info!("No more burgers available, leaving");
                    visit.outcome = VisitOutcome::ShopClosed;
                    return visit;
                }
                Ok(None) => {
                    info!("Shop closed the connection, leaving");
                    visit.outcome = VisitOutcome::Disconnected;
                    return visit;
                }
                Err(e) => {
                    warn!(error = %e, "No response from shop, leaving");
                    visit.outcome = VisitOutcome::Disconnected;
                    return visit;
                }
            }
        }

        visit
    }
}
