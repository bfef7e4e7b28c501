//! Customer sessions: the consumers.
//!
//! A session answers each order with exactly one response. Claiming happens
//! under the monitor lock; the network send happens after the lock is gone.
//! While an order waits for a burger the session keeps watching its connection
//! so a customer who walks away mid-wait simply vanishes without being served.

use std::io;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::bridge::codec::JsonLinesCodec;
use crate::bridge::protocol::{SessionId, ShopRequest, ShopResponse};
use crate::monitor::Monitor;
use crate::pool::Grant;

/// Outcome of one claim attempt against the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Granted(Grant),
    Closed,
}

/// Claim one burger, waiting for the chefs if none is on the pass.
///
/// The full predicate is re-checked under the lock after every wakeup. The
/// session that takes the last burger closes the shop and broadcasts before
/// the lock is released.
pub async fn claim(monitor: &Monitor) -> Claim {
    let mut pool = monitor.lock().await;
    loop {
        if !pool.is_running() {
            return Claim::Closed;
        }
        if let Some(grant) = pool.try_consume() {
            if grant.sold_out {
                monitor.close_shop();
            }
            return Claim::Granted(grant);
        }
        pool = monitor.wait_for_availability(pool).await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Io(#[from] io::Error),
    #[error("customer sent another order while one was in flight")]
    Pipelined,
}

/// Why a session ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `NoMoreBurgers` was sent.
    ShopClosed,
    /// This session received the last burger of the quota, or its own
    /// servings reached the quota.
    LastBurger,
    /// The customer disconnected. `waiting` is set when an order was still
    /// waiting for a burger; nothing was consumed for it.
    CustomerLeft { waiting: bool },
}

/// Live record of a connected session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub connected_at: DateTime<Utc>,
    pub served: u64,
}

/// Connected sessions, for status reporting only.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(self: &Arc<Self>, id: SessionId) -> Registration {
        self.sessions.insert(
            id,
            SessionRecord {
                connected_at: Utc::now(),
                served: 0,
            },
        );
        Registration {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn active(&self) -> usize {
        self.sessions.len()
    }

    pub fn get(&self, id: &SessionId) -> Option<SessionRecord> {
        self.sessions.get(id).map(|r| r.value().clone())
    }
}

/// Keeps a session listed in the registry; removes it on drop.
pub struct Registration {
    id: SessionId,
    registry: Arc<SessionRegistry>,
}

impl Registration {
    fn record_served(&self, served: u64) {
        if let Some(mut record) = self.registry.sessions.get_mut(&self.id) {
            record.served = served;
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.sessions.remove(&self.id);
    }
}

/// One customer's conversation with the shop.
pub struct Session {
    id: SessionId,
    monitor: Arc<Monitor>,
    served: u64,
    finished: bool,
    registration: Option<Registration>,
}

impl Session {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self {
            id: SessionId::new(),
            monitor,
            served: 0,
            finished: false,
            registration: None,
        }
    }

    /// Attach a registry entry so the session shows up in status reports.
    pub fn with_registry(mut self, registry: &Arc<SessionRegistry>) -> Self {
        self.registration = Some(registry.register(self.id));
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Burgers served to this session so far.
    pub fn served(&self) -> u64 {
        self.served
    }

    /// No further orders will be processed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Answer one order.
    pub async fn take_order(&mut self) -> ShopResponse {
        match claim(&self.monitor).await {
            Claim::Granted(grant) => {
                self.served += 1;
                if let Some(registration) = &self.registration {
                    registration.record_served(self.served);
                }
                info!(
                    session = %self.id,
                    burger = grant.number,
                    remaining = grant.remaining,
                    "Served burger #{} to client. {} burgers left to serve",
                    grant.number,
                    grant.remaining
                );
                if grant.sold_out || self.served >= self.monitor.quota() {
                    self.finished = true;
                }
                grant.into()
            }
            Claim::Closed => {
                debug!(session = %self.id, "Customer denied, no more burgers");
                self.finished = true;
                ShopResponse::NoMoreBurgers
            }
        }
    }

    /// Drive the session over a byte stream until it ends.
    pub async fn serve<R, W>(mut self, reader: R, writer: W) -> Result<SessionEnd, SessionError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut requests = FramedRead::new(reader, JsonLinesCodec::<ShopRequest>::new());
        let mut responses = FramedWrite::new(writer, JsonLinesCodec::<ShopResponse>::new());

        debug!(session = %self.id, "Session started");

        loop {
            let request = match requests.next().await {
                Some(request) => request?,
                None => {
                    debug!(
                        session = %self.id,
                        served = self.served,
                        "Client disconnected, order done"
                    );
                    return Ok(SessionEnd::CustomerLeft { waiting: false });
                }
            };

            match request {
                ShopRequest::Order => {}
            }

            let response = tokio::select! {
                biased;
                response = self.take_order() => response,
                next = requests.next() => {
                    return match next {
                        None => {
                            debug!(session = %self.id, "Client left while waiting for a burger");
                            Ok(SessionEnd::CustomerLeft { waiting: true })
                        }
                        Some(Ok(_)) => Err(SessionError::Pipelined),
                        Some(Err(e)) => Err(e.into()),
                    };
                }
            };

            let terminal = response.is_terminal();
            responses.send(response).await?;

            if terminal {
                return Ok(SessionEnd::ShopClosed);
            }
            if self.finished {
                debug!(
                    session = %self.id,
                    served = self.served,
                    "Last burger served, ending session"
                );
                return Ok(SessionEnd::LastBurger);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    use super::*;
    use crate::chef::Kitchen;
    use crate::config::PrepSchedule;

    const DEADLINE: Duration = Duration::from_secs(20);

    fn fast() -> PrepSchedule {
        PrepSchedule::cycle(vec![Duration::from_millis(1), Duration::from_millis(2)])
    }

    async fn prebaked(quota: u64, produced: u64) -> Arc<Monitor> {
        let monitor = Arc::new(Monitor::new(quota));
        {
            let mut pool = monitor.lock().await;
            for _ in 0..produced {
                pool.try_produce();
            }
        }
        monitor
    }

    struct Customer {
        requests: FramedWrite<WriteHalf<DuplexStream>, JsonLinesCodec<ShopRequest>>,
        responses: FramedRead<ReadHalf<DuplexStream>, JsonLinesCodec<ShopResponse>>,
    }

    type SessionHandle = tokio::task::JoinHandle<Result<SessionEnd, SessionError>>;

    fn connect(session: Session) -> (Customer, SessionHandle) {
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let handle = tokio::spawn(session.serve(server_read, server_write));

        let (client_read, client_write) = tokio::io::split(client);
        let customer = Customer {
            requests: FramedWrite::new(client_write, JsonLinesCodec::new()),
            responses: FramedRead::new(client_read, JsonLinesCodec::new()),
        };
        (customer, handle)
    }

    #[tokio::test]
    async fn five_sequential_orders_then_closed() {
        let monitor = Arc::new(Monitor::new(5));
        let kitchen = Kitchen::open(Arc::clone(&monitor), 1, fast());
        let mut session = Session::new(Arc::clone(&monitor));

        for n in 1..=5 {
            let response = session.take_order().await;
            assert_eq!(
                response,
                ShopResponse::BurgerServed {
                    burger: n,
                    remaining: 5 - n
                }
            );
        }
        assert!(session.is_finished());
        assert_eq!(session.served(), 5);

        assert_eq!(session.take_order().await, ShopResponse::NoMoreBurgers);
        assert_eq!(kitchen.join().await, 5);
        assert_eq!(monitor.shutdown().transitions(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_burger_many_racers() {
        let monitor = Arc::new(Monitor::new(1));

        let mut racers = Vec::new();
        for _ in 0..16 {
            let mut session = Session::new(Arc::clone(&monitor));
            racers.push(tokio::spawn(async move { session.take_order().await }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        let kitchen = Kitchen::open(Arc::clone(&monitor), 1, fast());

        let mut served = 0;
        let mut closed = 0;
        for racer in racers {
            match tokio::time::timeout(DEADLINE, racer).await.expect("racer hung").unwrap() {
                ShopResponse::BurgerServed { .. } => served += 1,
                ShopResponse::NoMoreBurgers => closed += 1,
            }
        }

        assert_eq!(served, 1);
        assert_eq!(closed, 15);
        kitchen.join().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn stress_serves_exactly_the_quota() {
        let monitor = Arc::new(Monitor::new(1000));
        let kitchen = Kitchen::open(Arc::clone(&monitor), 5, fast());

        let sampler = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move {
                loop {
                    let running = {
                        let pool = monitor.lock().await;
                        pool.assert_invariants();
                        pool.is_running()
                    };
                    if !running {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut customers = Vec::new();
        for _ in 0..50 {
            let mut session = Session::new(Arc::clone(&monitor));
            customers.push(tokio::spawn(async move {
                let mut served = 0u64;
                loop {
                    match session.take_order().await {
                        ShopResponse::BurgerServed { .. } => served += 1,
                        ShopResponse::NoMoreBurgers => break,
                    }
                    if session.is_finished() {
                        break;
                    }
                }
                served
            }));
        }

        let mut total = 0;
        for customer in customers {
            total += tokio::time::timeout(DEADLINE, customer)
                .await
                .expect("customer hung")
                .unwrap();
        }

        assert_eq!(total, 1000);
        assert_eq!(kitchen.join().await, 1000);
        sampler.await.unwrap();

        let snap = monitor.snapshot().await;
        assert_eq!(snap.consumed, 1000);
        assert!(!snap.running);
        assert_eq!(monitor.shutdown().transitions(), 1);
    }

    #[tokio::test]
    async fn serve_ends_after_last_burger() {
        let monitor = prebaked(2, 2).await;
        let (mut customer, handle) = connect(Session::new(Arc::clone(&monitor)));

        for n in 1..=2 {
            customer.requests.send(ShopRequest::Order).await.unwrap();
            let response = customer.responses.next().await.unwrap().unwrap();
            assert_eq!(
                response,
                ShopResponse::BurgerServed {
                    burger: n,
                    remaining: 2 - n
                }
            );
        }

        assert_eq!(handle.await.unwrap().unwrap(), SessionEnd::LastBurger);
        assert!(customer.responses.next().await.is_none());

        // A newcomer is turned away without waiting.
        let (mut late, handle) = connect(Session::new(Arc::clone(&monitor)));
        late.requests.send(ShopRequest::Order).await.unwrap();
        assert_eq!(
            late.responses.next().await.unwrap().unwrap(),
            ShopResponse::NoMoreBurgers
        );
        assert_eq!(handle.await.unwrap().unwrap(), SessionEnd::ShopClosed);
    }

    #[tokio::test]
    async fn customer_leaving_mid_wait_consumes_nothing() {
        let monitor = prebaked(1, 0).await;
        let (mut customer, handle) = connect(Session::new(Arc::clone(&monitor)));

        customer.requests.send(ShopRequest::Order).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(customer);

        let end = tokio::time::timeout(DEADLINE, handle)
            .await
            .expect("session hung")
            .unwrap()
            .unwrap();
        assert_eq!(end, SessionEnd::CustomerLeft { waiting: true });

        let snap = monitor.snapshot().await;
        assert_eq!(snap.consumed, 0);
        assert!(snap.running);
    }

    #[tokio::test]
    async fn customer_leaving_between_orders_is_not_an_error() {
        let monitor = prebaked(3, 3).await;
        let (mut customer, handle) = connect(Session::new(Arc::clone(&monitor)));

        customer.requests.send(ShopRequest::Order).await.unwrap();
        customer.responses.next().await.unwrap().unwrap();
        drop(customer);

        assert_eq!(
            handle.await.unwrap().unwrap(),
            SessionEnd::CustomerLeft { waiting: false }
        );
        assert_eq!(monitor.snapshot().await.consumed, 1);
    }

    #[tokio::test]
    async fn pipelined_order_ends_session() {
        let monitor = prebaked(1, 0).await;
        let (mut customer, handle) = connect(Session::new(Arc::clone(&monitor)));

        customer.requests.send(ShopRequest::Order).await.unwrap();
        customer.requests.send(ShopRequest::Order).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Pipelined));
        assert_eq!(monitor.snapshot().await.consumed, 0);
    }

    #[tokio::test]
    async fn garbage_is_a_transport_failure() {
        use tokio::io::AsyncWriteExt;

        let monitor = prebaked(1, 1).await;
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let session = Session::new(Arc::clone(&monitor));
        let handle = tokio::spawn(session.serve(server_read, server_write));

        let (_client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(b"Order\n").await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Io(e) if e.kind() == io::ErrorKind::InvalidData));
        assert!(monitor.snapshot().await.running);
    }

    #[tokio::test]
    async fn registry_tracks_live_sessions() {
        let monitor = prebaked(2, 2).await;
        let registry = Arc::new(SessionRegistry::new());

        let mut session = Session::new(Arc::clone(&monitor)).with_registry(&registry);
        let id = session.id();
        assert_eq!(registry.active(), 1);

        session.take_order().await;
        assert_eq!(registry.get(&id).unwrap().served, 1);

        drop(session);
        assert_eq!(registry.active(), 0);
        assert!(registry.get(&id).is_none());
    }
}
