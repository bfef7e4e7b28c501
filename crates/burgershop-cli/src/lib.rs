//! burgershop-cli: argument parsing and logging setup for the binaries.

use std::time::Duration;

use burgershop::{Schedule, ServerConfig, ShopConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Run the burger shop.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Total burgers the kitchen will prepare.
    #[arg(default_value_t = 25, env = "BURGERSHOP_QUOTA")]
    pub max_burgers: u64,

    /// Number of chefs cooking concurrently.
    #[arg(default_value_t = 2, env = "BURGERSHOP_CHEFS")]
    pub chefs: usize,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 54321, env = "BURGERSHOP_PORT")]
    pub port: u16,

    /// Preparation times in milliseconds, cycled per chef.
    #[arg(long, value_delimiter = ',', default_value = "2000,4000")]
    pub prep_ms: Vec<u64>,

    /// Keep answering customers with "no more burgers" after selling out,
    /// until SIGINT/SIGTERM.
    #[arg(long)]
    pub keep_open: bool,

    /// Seconds connected customers get to leave after the shop sells out.
    #[arg(long, default_value_t = 10)]
    pub drain_secs: u64,
}

impl ServerArgs {
    pub fn shop_config(&self) -> ShopConfig {
        ShopConfig {
            quota: self.max_burgers,
            chefs: self.chefs,
            prep: schedule_from_millis(&self.prep_ms),
            keep_open_after_sellout: self.keep_open,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            drain_timeout: Duration::from_secs(self.drain_secs),
        }
    }
}

/// Order burgers from a burger shop.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct ClientArgs {
    /// Shop address.
    #[arg(default_value = "127.0.0.1")]
    pub server_ip: String,

    /// Shop port.
    #[arg(default_value_t = 54321, env = "BURGERSHOP_PORT")]
    pub port: u16,

    /// Burgers to order before leaving.
    #[arg(default_value_t = 10)]
    pub max_orders: u64,

    /// Eating times in milliseconds, cycled per burger.
    #[arg(long, value_delimiter = ',', default_value = "1000,3000,5000")]
    pub eat_ms: Vec<u64>,
}

impl ClientArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server_ip, self.port)
    }

    pub fn eat_schedule(&self) -> Schedule {
        schedule_from_millis(&self.eat_ms)
    }
}

pub fn schedule_from_millis(millis: &[u64]) -> Schedule {
    Schedule::cycle(millis.iter().copied().map(Duration::from_millis).collect())
}

/// Filter directives for the burgershop targets at `level` (from
/// `BURGERSHOP_LOG`). Unknown or missing levels fall back to info.
pub fn filter_directives(level: Option<&str>) -> String {
    let level = match level {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        _ => "info",
    };
    [
        "burgershop",
        "burgershop_cli",
        "burgershop_server",
        "burgershop_client",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .chain(std::iter::once("burgershop::bridge::codec=off".to_string()))
    .collect::<Vec<_>>()
    .join(",")
}

/// Initialize tracing with BURGERSHOP_LOG and LOG_FORMAT support.
///
/// `RUST_LOG` takes precedence over `BURGERSHOP_LOG`. `LOG_FORMAT=json`
/// switches to JSON lines. Logs go to stderr.
pub fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = std::env::var("BURGERSHOP_LOG").ok();
        EnvFilter::new(filter_directives(level.as_deref()))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_args_defaults() {
        let args = ServerArgs::try_parse_from(["burgershop-server"]).unwrap();
        let shop = args.shop_config();
        assert_eq!(shop.quota, 25);
        assert_eq!(shop.chefs, 2);
        assert_eq!(
            shop.prep.steps(),
            &[Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert!(!shop.keep_open_after_sellout);

        let server = args.server_config();
        assert_eq!(server.port, 54321);
        assert_eq!(server.drain_timeout, Duration::from_secs(10));
    }

    #[test]
    fn server_args_are_positional() {
        let args = ServerArgs::try_parse_from([
            "burgershop-server",
            "40",
            "3",
            "--prep-ms",
            "5,10",
            "--keep-open",
        ])
        .unwrap();
        let shop = args.shop_config();
        assert_eq!(shop.quota, 40);
        assert_eq!(shop.chefs, 3);
        assert_eq!(
            shop.prep.steps(),
            &[Duration::from_millis(5), Duration::from_millis(10)]
        );
        assert!(shop.keep_open_after_sellout);
    }

    #[test]
    fn zero_quota_parses_but_fails_validation() {
        let args = ServerArgs::try_parse_from(["burgershop-server", "0", "2"]).unwrap();
        assert_eq!(
            args.shop_config().validate(),
            Err(burgershop::ConfigError::ZeroQuota)
        );
    }

    #[test]
    fn client_args() {
        let args =
            ClientArgs::try_parse_from(["burgershop-client", "10.0.0.5", "6000", "3"]).unwrap();
        assert_eq!(args.addr(), "10.0.0.5:6000");
        assert_eq!(args.max_orders, 3);
        assert_eq!(args.eat_schedule().steps().len(), 3);
    }

    #[test]
    fn filter_levels() {
        assert!(filter_directives(None).starts_with("burgershop=info,"));
        assert!(filter_directives(Some("warning")).starts_with("burgershop=warn,"));
        assert!(filter_directives(Some("debug")).contains("burgershop_cli=debug"));
        assert!(filter_directives(Some("nonsense")).starts_with("burgershop=info,"));
    }
}
