use clap::{Parser, Subcommand};
use quake_feed::api::feed_client::{ApiClient, EventFeed};
use quake_feed::api::server::{create_app, AppState};
use quake_feed::api::usgs::UsgsApi;
use quake_feed::services::dashboard::Command;
use quake_feed::services::marker_renderer::ClusterGroup;
use quake_feed::utils::clock::SystemClock;
use quake_feed::utils::display::DisplayFormatter;
use quake_feed::{Config, Dashboard, FeedCache};
use std::error::Error;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "quake_feed", about = "Cached USGS earthquake feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Serve /api/earthquakes and /api/status
    Serve,
    /// Poll a running server and show the filtered events
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Mode::Serve) {
        Mode::Serve => serve(config).await,
        Mode::Watch => watch(config).await,
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn Error>> {
    info!("Starting earthquake feed server");

    let source = UsgsApi::new(config.feed_url.clone(), config.upstream_timeout)?;
    info!("Upstream feed: {}", source.url());

    let cache = FeedCache::new(Arc::new(source), Arc::new(SystemClock), config.cache_ttl)
        .with_single_flight(config.single_flight);
    let app = create_app(AppState::new(cache), &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on http://localhost:{}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn watch(config: Config) -> Result<(), Box<dyn Error>> {
    info!("Watching {}", config.api_base);

    let display = DisplayFormatter::new();
    let mut dashboard = Dashboard::new(Arc::new(ApiClient::new(config.api_base.clone())), ClusterGroup::new());

    println!("=== Earthquakes (last day) ===");
    println!("Commands:");
    println!("  r            - Refresh now (bypasses the server cache)");
    println!("  min <mag>    - Set minimum magnitude");
    println!("  depth <km>   - Set maximum depth, or 'depth any'");
    println!("  show         - Redraw the list");
    println!("  exit         - Exit the program");

    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!("Poll tick");
                dashboard.refresh(false).await;
                render(&mut io::stdout(), &display, &dashboard)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Exit) => {
                        debug!("Received exit command");
                        break;
                    }
                    Ok(Command::Refresh) => {
                        let feed = dashboard.begin_refresh();
                        if dashboard.is_loading() {
                            println!("Refreshing...");
                        }
                        let result = feed.fetch_events(true).await;
                        dashboard.finish_refresh(result);
                    }
                    Ok(Command::MinMag(mag)) => dashboard.set_min_mag(mag),
                    Ok(Command::MaxDepth(depth)) => dashboard.set_max_depth(depth),
                    Ok(Command::Show) => {}
                    Err(msg) => {
                        warn!("{}", msg);
                        continue;
                    }
                }
                render(&mut io::stdout(), &display, &dashboard)?;
            }
        }
    }

    info!("Shutting down");
    Ok(())
}

fn render<W: Write>(
    out: &mut W,
    display: &DisplayFormatter,
    dashboard: &Dashboard<ClusterGroup>,
) -> io::Result<()> {
    let layer = dashboard.layer();
    let clusters = layer.clusters(display.summary_cell_deg());

    writeln!(out, "{}", display.format_header("Earthquakes"))?;
    writeln!(
        out,
        "{}",
        display.format_status(dashboard.total(), &dashboard.criteria(), dashboard.last_updated())
    )?;
    writeln!(out, "{}", display.format_cluster_summary(layer.len(), clusters.len()))?;
    writeln!(out, "\n{}", display.format_legend())?;
    writeln!(out, "\n{}", display.format_event_table(dashboard.visible_list()))?;
    write!(out, "> ")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quake_feed::api::feed_client::FeedSnapshot;
    use quake_feed::error::ClientError;

    struct NoFeed;

    #[async_trait]
    impl EventFeed for NoFeed {
        async fn fetch_events(&self, _refresh: bool) -> Result<FeedSnapshot, ClientError> {
            Err(ClientError::Status {
                status: 503,
                message: String::new(),
            })
        }
    }

    /// Accepts writes but refuses to flush.
    struct StuckTerminal(Vec<u8>);

    impl Write for StuckTerminal {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal gone"))
        }
    }

    #[test]
    fn test_render_writes_prompt() {
        let dashboard = Dashboard::new(Arc::new(NoFeed), ClusterGroup::new());
        let mut out = Vec::new();

        render(&mut out, &DisplayFormatter::new(), &dashboard).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Total:"));
        assert!(text.ends_with("> "));
    }

    #[test]
    fn test_render_reports_flush_failure() {
        let dashboard = Dashboard::new(Arc::new(NoFeed), ClusterGroup::new());
        let mut out = StuckTerminal(Vec::new());

        let err = render(&mut out, &DisplayFormatter::new(), &dashboard).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
