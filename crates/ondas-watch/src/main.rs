use anyhow::Context;
use clap::{Parser, Subcommand};
use ondas_proto::config::Config;
use ondas_proto::library::{Favorites, Recents};
use ondas_proto::protocol::Station;
use ondas_watch::api::ApiClient;
use ondas_watch::monitor::{MonitorCore, MonitorEvent, MonitorUpdate};
use ondas_watch::view::{Panel, PlayerView, ViewManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ondas", about = "Headless client for an internet-radio backend")]
struct Cli {
    /// Backend base URL (overrides the config file).
    #[arg(long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// List the stations the backend knows about.
    Stations,
    /// Monitor a station's now-playing metadata until interrupted.
    Watch {
        /// Case-insensitive name fragment of the station to watch.
        name: Option<String>,
        /// Pick a random station instead of matching by name.
        #[arg(long)]
        random: bool,
        /// Poll period in seconds (overrides the config file).
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Toggle a station in the favorites list.
    Fav { name: String },
    /// List favorite stations.
    Favorites,
    /// Show the locally-recorded listening history.
    Recent,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for command output.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("failed to load config, using defaults: {}", e);
        Config::default()
    });
    if let Some(backend) = cli.backend {
        config.backend.base_url = backend;
    }

    let api = Arc::new(ApiClient::new(&config.backend)?);

    match cli.command {
        CliCommand::Stations => {
            let stations = api.stations().await.context("fetching station list")?;
            let favorites = Favorites::load(&config.favorites_path());
            for station in &stations {
                let marker = if favorites.contains(station) { "*" } else { " " };
                println!("{} {}  {}", marker, station.name, station.stream);
            }
            info!("{} stations", stations.len());
        }

        CliCommand::Watch {
            name,
            random,
            interval,
        } => {
            watch(api, &config, name, random, interval).await?;
        }

        CliCommand::Fav { name } => {
            let stations = api.stations().await.context("fetching station list")?;
            let station = find_station(&stations, &name)
                .with_context(|| format!("no station matches '{}'", name))?;

            let mut favorites = Favorites::load(&config.favorites_path());
            let added = favorites.toggle(&station);
            favorites.save().context("saving favorites")?;
            if added {
                println!("added '{}' to favorites", station.name);
            } else {
                println!("removed '{}' from favorites", station.name);
            }
        }

        CliCommand::Favorites => {
            let favorites = Favorites::load(&config.favorites_path());
            if favorites.is_empty() {
                println!("no favorites yet");
            }
            for station in favorites.all() {
                println!("{}  {}", station.name, station.stream);
            }
        }

        CliCommand::Recent => {
            let recents = Recents::load(&config.recents_path());
            if recents.is_empty() {
                println!("no listening history yet");
            }
            for entry in recents.entries() {
                let when = entry
                    .listened_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}  {}", when, entry.station.name);
            }
        }
    }

    Ok(())
}

async fn watch(
    api: Arc<ApiClient>,
    config: &Config,
    name: Option<String>,
    random: bool,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let stations = api.stations().await.context("fetching station list")?;
    anyhow::ensure!(!stations.is_empty(), "backend returned no stations");

    let station = if random {
        use rand::Rng;
        stations[rand::thread_rng().gen_range(0..stations.len())].clone()
    } else {
        let needle = name.ok_or_else(|| anyhow::anyhow!("station name required unless --random"))?;
        find_station(&stations, &needle)
            .with_context(|| format!("no station matches '{}'", needle))?
    };

    // Record the listen locally before monitoring starts.
    let mut recents = Recents::load(&config.recents_path());
    recents.record(&station);
    if let Err(e) = recents.save() {
        warn!("failed to save listening history: {}", e);
    }

    let poll = Duration::from_secs(interval.unwrap_or(config.polling.interval_secs).max(1));

    let views = Arc::new(ViewManager::new());
    let (update_tx, mut update_rx) = broadcast::channel::<MonitorUpdate>(256);
    let (event_tx, event_rx) = mpsc::channel::<MonitorEvent>(256);
    let core = MonitorCore::new(api, views.clone(), update_tx, event_tx, poll);
    let handle = core.handle();
    let core_task = tokio::spawn(core.run(event_rx));

    handle.start(station.clone()).await;
    info!("watching '{}' (ctrl-c to stop)", station.name);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            update = update_rx.recv() => match update {
                Ok(MonitorUpdate::ViewUpdated) => {
                    print_view(&views.snapshot().await);
                }
                Ok(MonitorUpdate::TrackChanged(Some(key))) => {
                    println!("♪ {}", key);
                }
                Ok(MonitorUpdate::TrackChanged(None)) => {}
                Ok(MonitorUpdate::Stopped) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("skipped {} view updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    handle.stop().await;
    handle.shutdown().await;
    let _ = core_task.await;
    Ok(())
}

/// Case-insensitive substring match on the station name.
fn find_station(stations: &[Station], needle: &str) -> Option<Station> {
    let needle = needle.to_lowercase();
    stations
        .iter()
        .find(|s| s.name.to_lowercase().contains(&needle))
        .cloned()
}

fn print_view(view: &PlayerView) {
    let station = view
        .station
        .as_ref()
        .map(|s| s.name.as_str())
        .unwrap_or("-");
    println!(
        "[{}] {}  lyrics:{} bio:{} top:{}  history:{}",
        station,
        view.song_line(),
        panel_tag(&view.lyrics),
        panel_tag(&view.bio),
        panel_tag(&view.top_tracks),
        view.recent.len()
    );
}

fn panel_tag<T>(panel: &Panel<T>) -> &'static str {
    match panel {
        Panel::Empty => "-",
        Panel::Loading => "...",
        Panel::Ready(_) => "ok",
        Panel::Failed(_) => "err",
    }
}
