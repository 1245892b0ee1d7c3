use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chords_catalog::catalog_store::Artist;
use chords_catalog::config::{self, SearchEngine};
use chords_catalog::service::{
    ArtistInfo, CatalogService, CatalogStats, PopularSong, ReindexReport, ResolvedSearchHit,
    SongWithArtists,
};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
#[clap(about = "Inspect and maintain a chords catalog")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing catalog.db and search.db.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// Search index implementation.
    #[clap(long, value_enum)]
    pub search_engine: Option<SearchEngine>,

    /// Print results as JSON instead of text.
    #[clap(long)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full-text search over songs and artists.
    Search { query: String },
    /// Songs ranked by views.
    Popular {
        /// day, week, month, year or allTime.
        #[clap(long, default_value = "week")]
        period: String,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long, default_value_t = 0)]
        offset: usize,
    },
    /// List all artists.
    Artists,
    /// Show an artist and the songs crediting it.
    Artist { id: i64 },
    /// Show a song with its credits. Does not count as a view.
    Song { id: i64 },
    /// Rebuild the search index from the catalog.
    Reindex,
    /// Print catalog and search index counters.
    Stats,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            search_engine: args.search_engine,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    // stdout is reserved for command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  search engine: {:?}", app_config.search.engine);

    let service = CatalogService::open(&app_config)?;
    let out = Output {
        json: cli_args.json,
    };

    match cli_args.command {
        Command::Search { query } => {
            let hits = service.search_resolved(&query)?;
            out.print(hits.as_slice(), print_hits)
        }
        Command::Popular {
            period,
            limit,
            offset,
        } => {
            let songs = service.get_popular_songs(&period, limit, offset)?;
            out.print(songs.as_slice(), print_popular)
        }
        Command::Artists => {
            let artists = service.get_artists()?;
            out.print(artists.as_slice(), print_artists)
        }
        Command::Artist { id } => {
            let info = service.get_artist_info(id)?;
            out.print(&info, print_artist_info)
        }
        Command::Song { id } => {
            let song = service.get_song_with_artists(id)?;
            out.print(&song, print_song)
        }
        Command::Reindex => {
            let report = service.reindex_all()?;
            out.print(&report, |r: &ReindexReport| {
                println!(
                    "Indexed {} songs and {} artists, removed {} stale documents",
                    r.songs, r.artists, r.removed
                )
            })
        }
        Command::Stats => {
            let stats = service.stats()?;
            out.print(&stats, print_stats)
        }
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn print<T: Serialize + ?Sized>(&self, value: &T, text: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

fn names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

fn print_hits(hits: &[ResolvedSearchHit]) {
    if hits.is_empty() {
        println!("No results");
    }
    for hit in hits {
        match hit {
            ResolvedSearchHit::Song { score, song } => {
                println!("{:>8.3}  song   {:>6}  {}", score, song.id, song.title)
            }
            ResolvedSearchHit::Artist { score, artist } => {
                println!("{:>8.3}  artist {:>6}  {}", score, artist.id, artist.name)
            }
        }
    }
}

fn print_popular(songs: &[PopularSong]) {
    for (position, entry) in songs.iter().enumerate() {
        println!(
            "{:>3}. {} - {} ({} views)",
            position + 1,
            entry.song.title,
            names(entry.artists.iter().map(|a| a.name.as_str())),
            entry.views
        );
    }
}

fn print_artists(artists: &[Artist]) {
    for artist in artists {
        println!("{:>6}  {}", artist.id, artist.name);
    }
}

fn print_artist_info(info: &ArtistInfo) {
    println!("{} (#{})", info.artist.name, info.artist.id);
    if !info.artist.description.is_empty() {
        println!("{}", info.artist.description);
    }
    for song in &info.songs {
        println!(
            "  {:>6}  {} - {}",
            song.id,
            song.title,
            names(song.artists.iter().map(|a| a.name.as_str()))
        );
    }
}

fn print_song(song: &SongWithArtists) {
    println!(
        "{} - {}",
        song.song.title,
        names(song.artists.iter().map(|c| c.artist.name.as_str()))
    );
    if !song.song.description.is_empty() {
        println!("{}", song.song.description);
    }
    println!();
    println!("{}", song.song.content);
}

fn print_stats(stats: &CatalogStats) {
    println!("songs:        {}", stats.catalog.songs);
    println!("artists:      {}", stats.catalog.artists);
    println!("credits:      {}", stats.catalog.links);
    println!("view events:  {}", stats.catalog.view_events);
    println!(
        "search index: {} ({} documents, {} words)",
        stats.search.engine, stats.search.documents, stats.search.vocabulary_words
    );
}
