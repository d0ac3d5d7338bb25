mod bili;
mod config;
mod lyrics;
mod playlist;
mod server;
mod storage;

use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bilimusic", version, about = "Bilibili-backed music web player")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Override the listen port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Search Bilibili videos and print to stdout (headless).
    Search {
        keyword: String,
    },
    /// Resolve the audio stream url for a video (headless).
    Audio {
        bvid: String,
    },
    /// Fetch lyrics for a title and print to stdout (headless).
    Lyrics {
        title: String,
        bvid: String,
    },

    /// Configure the Bilibili account cookie.
    Auth {
        #[command(subcommand)]
        method: AuthCommand,
    },
}

#[derive(Debug, Subcommand)]
enum AuthCommand {
    /// Store a raw cookie string (SESSDATA=...).
    Cookie {
        cookie: String,
    },
    /// Clear the stored cookie.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                cfg.server.port = port;
            }
            server::run(cfg).await?;
        }
        Command::Search { keyword } => {
            let bili = make_client(&cfg)?;
            let videos = bili.search(&keyword).await?;
            print_videos(&videos);
        }
        Command::Audio { bvid } => {
            let bili = make_client(&cfg)?;
            let url = bili.resolve_audio_url(&bvid).await?;
            println!("{url}");
        }
        Command::Lyrics { title, bvid } => {
            let store = storage::Storage::open(&cfg.paths.data_dir)?;
            let svc = lyrics::LyricsService::new(lyrics::qq::QqMusicClient::new(), store);
            let outcome = svc.lookup(&title, &bvid).await?;
            for cue in &outcome.lyrics {
                println!("[{:02}:{:02}] {}", cue.time / 60, cue.time % 60, cue.text);
            }
        }
        Command::Auth { method } => {
            match method {
                AuthCommand::Cookie { cookie } => {
                    cfg.bilibili.cookie = Some(cookie);
                }
                AuthCommand::Clear => {
                    cfg.bilibili.cookie = None;
                }
            }
            config::save(&cfg, cli.config.as_deref()).context("save config")?;
            println!("Updated config auth settings.");
        }
    }

    Ok(())
}

fn make_client(cfg: &config::Config) -> anyhow::Result<bili::api::BiliClient> {
    bili::api::BiliClient::new(cfg.bilibili.cookie.as_deref())
}

fn print_videos(videos: &[bili::models::VideoSummary]) {
    for (i, v) in videos.iter().enumerate() {
        println!("{:02}. {} - {}  (bvid={})", i + 1, v.title, v.author, v.bvid);
    }
}
