use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_caption_uploader::config::{
    DEFAULT_CLIENT_SECRETS, DEFAULT_OAUTH_PORT, DEFAULT_TOKEN_CACHE,
};
use youtube_caption_uploader::youtube_api::PrivacyStatus;
use youtube_caption_uploader::{
    Error, LanguageTable, Session, SessionConfig, Target, UploadRequest,
};

/// Upload a video to YouTube and attach every caption file in a directory.
///
/// Caption files are named after their language: `ko.srt`, `en.vtt`, `zh-TW.srt`.
#[derive(Debug, Parser)]
#[command(name = "upload", version)]
struct Cli {
    /// Video file to upload as a new video.
    #[arg(
        required_unless_present_any = ["video_id", "list_languages"],
        conflicts_with = "video_id"
    )]
    video: Option<PathBuf>,

    /// Title of the new video.
    #[arg(
        required_unless_present_any = ["video_id", "list_languages"],
        conflicts_with = "video_id"
    )]
    title: Option<String>,

    /// Attach captions to this existing video instead of uploading one.
    #[arg(long)]
    video_id: Option<String>,

    /// Directory of caption files.
    #[arg(long, short = 'c', required_unless_present = "list_languages")]
    captions: Option<PathBuf>,

    /// Description of the new video.
    #[arg(long, short = 'd', conflicts_with = "video_id")]
    description: Option<String>,

    /// Who can see the new video.
    #[arg(long, short = 'p', value_enum, default_value_t, conflicts_with = "video_id")]
    privacy: PrivacyStatus,

    /// JSON file of localized titles and descriptions.
    #[arg(long, short = 'm')]
    metadata: Option<PathBuf>,

    /// Don't upload captions for languages the video already has.
    #[arg(long)]
    skip_existing: bool,

    /// Print the recognized language codes and exit.
    #[arg(long, conflicts_with_all = ["video", "title", "video_id", "captions"])]
    list_languages: bool,

    /// OAuth client secrets downloaded from the Google Cloud console.
    #[arg(long, env = "YT_UPLOADER_CLIENT_SECRETS", default_value = DEFAULT_CLIENT_SECRETS)]
    client_secrets: PathBuf,

    /// Where to keep the OAuth token between runs.
    #[arg(long, env = "YT_UPLOADER_TOKEN_CACHE", default_value = DEFAULT_TOKEN_CACHE)]
    token_cache: PathBuf,

    /// Local port for the OAuth redirect.
    #[arg(long, env = "YT_UPLOADER_OAUTH_PORT", default_value_t = DEFAULT_OAUTH_PORT)]
    oauth_port: u16,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            client_secrets: self.client_secrets.clone(),
            token_cache: self.token_cache.clone(),
            oauth_port: self.oauth_port,
        }
    }

    fn upload_request(&self) -> Result<UploadRequest, Error> {
        let target = match (&self.video_id, &self.video, &self.title) {
            (Some(id), _, _) => Target::ExistingVideo { id: id.clone() },
            (None, Some(path), Some(title)) => Target::NewVideo {
                path: path.clone(),
                title: title.clone(),
                description: self.description.clone(),
                privacy: self.privacy,
            },
            _ => {
                return Err(Error::Input(
                    "give either a video file and title, or --video-id".to_string(),
                ));
            }
        };
        let captions_dir = self
            .captions
            .clone()
            .ok_or_else(|| Error::Input("--captions is required".to_string()))?;

        Ok(UploadRequest {
            target,
            captions_dir,
            metadata: self.metadata.clone(),
            skip_existing: self.skip_existing,
        })
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    if cli.list_languages {
        for (code, label) in LanguageTable::iter() {
            println!("{code:<8}{label}");
        }
        return Ok(());
    }

    // Check the local inputs before sending anyone to a browser.
    let plan = cli.upload_request()?.prepare().await?;
    tracing::info!(captions = plan.captions().len(), "found caption files");

    let session = Session::authenticate(&cli.session_config()).await?;
    let result = plan.execute(session.client()).await;
    if let Err(e) = session.persist().await {
        tracing::warn!(error = format!("{e:#}"), "failed to save refreshed token");
    }
    let report = result?;

    println!("{}", report.watch_url());
    print!("{}", report.summary);
    Ok(())
}
