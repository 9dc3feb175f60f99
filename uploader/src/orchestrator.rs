//! Publishing a video and attaching its caption tracks.
//!
//! A run has two phases. [`UploadRequest::prepare`] checks everything that can be checked
//! locally (the video file, the captions directory, the metadata file) and fails with
//! [`Error::Input`] before anything touches the network. [`UploadPlan::execute`] then either
//! uploads the new video or adopts an existing one, and attaches every caption file in turn.
//!
//! Caption attachment is best-effort: a caption that fails to upload is logged and recorded in
//! the [`BatchSummary`], and the remaining files are still uploaded. Nothing is rolled back.

use crate::error::Error;
use crate::languages::LanguageTable;
use crate::metadata::{DefaultMetadata, VideoMetadata};
use crate::youtube_api::{
    CaptionInsertRequest, Localizations, PrivacyStatus, VideoInsertRequest, VideoSnippet,
    VideoStatus, VideoUpdateRequest, YouTubeClient, uploaded_track_languages, watch_url,
};
use eyre::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Language assumed for a video's own title and description when nothing says otherwise.
pub const DEFAULT_LANGUAGE: &str = "en";

/// The video-hosting operations a run needs.
///
/// [`YouTubeClient`] is the real implementation.
#[allow(async_fn_in_trait)]
pub trait Platform {
    /// Uploads a new video and returns its ID.
    async fn create_video(&self, request: &VideoInsertRequest, media: &Path)
    -> eyre::Result<String>;

    /// Attaches a caption track to a video and returns the track's ID.
    async fn add_caption(
        &self,
        video_id: &str,
        language: &str,
        name: &str,
        content: &[u8],
    ) -> eyre::Result<String>;

    /// Languages that already have an uploaded caption track on the video.
    ///
    /// Tracks YouTube generated automatically don't count.
    async fn caption_languages(&self, video_id: &str) -> eyre::Result<Vec<String>>;

    /// Language codes YouTube accepts as localization keys.
    async fn supported_languages(&self) -> eyre::Result<BTreeSet<String>>;

    /// Adds localized titles and descriptions to an existing video.
    async fn localize_video(
        &self,
        video_id: &str,
        defaults: &DefaultMetadata,
        localizations: &Localizations,
    ) -> eyre::Result<()>;
}

/// Which video the captions go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Upload this file as a new video first.
    NewVideo {
        path: PathBuf,
        title: String,
        /// Falls back to the metadata file's default description, then to empty.
        description: Option<String>,
        privacy: PrivacyStatus,
    },
    /// Attach captions to a video that is already on YouTube.
    ExistingVideo { id: String },
}

/// Everything the user asked for, before any of it has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub target: Target,
    pub captions_dir: PathBuf,
    /// Localized titles and descriptions to apply to the video.
    pub metadata: Option<PathBuf>,
    /// Leave out captions whose language already has a track on the video.
    pub skip_existing: bool,
}

/// One caption file, with the language taken from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionFile {
    /// File stem, lowercased: `KO.srt` has language code `ko`.
    pub language_code: String,
    pub path: PathBuf,
}

impl CaptionFile {
    /// Returns `None` for paths without a usable file stem.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.trim();
        if stem.is_empty() {
            return None;
        }
        Some(Self {
            language_code: stem.to_lowercase(),
            path,
        })
    }

    /// Human-readable language name, if the code is a known one.
    pub fn label(&self) -> Option<&'static str> {
        LanguageTable::label(&self.language_code)
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Caption files in `dir`, ordered by file name.
///
/// Hidden files and anything that isn't a regular file are ignored. A missing directory or one
/// without any caption files is an input error.
pub async fn list_caption_files(dir: &Path) -> Result<Vec<CaptionFile>, Error> {
    let unreadable =
        |e: std::io::Error| Error::input(format!("cannot read captions directory {}: {e}", dir.display()));

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => continue,
        }
        match CaptionFile::from_path(path) {
            Some(caption) => files.push(caption),
            None => tracing::warn!(
                file = %entry.file_name().to_string_lossy(),
                "ignoring caption file without a usable language code"
            ),
        }
    }

    if files.is_empty() {
        return Err(Error::input(format!(
            "no caption files in {}",
            dir.display()
        )));
    }
    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

async fn check_video_file(path: &Path) -> Result<(), Error> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::input(format!("video file {}: {e}", path.display())))?;
    if !meta.is_file() {
        return Err(Error::input(format!(
            "video path {} is not a file",
            path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(Error::input(format!(
            "video file {} is empty",
            path.display()
        )));
    }
    // Opening catches permission problems that metadata alone does not.
    tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::input(format!("cannot open video file {}: {e}", path.display())))?;
    Ok(())
}

/// A checked request, ready to be carried out.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    target: PlannedTarget,
    captions: Vec<CaptionFile>,
    skip_existing: bool,
}

#[derive(Debug, Clone)]
enum PlannedTarget {
    NewVideo {
        path: PathBuf,
        request: VideoInsertRequest,
    },
    ExistingVideo {
        id: String,
        metadata: Option<VideoMetadata>,
    },
}

impl UploadRequest {
    /// Validates all local inputs. Never touches the network.
    pub async fn prepare(self) -> Result<UploadPlan, Error> {
        match &self.target {
            Target::NewVideo { path, title, .. } => {
                check_video_file(path).await?;
                if title.trim().is_empty() {
                    return Err(Error::input("video title must not be empty"));
                }
            }
            Target::ExistingVideo { id } => {
                if id.trim().is_empty() {
                    return Err(Error::input("video id must not be empty"));
                }
            }
        }

        let captions = list_caption_files(&self.captions_dir).await?;

        let metadata = match &self.metadata {
            Some(path) => Some(
                VideoMetadata::load(path)
                    .await
                    .map_err(|e| Error::input(format!("{e:#}")))?,
            ),
            None => None,
        };

        let target = match self.target {
            Target::NewVideo {
                path,
                title,
                description,
                privacy,
            } => {
                let defaults = metadata.as_ref().map(|m| &m.default);
                let description = description
                    .or_else(|| defaults.and_then(|d| d.description.clone()))
                    .unwrap_or_default();
                let default_language = defaults
                    .and_then(|d| d.language.clone())
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
                let localizations = metadata
                    .as_ref()
                    .map(VideoMetadata::localizations)
                    .unwrap_or_default();

                PlannedTarget::NewVideo {
                    path,
                    request: VideoInsertRequest {
                        snippet: VideoSnippet {
                            title,
                            description,
                            category_id: crate::youtube_api::videos::DEFAULT_CATEGORY_ID
                                .to_string(),
                            default_language: Some(default_language),
                        },
                        status: VideoStatus {
                            privacy_status: privacy,
                            self_declared_made_for_kids: false,
                        },
                        localizations,
                    },
                }
            }
            Target::ExistingVideo { id } => PlannedTarget::ExistingVideo {
                id: id.trim().to_string(),
                metadata,
            },
        };

        Ok(UploadPlan {
            target,
            captions,
            skip_existing: self.skip_existing,
        })
    }
}

impl UploadPlan {
    pub fn captions(&self) -> &[CaptionFile] {
        &self.captions
    }

    /// Uploads the video (if new) and then attaches every caption.
    ///
    /// Only a failed video upload is fatal; caption failures end up in the summary.
    pub async fn execute(&self, platform: &impl Platform) -> Result<RunReport, Error> {
        let video_id = match &self.target {
            PlannedTarget::NewVideo { path, request } => {
                let mut request = request.clone();
                request.localizations =
                    supported_localizations(platform, &request.localizations).await;
                tracing::info!(
                    path = %path.display(),
                    title = %request.snippet.title,
                    privacy = %request.status.privacy_status,
                    localizations = request.localizations.len(),
                    "uploading video"
                );
                let id = platform
                    .create_video(&request, path)
                    .await
                    .map_err(Error::Upload)?;
                tracing::info!(video_id = %id, url = %watch_url(&id), "video uploaded");
                id
            }
            PlannedTarget::ExistingVideo { id, metadata } => {
                tracing::info!(video_id = %id, "using existing video");
                if let Some(metadata) = metadata {
                    let localizations =
                        supported_localizations(platform, &metadata.localizations()).await;
                    if localizations.is_empty() {
                        tracing::warn!("metadata file has no usable localizations");
                    } else if let Err(e) = platform
                        .localize_video(id, &metadata.default, &localizations)
                        .await
                    {
                        tracing::error!(
                            video_id = %id,
                            error = format!("{e:#}"),
                            "failed to update localized metadata"
                        );
                    } else {
                        tracing::info!(
                            languages = localizations.len(),
                            "updated localized metadata"
                        );
                    }
                }
                id.clone()
            }
        };

        let summary = attach_captions(platform, &video_id, &self.captions, self.skip_existing).await;
        Ok(RunReport { video_id, summary })
    }
}

/// The subset of `localizations` that YouTube will accept.
///
/// Asks YouTube which languages it supports, falling back to a built-in list if that fails.
async fn supported_localizations(
    platform: &impl Platform,
    localizations: &Localizations,
) -> Localizations {
    if localizations.is_empty() {
        return Localizations::new();
    }
    let supported = match platform.supported_languages().await {
        Ok(supported) => supported,
        Err(e) => {
            tracing::warn!(
                error = format!("{e:#}"),
                "could not list supported languages, using built-in list"
            );
            LanguageTable::fallback_localizations()
                .map(String::from)
                .collect()
        }
    };

    let mut localizations = localizations.clone();
    let dropped = retain_supported(&mut localizations, &supported);
    if !dropped.is_empty() {
        tracing::warn!(
            languages = dropped.join(", "),
            "skipping localizations in languages YouTube does not support"
        );
    }
    localizations
}

/// Removes localizations whose code is not in `supported`, and returns the removed codes.
pub fn retain_supported(
    localizations: &mut Localizations,
    supported: &BTreeSet<String>,
) -> Vec<String> {
    let mut dropped = Vec::new();
    localizations.retain(|code, _| {
        let keep = supported.contains(code);
        if !keep {
            dropped.push(code.clone());
        }
        keep
    });
    dropped
}

/// Checks and carries out `request` in one go.
pub async fn run(platform: &impl Platform, request: UploadRequest) -> Result<RunReport, Error> {
    request.prepare().await?.execute(platform).await
}

/// Uploads each caption in order, one at a time, continuing past failures.
pub async fn attach_captions(
    platform: &impl Platform,
    video_id: &str,
    captions: &[CaptionFile],
    skip_existing: bool,
) -> BatchSummary {
    let existing: BTreeSet<String> = if skip_existing {
        match platform.caption_languages(video_id).await {
            Ok(languages) => languages
                .into_iter()
                .map(|l| l.to_ascii_lowercase())
                .collect(),
            Err(e) => {
                tracing::warn!(
                    error = format!("{e:#}"),
                    "could not list existing captions, uploading all"
                );
                BTreeSet::new()
            }
        }
    } else {
        BTreeSet::new()
    };

    let total = captions.len();
    let mut summary = BatchSummary::default();
    for (i, caption) in captions.iter().enumerate() {
        let file = caption.file_name();
        let language = LanguageTable::platform_code(&caption.language_code);
        let name: &str = match caption.label() {
            Some(label) => label,
            None => {
                tracing::warn!(
                    file,
                    language = %caption.language_code,
                    "unrecognized language code, uploading unlabeled"
                );
                &caption.language_code
            }
        };

        if existing.contains(&language.to_ascii_lowercase()) {
            tracing::info!(file, %language, "caption track already exists, skipping");
            summary.record(caption, CaptionOutcome::Skipped);
            continue;
        }

        let outcome = match upload_caption(platform, video_id, caption, &language, name).await {
            Ok(caption_id) => {
                tracing::info!(
                    progress = format!("{}/{}", i + 1, total),
                    file,
                    %language,
                    caption_id,
                    "caption uploaded"
                );
                CaptionOutcome::Uploaded { caption_id }
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::error!(
                    progress = format!("{}/{}", i + 1, total),
                    file,
                    %language,
                    reason,
                    "caption upload failed"
                );
                CaptionOutcome::Failed { reason }
            }
        };
        summary.record(caption, outcome);
    }
    summary
}

async fn upload_caption(
    platform: &impl Platform,
    video_id: &str,
    caption: &CaptionFile,
    language: &str,
    name: &str,
) -> eyre::Result<String> {
    let content = tokio::fs::read(&caption.path)
        .await
        .with_context(|| format!("read {}", caption.path.display()))?;
    platform
        .add_caption(video_id, language, name, &content)
        .await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionOutcome {
    Uploaded { caption_id: String },
    /// A track in this language was already there.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionResult {
    pub file: PathBuf,
    pub language_code: String,
    pub outcome: CaptionOutcome,
}

/// Per-language tally of caption outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// What happened to each caption file, in the order they were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    results: Vec<CaptionResult>,
}

impl BatchSummary {
    fn record(&mut self, caption: &CaptionFile, outcome: CaptionOutcome) {
        self.results.push(CaptionResult {
            file: caption.path.clone(),
            language_code: caption.language_code.clone(),
            outcome,
        });
    }

    pub fn results(&self) -> &[CaptionResult] {
        &self.results
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, CaptionOutcome::Uploaded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CaptionOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CaptionOutcome::Skipped))
    }

    fn count(&self, f: impl Fn(&CaptionOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| f(&r.outcome)).count()
    }

    pub fn by_language(&self) -> BTreeMap<&str, LanguageCounts> {
        let mut counts = BTreeMap::<&str, LanguageCounts>::new();
        for result in &self.results {
            let entry = counts.entry(result.language_code.as_str()).or_default();
            match result.outcome {
                CaptionOutcome::Uploaded { .. } => entry.succeeded += 1,
                CaptionOutcome::Failed { .. } => entry.failed += 1,
                CaptionOutcome::Skipped => entry.skipped += 1,
            }
        }
        counts
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} of {} captions uploaded, {} failed, {} skipped",
            self.succeeded(),
            self.total(),
            self.failed(),
            self.skipped()
        )?;
        for (code, counts) in self.by_language() {
            let label = LanguageTable::label(code).unwrap_or("(unlabeled)");
            writeln!(
                f,
                "  {code:<8}{label:<24}{} ok, {} failed, {} skipped",
                counts.succeeded, counts.failed, counts.skipped
            )?;
        }
        for result in &self.results {
            if let CaptionOutcome::Failed { reason } = &result.outcome {
                let file = result
                    .file
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                writeln!(f, "  failed {file}: {reason}")?;
            }
        }
        Ok(())
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub video_id: String,
    pub summary: BatchSummary,
}

impl RunReport {
    pub fn watch_url(&self) -> String {
        watch_url(&self.video_id)
    }
}

impl Platform for YouTubeClient {
    async fn create_video(
        &self,
        request: &VideoInsertRequest,
        media: &Path,
    ) -> eyre::Result<String> {
        Ok(self.insert_video(request, media).await?.id)
    }

    async fn add_caption(
        &self,
        video_id: &str,
        language: &str,
        name: &str,
        content: &[u8],
    ) -> eyre::Result<String> {
        let request = CaptionInsertRequest::new(video_id, language, name);
        Ok(self.insert_caption(&request, content).await?.id)
    }

    async fn caption_languages(&self, video_id: &str) -> eyre::Result<Vec<String>> {
        Ok(uploaded_track_languages(self.list_captions(video_id).await?))
    }

    async fn supported_languages(&self) -> eyre::Result<BTreeSet<String>> {
        Ok(self
            .list_i18n_languages()
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect())
    }

    async fn localize_video(
        &self,
        video_id: &str,
        defaults: &DefaultMetadata,
        localizations: &Localizations,
    ) -> eyre::Result<()> {
        let video = self.get_video(video_id).await?;
        let Some(mut snippet) = video.snippet else {
            eyre::bail!("video {video_id} came back without a snippet");
        };
        if let Some(title) = &defaults.title {
            snippet.title = title.clone();
        }
        if let Some(description) = &defaults.description {
            snippet.description = description.clone();
        }
        if let Some(language) = &defaults.language {
            snippet.default_language = Some(language.clone());
        }
        if snippet.default_language.is_none() {
            snippet.default_language = Some(DEFAULT_LANGUAGE.to_string());
        }

        let mut merged = video.localizations;
        merged.extend(localizations.clone());

        self.update_video(&VideoUpdateRequest {
            id: video_id.to_string(),
            snippet,
            localizations: merged,
        })
        .await
        .context("update video localizations")?;
        Ok(())
    }
}
