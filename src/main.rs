use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod args;
mod ass;
mod audio;
mod auth;
mod captions;
mod composer;
mod config;
mod errors;
mod llm;
mod music;
mod quote;
mod tts;
mod upload;
mod utils;
mod visuals;

use args::Args;
use captions::{CaptionOptions, Mode, Utterance};
use composer::{Background, Overlay};
use config::Settings;
use errors::CaptionError;
use llm::LlmRouter;
use tts::TtsEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.config)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    utils::ensure_ffmpeg()?;
    let client = reqwest::Client::new();
    let music_dir = PathBuf::from(&settings.paths.music);
    music::ensure_music_assets(&client, &music_dir).await?;

    let topic = args
        .topic
        .clone()
        .unwrap_or_else(|| quote::pick_topic(&mut rng).to_string());
    info!("Starting pipeline for topic: {}", topic);

    let router = LlmRouter::from_settings(&settings.llm, client.clone());
    let mut temp_files: Vec<PathBuf> = Vec::new();

    let result = if args.long {
        run_long(&args, &settings, &client, &router, &topic, &mut rng, &mut temp_files).await
    } else {
        run_short(&args, &settings, &client, &router, &topic, &mut rng, &mut temp_files).await
    };

    if !args.keep_temps {
        utils::cleanup(&temp_files);
    }

    match result {
        Ok(path) => {
            info!("Process complete. Final video: {}", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {:#}", e);
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_short(
    args: &Args,
    settings: &Settings,
    client: &reqwest::Client,
    router: &LlmRouter,
    topic: &str,
    rng: &mut StdRng,
    temp_files: &mut Vec<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let temp_dir = PathBuf::from(&settings.paths.temp);
    std::fs::create_dir_all(&temp_dir)?;
    let tag = format!("{:04}", rng.gen_range(0..10_000u32));

    let quote = quote::generate_quote(router, topic).await?;
    let narration = tts::sanitize_for_tts(&quote)?;

    let background = acquire_background(
        settings, client, topic, "portrait", &temp_dir, rng, temp_files, false,
    )
    .await?;

    let speech = tts_engine(args, rng).synthesize(&narration, &temp_dir, &tag)?;
    temp_files.push(speech.audio_path.clone());
    let voice_duration = audio::media_duration(&speech.audio_path)?;
    info!("Narration runs {:.2}s", voice_duration.as_secs_f64());
    let video_duration = composer::short_video_duration(voice_duration);

    let overlay = build_overlay(
        settings,
        speech.events,
        &narration,
        voice_duration,
        video_duration,
        1080,
        1920,
        &temp_dir.join(format!("captions_{tag}.ass")),
        temp_files,
    )?;

    let music = composer::pick_music(Path::new(&settings.paths.music), rng);
    let output = output_path(args, settings, &format!("short_{tag}.mp4"));
    let video = composer::render_short(
        &background,
        &speech.audio_path,
        &overlay,
        music.as_deref(),
        video_duration,
        &output,
    )?;

    if args.dry_run {
        info!("Dry run enabled. Skipping uploads.");
        return Ok(video);
    }

    let title = format!("Daily {} Quote #shorts #motivation", capitalize(topic));
    let description = settings.upload.description_template.replace("{quote}", &quote);
    let tags = vec![
        "shorts".to_string(),
        "motivation".to_string(),
        "inspiration".to_string(),
        topic.to_string(),
        "quotes".to_string(),
    ];
    publish(args, settings, client, &video, &title, &description, &tags).await;
    Ok(video)
}

#[allow(clippy::too_many_arguments)]
async fn run_long(
    args: &Args,
    settings: &Settings,
    client: &reqwest::Client,
    router: &LlmRouter,
    topic: &str,
    rng: &mut StdRng,
    temp_files: &mut Vec<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let temp_dir = PathBuf::from(&settings.paths.temp);
    std::fs::create_dir_all(&temp_dir)?;
    let tag = format!("{:04}", rng.gen_range(0..10_000u32));

    let script = quote::generate_script(router, topic).await?;

    let background = acquire_background(
        settings, client, topic, "landscape", &temp_dir, rng, temp_files, true,
    )
    .await?;

    info!("Generating long-form voiceover...");
    let speech = tts_engine(args, rng).synthesize(&script.full_text, &temp_dir, &tag)?;
    temp_files.push(speech.audio_path.clone());
    let voice_duration = audio::media_duration(&speech.audio_path)?;
    info!("Narration runs {:.2}s", voice_duration.as_secs_f64());
    let video_duration = composer::long_video_duration(voice_duration);

    let overlay = build_overlay(
        settings,
        speech.events,
        &script.full_text,
        voice_duration,
        video_duration,
        1920,
        1080,
        &temp_dir.join(format!("captions_{tag}.ass")),
        temp_files,
    )?;
    // Long-form never shows the whole script as static text.
    let overlay = match overlay {
        Overlay::StaticText(_) => Overlay::None,
        other => other,
    };

    let music = composer::pick_music(Path::new(&settings.paths.music), rng);
    let output = output_path(args, settings, &format!("long_{tag}.mp4"));
    let video = composer::render_long(
        &background,
        &speech.audio_path,
        &overlay,
        music.as_deref(),
        video_duration,
        &output,
    )?;

    if args.dry_run {
        info!("Dry run enabled. Skipping uploads.");
        return Ok(video);
    }

    let title = format!("Finding Peace in {}: A Life Lesson", capitalize(topic));
    let description = format!(
        "\u{201c}{}\u{201d}\n\n{}\n\n#motivation #wisdom #{}",
        script.quote, script.explanation, topic
    );
    let tags = vec![
        "motivation".to_string(),
        "wisdom".to_string(),
        "inspiration".to_string(),
        topic.to_string(),
    ];
    publish(args, settings, client, &video, &title, &description, &tags).await;
    Ok(video)
}

fn tts_engine(args: &Args, rng: &mut StdRng) -> TtsEngine {
    match &args.piper_model {
        Some(model) => TtsEngine::Piper { model: model.clone() },
        None => {
            let voice = tts::pick_voice(rng, Some(tts::VoiceGender::Male));
            info!("Selected voice: {}", voice);
            TtsEngine::Edge { voice: voice.to_string() }
        }
    }
}

/// Stock video first, generated image second, gradient last. Every acquired
/// asset is registered for cleanup.
#[allow(clippy::too_many_arguments)]
async fn acquire_background(
    settings: &Settings,
    client: &reqwest::Client,
    topic: &str,
    orientation: &str,
    temp_dir: &Path,
    rng: &mut StdRng,
    temp_files: &mut Vec<PathBuf>,
    multiple: bool,
) -> anyhow::Result<Background> {
    let query = format!("{topic} nature abstract");
    if multiple {
        match visuals::fetch_video_backgrounds(client, &query, orientation, temp_dir, 5, rng).await {
            Ok(paths) if !paths.is_empty() => {
                temp_files.extend(paths.clone());
                info!("Using {} stock video backgrounds", paths.len());
                return Ok(Background::Videos(paths));
            }
            Ok(_) => {}
            Err(e) => warn!("Stock video search failed: {}", e),
        }
    } else {
        match visuals::fetch_video_background(client, &query, orientation, temp_dir, rng).await {
            Ok(Some(path)) => {
                temp_files.push(path.clone());
                info!("Using video background: {}", path.display());
                return Ok(Background::Video(path));
            }
            Ok(None) => {}
            Err(e) => warn!("Stock video search failed: {}", e),
        }
    }

    info!("Falling back to image generation...");
    let (w, h) = if orientation == "landscape" {
        (settings.image_generation.height.max(1024), settings.image_generation.width.max(768))
    } else {
        (settings.image_generation.width, settings.image_generation.height)
    };
    let prompt = visuals::abstract_prompt(rng);
    if let Some(path) = visuals::generate_image(client, prompt, temp_dir, w, h, rng).await? {
        temp_files.push(path.clone());
        return Ok(Background::Image(path));
    }

    let path = visuals::gradient_fallback(temp_dir, w, h, rng)?;
    temp_files.push(path.clone());
    Ok(Background::Image(path))
}

/// Compile and write the karaoke caption track. Missing timing data is not
/// fatal: the render falls back to a static text overlay.
#[allow(clippy::too_many_arguments)]
fn build_overlay(
    settings: &Settings,
    events: Vec<captions::WordEvent>,
    narration: &str,
    voice_duration: Duration,
    video_duration: Duration,
    width: u32,
    height: u32,
    caption_path: &Path,
    temp_files: &mut Vec<PathBuf>,
) -> anyhow::Result<Overlay> {
    let utterance = if voice_duration.is_zero() {
        None
    } else {
        Some(Utterance { start: Duration::ZERO, duration: voice_duration })
    };
    let normalized = match captions::normalize_events(events, narration, utterance) {
        Ok(events) => events,
        Err(e @ (CaptionError::NoTimingData | CaptionError::EmptyInput)) => {
            warn!("Caption generation skipped: {}", e);
            return Ok(Overlay::StaticText(narration.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let threshold = Duration::from_secs_f64(settings.captions.long_form_threshold_s);
    let opts = CaptionOptions {
        mode: Mode::for_duration(video_duration, threshold),
        target_duration: Some(video_duration),
        play_res_x: width,
        play_res_y: height,
        keywords: settings.captions.keywords.clone(),
    };
    let doc = captions::compile(&normalized, &opts)?;
    ass::write_document(&doc, &opts.keywords, caption_path)?;
    temp_files.push(caption_path.to_path_buf());
    Ok(Overlay::Captions(caption_path.to_path_buf()))
}

async fn publish(
    args: &Args,
    settings: &Settings,
    client: &reqwest::Client,
    video: &Path,
    title: &str,
    description: &str,
    tags: &[String],
) {
    info!("Starting upload process...");
    let token_path = PathBuf::from(&args.token_file);
    let mut token = match auth::load_token(&token_path) {
        Ok(token) => token,
        Err(e) => {
            error!("Cannot upload without credentials: {:#}", e);
            return;
        }
    };
    if let Err(e) = auth::refresh_access_token(client, &mut token, &token_path).await {
        error!("OAuth refresh failed: {:#}", e);
        return;
    }

    match upload::upload_to_youtube(
        client,
        &token,
        video,
        title,
        description,
        tags,
        &settings.upload.privacy_status,
    )
    .await
    {
        Ok(id) => info!("Successfully uploaded! URL: https://youtube.com/shorts/{}", id),
        Err(e) => error!("YouTube upload failed: {:#}", e),
    }

    match upload::upload_to_drive(client, &token, video, &settings.upload.drive_folder).await {
        Ok(link) => info!("Backup uploaded to Drive: {}", link),
        Err(e) => warn!("Google Drive upload failed: {:#}", e),
    }
}

fn output_path(args: &Args, settings: &Settings, default_name: &str) -> PathBuf {
    match &args.out {
        Some(out) => PathBuf::from(out),
        None => PathBuf::from(&settings.paths.output).join(default_name),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
