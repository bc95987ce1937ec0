use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubetext::cli::{Cli, Commands};
use tubetext::config::Config;
use tubetext::pipeline::TranscriptPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubetext=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load().await?;

    match cli.command {
        Commands::Fetch {
            reference,
            output,
            format,
            languages,
            preserve_formatting,
            translate,
        } => {
            let pipeline = TranscriptPipeline::new(config)?;

            tracing::info!("Fetching transcript for: {}", reference);

            let response = match translate.as_deref() {
                Some(target) => {
                    pipeline
                        .fetch_translated(
                            &reference,
                            &languages,
                            target,
                            preserve_formatting,
                            Some(format.as_str()),
                        )
                        .await?
                }
                None => {
                    pipeline
                        .fetch_transcript(
                            &reference,
                            &languages,
                            preserve_formatting,
                            Some(format.as_str()),
                        )
                        .await?
                }
            };

            let content = response.formatted.unwrap_or_default();
            match output {
                Some(path) => {
                    fs_err::write(&path, content)?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => println!("{}", content),
            }

            if !cli.quiet {
                eprintln!(
                    "» {} by {} [{}{}]",
                    response.metadata.title,
                    response.metadata.author,
                    response.transcript.language_code,
                    if response.transcript.is_generated {
                        ", auto-generated"
                    } else {
                        ""
                    }
                );
            }
        }
        Commands::Tracks { reference } => {
            let pipeline = TranscriptPipeline::new(config)?;
            let catalog = pipeline.list_tracks(&reference).await?;

            println!("Caption tracks for video {}:", catalog.video_id);
            if catalog.is_empty() {
                println!("  (none)");
            }
            for track in catalog.manual_sorted() {
                println!("  [manual]    {} ({})", track.display_name, track.language_code);
            }
            for track in catalog.generated_sorted() {
                println!("  [generated] {} ({})", track.display_name, track.language_code);
            }
            let targets = catalog.translation_targets();
            if !targets.is_empty() {
                println!("Translatable into:");
                for target in targets {
                    println!("  {} ({})", target.display_name, target.language_code);
                }
            }
        }
        Commands::Batch {
            mut references,
            input,
            format,
            languages,
            preserve_formatting,
            stop_on_error,
        } => {
            if let Some(path) = input {
                let content = fs_err::read_to_string(&path)?;
                references.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                );
            }
            if references.is_empty() {
                anyhow::bail!("No video references given");
            }

            let pipeline = TranscriptPipeline::new(config.clone())?;
            let stop = stop_on_error || config.app.stop_on_error;

            let progress = if cli.quiet {
                ProgressBar::hidden()
            } else {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {msg}")
                        .unwrap(),
                );
                bar.set_message(format!("Fetching {} transcripts...", references.len()));
                bar
            };

            let outcome = pipeline
                .fetch_batch(
                    &references,
                    &languages,
                    preserve_formatting,
                    Some(format.as_str()),
                    stop,
                )
                .await;
            progress.finish_and_clear();

            for (reference, response) in &outcome.results {
                println!("=== {} ===", reference);
                if let Some(formatted) = &response.formatted {
                    println!("{}", formatted);
                }
            }
            for (reference, error) in &outcome.errors {
                eprintln!("✗ {}: {}", reference, error);
            }

            if !outcome.errors.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written; edit the file to change settings.");
            }
        }
        Commands::Formats => {
            println!("Supported output formats:");
            println!("  • text   - plain text, one snippet per line");
            println!("  • json   - pretty-printed transcript object (default)");
            println!("  • srt    - SubRip subtitles");
            println!("  • vtt    - WebVTT subtitles");
        }
    }

    Ok(())
}
