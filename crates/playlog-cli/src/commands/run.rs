//! Run command: extract every requested app and write session files.

use std::io::Write;

use anyhow::{Context, Result};
use playlog_core::{ExtractConfig, Extraction, PlayApp, djay, serato};

use crate::Config;

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub sessions: usize,
    pub tracks: usize,
    pub failures: usize,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, apps: &[String]) -> Result<RunSummary> {
    let extract_config = config
        .extract_config()
        .context("invalid configuration")?;
    let mut summary = RunSummary::default();

    for name in apps {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let Ok(app) = name.parse::<PlayApp>() else {
            tracing::warn!(app = name, "skipping unknown app");
            continue;
        };
        let Some(extraction) = extract(app, &extract_config)
            .with_context(|| format!("{app} extraction failed"))?
        else {
            tracing::warn!(app = %app, reason = "unsupported", "app skipped");
            continue;
        };

        for failure in &extraction.failures {
            writeln!(
                writer,
                "skipped {}: {}",
                failure.path.display(),
                failure.error
            )?;
        }
        summary.failures += extraction.failures.len();

        for record in &extraction.sessions {
            let written = crate::render::render_session(
                record,
                &config.out_dir,
                &extract_config,
                &config.formats,
            )?;
            tracing::info!(
                app = %app,
                session_id = %record.session.session_id,
                night_date = %record.session.night_date,
                tracks = record.events.len(),
                files = written.len(),
                "session-written"
            );
            writeln!(
                writer,
                "{} {} {} ({} tracks)",
                app,
                record.session.night_date,
                record.session.session_id,
                record.events.len()
            )?;
            summary.sessions += 1;
            summary.tracks += record.events.len();
        }
    }

    writeln!(
        writer,
        "Wrote {} sessions ({} tracks) to {}",
        summary.sessions,
        summary.tracks,
        config.out_dir.display()
    )?;
    Ok(summary)
}

/// `None` for apps without an extractor.
fn extract(app: PlayApp, config: &ExtractConfig) -> Result<Option<Extraction>> {
    let extraction = match app {
        PlayApp::Djay => djay::extract(config)?,
        PlayApp::Serato => serato::extract(config)?,
        PlayApp::Rekordbox => return Ok(None),
    };
    Ok(Some(extraction))
}
