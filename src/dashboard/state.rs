use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use super::router::RouterStreams;
use super::types::{Keyword, Question, SummaryUpdate, TranscriptLine};

/// Backing collections for the dashboard panels
#[derive(Debug, Default)]
struct Panels {
    transcript: Vec<TranscriptLine>,
    translated: Vec<TranscriptLine>,
    summary: String,
    topics: Vec<String>,
    questions: Vec<Question>,
    keywords: Vec<Keyword>,
}

/// Accumulated meeting results, shared across tasks.
///
/// Clones share the same collections behind a single lock, so appends
/// stay ordered and a reset clears every panel in one step. Collections
/// only grow between resets.
#[derive(Clone, Default)]
pub struct MeetingState {
    panels: Arc<Mutex<Panels>>,
}

/// Aggregate numbers for the stats panel and the export header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingStats {
    pub word_count: usize,
    pub speaker_count: usize,
    pub avg_words_per_speaker: f64,
    pub transcript_lines: usize,
    pub translated_lines: usize,
    pub question_count: usize,
    pub keyword_count: usize,
    pub topic_count: usize,
}

/// Session header block of an export document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSession {
    /// Elapsed time at export, as displayed (`MM:SS`)
    pub duration: String,

    /// When the export was produced
    pub timestamp: DateTime<Utc>,

    pub stats: MeetingStats,
}

/// Complete meeting record written by `export`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingExport {
    pub session: ExportSession,
    pub original: Vec<TranscriptLine>,
    pub translated: Vec<TranscriptLine>,
    pub questions: Vec<Question>,
    pub summary: String,
    pub topics: Vec<String>,
    pub keywords: Vec<Keyword>,
}

impl MeetingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the router's output streams into the panels, echoing each
    /// result to the console as it lands.
    ///
    /// Runs until the router hangs up; each stream is drained to its end
    /// before the collector exits, so nothing routed is ever lost.
    pub async fn collect(self, mut streams: RouterStreams) {
        info!("Result collector started");

        let mut transcript_open = true;
        let mut translated_open = true;
        let mut summary_open = true;
        let mut questions_open = true;
        let mut keywords_open = true;

        loop {
            tokio::select! {
                line = streams.transcript.recv(), if transcript_open => match line {
                    Some(line) => {
                        println!(
                            "[{}] {}: {}",
                            line.time,
                            line.speaker.as_deref().unwrap_or("-"),
                            line.text
                        );
                        self.panels.lock().await.transcript.push(line);
                    }
                    None => transcript_open = false,
                },

                line = streams.translated.recv(), if translated_open => match line {
                    Some(line) => {
                        println!("[{}] translated: {}", line.time, line.text);
                        self.panels.lock().await.translated.push(line);
                    }
                    None => translated_open = false,
                },

                update = streams.summary.recv(), if summary_open => match update {
                    Some(SummaryUpdate { summary, topic }) => {
                        println!("Summary: {}", summary);
                        let mut panels = self.panels.lock().await;
                        panels.summary = summary;
                        if let Some(topic) = topic {
                            println!("Topic: {}", topic);
                            panels.topics.push(topic);
                        }
                    }
                    None => summary_open = false,
                },

                batch = streams.questions.recv(), if questions_open => match batch {
                    Some(batch) => {
                        for question in &batch {
                            println!("Question: {}", question.text);
                        }
                        self.panels.lock().await.questions.extend(batch);
                    }
                    None => questions_open = false,
                },

                batch = streams.keywords.recv(), if keywords_open => match batch {
                    Some(batch) => {
                        for keyword in &batch {
                            println!("Keyword {}: {}", keyword.term, keyword.explanation);
                        }
                        self.panels.lock().await.keywords.extend(batch);
                    }
                    None => keywords_open = false,
                },

                else => break,
            }
        }

        info!("Result collector stopped");
    }

    /// Clear every panel. Appends from in-flight routing land in the
    /// fresh state; nothing survives the swap.
    pub async fn reset(&self) {
        let mut panels = self.panels.lock().await;
        *panels = Panels::default();
        info!("Dashboard state cleared");
    }

    pub async fn transcript(&self) -> Vec<TranscriptLine> {
        self.panels.lock().await.transcript.clone()
    }

    pub async fn translated(&self) -> Vec<TranscriptLine> {
        self.panels.lock().await.translated.clone()
    }

    pub async fn summary(&self) -> String {
        self.panels.lock().await.summary.clone()
    }

    pub async fn topics(&self) -> Vec<String> {
        self.panels.lock().await.topics.clone()
    }

    pub async fn questions(&self) -> Vec<Question> {
        self.panels.lock().await.questions.clone()
    }

    pub async fn keywords(&self) -> Vec<Keyword> {
        self.panels.lock().await.keywords.clone()
    }

    /// Current aggregate numbers for the stats panel.
    pub async fn stats(&self) -> MeetingStats {
        let panels = self.panels.lock().await;
        Self::compute_stats(&panels)
    }

    /// Snapshot the whole meeting as one export document.
    pub async fn export(&self, duration: impl Into<String>) -> MeetingExport {
        let panels = self.panels.lock().await;

        MeetingExport {
            session: ExportSession {
                duration: duration.into(),
                timestamp: Utc::now(),
                stats: Self::compute_stats(&panels),
            },
            original: panels.transcript.clone(),
            translated: panels.translated.clone(),
            questions: panels.questions.clone(),
            summary: panels.summary.clone(),
            topics: panels.topics.clone(),
            keywords: panels.keywords.clone(),
        }
    }

    /// Write the export document to disk, pretty-printed.
    pub async fn export_to(&self, path: &Path, duration: impl Into<String>) -> Result<()> {
        let export = self.export(duration).await;

        let json = serde_json::to_string_pretty(&export)
            .context("Failed to serialize meeting export")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;

        info!("Meeting export written to {}", path.display());

        Ok(())
    }

    fn compute_stats(panels: &Panels) -> MeetingStats {
        let word_count: usize = panels
            .transcript
            .iter()
            .map(|line| line.text.split_whitespace().count())
            .sum();

        let speakers: HashSet<Option<&str>> = panels
            .transcript
            .iter()
            .map(|line| line.speaker.as_deref())
            .collect();
        let speaker_count = speakers.len();

        let avg_words_per_speaker = if panels.transcript.is_empty() {
            0.0
        } else {
            word_count as f64 / speaker_count as f64
        };

        MeetingStats {
            word_count,
            speaker_count,
            avg_words_per_speaker,
            transcript_lines: panels.transcript.len(),
            translated_lines: panels.translated.len(),
            question_count: panels.questions.len(),
            keyword_count: panels.keywords.len(),
            topic_count: panels.topics.len(),
        }
    }
}
