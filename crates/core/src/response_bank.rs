//! Response Bank
//!
//! Pre-authored lines for every speaker, keyed by lesson phase. Lookups never
//! fail: a phase with no lines for the requested speaker falls back to the
//! bank's default phase, and a speaker missing even there gets the generic
//! fallback line.

use crate::phase::LessonPhase;
use crate::roster::{ARIA, EMMA, FACILITATOR_ID, LUCAS, MAX, SAM, ZOE};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors raised while loading a bank from disk.
#[derive(Debug, thiserror::Error)]
pub enum ResponseBankError {
    #[error("Failed to read response bank {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid response bank JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Response bank has no lines for the default phase '{0}'")]
    EmptyDefault(LessonPhase),
}

fn default_phase() -> LessonPhase {
    LessonPhase::Discussion
}

fn default_fallback() -> Vec<String> {
    vec!["That's a really interesting perspective!".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseBank {
    /// Phase consulted when the requested phase has no lines for a speaker.
    #[serde(default = "default_phase")]
    default_phase: LessonPhase,
    /// Lines used when a speaker has nothing in either phase.
    #[serde(default = "default_fallback")]
    fallback: Vec<String>,
    /// speaker id -> phase -> candidate lines
    lines: BTreeMap<String, BTreeMap<LessonPhase, Vec<String>>>,
}

impl ResponseBank {
    pub fn new(default_phase: LessonPhase) -> Self {
        Self {
            default_phase,
            fallback: default_fallback(),
            lines: BTreeMap::new(),
        }
    }

    /// Adds lines for a speaker in a phase, appending to any already present.
    pub fn insert<I, S>(&mut self, speaker_id: &str, phase: LessonPhase, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .entry(speaker_id.to_string())
            .or_default()
            .entry(phase)
            .or_default()
            .extend(lines.into_iter().map(Into::into));
    }

    pub fn default_phase(&self) -> LessonPhase {
        self.default_phase
    }

    /// Candidate lines for a speaker in a phase. Never empty.
    pub fn get(&self, phase: LessonPhase, speaker_id: &str) -> &[String] {
        let by_phase = self.lines.get(speaker_id);
        let lookup = |p: LessonPhase| {
            by_phase
                .and_then(|phases| phases.get(&p))
                .filter(|lines| !lines.is_empty())
        };

        match lookup(phase) {
            Some(lines) => lines.as_slice(),
            None => {
                tracing::debug!(%phase, speaker_id, fallback = %self.default_phase, "No lines for phase, using default phase");
                lookup(self.default_phase)
                    .map(Vec::as_slice)
                    .unwrap_or(&self.fallback)
            }
        }
    }

    /// Picks one candidate uniformly at random. Repeats are allowed.
    pub fn pick<R: Rng>(&self, phase: LessonPhase, speaker_id: &str, rng: &mut R) -> &str {
        let candidates = self.get(phase, speaker_id);
        &candidates[rng.random_range(0..candidates.len())]
    }

    /// Loads a bank from a JSON file with the same shape `serde` produces for
    /// this type.
    pub fn from_json_file(path: &Path) -> Result<Self, ResponseBankError> {
        let content = std::fs::read_to_string(path).map_err(|source| ResponseBankError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ResponseBankError> {
        let mut bank: ResponseBank = serde_json::from_str(json)?;
        if bank.fallback.is_empty() {
            bank.fallback = default_fallback();
        }
        let facilitator_default = bank
            .lines
            .get(FACILITATOR_ID)
            .and_then(|phases| phases.get(&bank.default_phase))
            .is_some_and(|lines| !lines.is_empty());
        if !facilitator_default {
            return Err(ResponseBankError::EmptyDefault(bank.default_phase));
        }
        Ok(bank)
    }

    /// The lines of the desert island lesson.
    pub fn desert_island() -> Self {
        let mut bank = Self::new(default_phase());

        bank.insert(FACILITATOR_ID, LessonPhase::Intro, [
            "Welcome, young entrepreneurs! I'm so excited to see what creative solutions you'll come up with today! 🌟",
            "Great to have everyone here! Are you ready to put your problem-solving skills to the test? 💪",
            "I can already see some brilliant minds at work! Let's dive into our adventure! 🚀",
        ]);
        bank.insert(FACILITATOR_ID, LessonPhase::Scenario, [
            "What an interesting perspective! That shows real entrepreneurial thinking! 💡",
            "I love how you're considering all the possibilities! That's exactly what successful people do! 🎯",
            "Fantastic idea! Can you tell us more about how that would work? 🤔",
        ]);
        bank.insert(FACILITATOR_ID, LessonPhase::Discussion, [
            "That's brilliant problem-solving! How would you convince others to try your idea? 🗣️",
            "Great strategic thinking! What resources would you need to make that happen? 📋",
            "I love that creativity! How could we build on that idea even more? ✨",
        ]);
        bank.insert(FACILITATOR_ID, LessonPhase::Planning, [
            "Excellent teamwork! That's exactly how successful businesses are built! 🤝",
            "Smart planning! What would be your backup plan if that didn't work? 🔄",
            "That shows real leadership thinking! How would you organize your team? 👥",
        ]);
        bank.insert(FACILITATOR_ID, LessonPhase::Summary, [
            "You've all shown incredible entrepreneurial skills today! 🌟",
            "I'm amazed by your creativity and problem-solving abilities! 🎉",
            "These are exactly the skills that successful entrepreneurs use every day! 💪",
        ]);

        let intro = [
            (EMMA, "Yes! This sounds super exciting! I love adventures! 🎉"),
            (LUCAS, "I'm ready! I've been thinking about this all week!"),
            (ZOE, "Bring it on! I'm not scared of any desert island! 💪"),
            (MAX, "Haha, this is going to be fun! I hope there are coconuts! 🥥"),
            (ARIA, "I'm curious about what we'll discover! Ready to learn!"),
            (SAM, "Count me in! I want to help everyone succeed! 🤝"),
        ];
        for (id, line) in intro {
            bank.insert(id, LessonPhase::Intro, [line]);
        }

        let discussion = [
            (EMMA, "I would first make sure everyone is okay and not hurt! Then maybe find shelter because we need a safe place to stay."),
            (LUCAS, "I think we should explore the island systematically. Make a map of where we are and what resources we can find."),
            (ZOE, "I'd climb the highest tree or hill to see the whole island! We need to know what we're working with!"),
            (MAX, "I'd look for food and water first! Can't think on an empty stomach, right? Plus, maybe we can find some cool fruit!"),
            (ARIA, "I would gather information - check what supplies we have, what skills each person brings, and what the island offers."),
            (SAM, "I'd make sure we all stay together and help anyone who's scared or needs support. Teamwork is everything!"),
        ];
        for (id, line) in discussion {
            bank.insert(id, LessonPhase::Discussion, [line]);
        }

        bank
    }
}

impl Default for ResponseBank {
    fn default() -> Self {
        Self::desert_island()
    }
}
