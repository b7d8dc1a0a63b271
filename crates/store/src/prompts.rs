//! Daily prompt: stored per canonical day, generated on first request.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use tethered_api::db::prompts;
use tethered_core::prompt::clean_prompt;
use tethered_core::time::{format_day, format_ts};
use tethered_core::{DailyPrompt, DayClock, Error, PromptGenerator, Result};

use crate::db::{Db, sq_execute, sq_query_row};

pub struct DailyPrompts<G> {
    db: Db,
    generator: G,
    clock: DayClock,
}

impl<G: PromptGenerator> DailyPrompts<G> {
    pub fn new(db: Db, generator: G) -> Self {
        Self {
            db,
            generator,
            clock: DayClock::utc(),
        }
    }

    pub fn with_clock(mut self, clock: DayClock) -> Self {
        self.clock = clock;
        self
    }

    /// The prompt for the canonical day containing `now`. Never fails:
    /// storage or generator trouble degrades to the fixed fallback, which
    /// is not persisted so a later call can still store a real prompt.
    pub async fn today(&self, now: DateTime<Utc>) -> DailyPrompt {
        let now = now.trunc_subsecs(0);
        let date = self.clock.today(now);

        match self.stored(date) {
            Ok(Some(prompt)) => return prompt,
            Ok(None) => {}
            Err(e) => tracing::warn!("reading daily prompt: {e}"),
        }

        let text = match self.generator.generate().await {
            Ok(raw) => match clean_prompt(&raw) {
                Some(text) => text,
                None => {
                    tracing::warn!(generator = self.generator.name(), "unusable prompt text, using fallback");
                    return DailyPrompt::fallback(date);
                }
            },
            Err(e) => {
                tracing::warn!(generator = self.generator.name(), "prompt generation failed: {e}");
                return DailyPrompt::fallback(date);
            }
        };

        match self.store(date, &text, now) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!("saving daily prompt: {e}");
                DailyPrompt {
                    date,
                    text,
                    generated_by: self.generator.name().to_string(),
                }
            }
        }
    }

    fn stored(&self, date: NaiveDate) -> Result<Option<DailyPrompt>> {
        let conn = self.db.conn();
        sq_query_row(&conn, prompts::get(&format_day(date)), |row| {
            Ok(DailyPrompt {
                date,
                text: row.get(1)?,
                generated_by: row.get(2)?,
            })
        })
        .map_err(Error::store("get daily prompt"))
    }

    /// Insert unless another request stored one first, then return
    /// whichever prompt won.
    fn store(&self, date: NaiveDate, text: &str, now: DateTime<Utc>) -> Result<DailyPrompt> {
        {
            let conn = self.db.conn();
            sq_execute(
                &conn,
                prompts::insert_once(&format_day(date), text, self.generator.name(), &format_ts(now)),
            )
            .map_err(Error::store("insert daily prompt"))?;
        }
        self.stored(date)?.ok_or(Error::NotFound("daily prompt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tethered_core::prompt::{FALLBACK_PROMPT, NoGenerator, PromptError};
    use tethered_core::testing::at;

    struct Scripted {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl PromptGenerator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self) -> std::result::Result<String, PromptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or_else(|| PromptError::Request("503".into()))
        }
    }

    fn db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(&StoreConfig::new(dir.path())).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn generated_prompt_is_stored_once_per_day() {
        let (_dir, db) = db();
        let prompts = DailyPrompts::new(
            db,
            Scripted {
                reply: Some("  \"Show us your lunch\" "),
                calls: AtomicUsize::new(0),
            },
        );
        let first = prompts.today(at("2024-03-01 08:00:00")).await;
        let second = prompts.today(at("2024-03-01 20:00:00")).await;
        assert_eq!(first.text, "Show us your lunch");
        assert_eq!(first.generated_by, "scripted");
        assert_eq!(first, second);
        assert_eq!(prompts.generator.calls.load(Ordering::SeqCst), 1);

        prompts.today(at("2024-03-02 08:00:00")).await;
        assert_eq!(prompts.generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_fall_back_without_persisting() {
        let (_dir, db) = db();
        let failing = DailyPrompts::new(
            db.clone(),
            Scripted {
                reply: None,
                calls: AtomicUsize::new(0),
            },
        );
        let prompt = failing.today(at("2024-03-01 08:00:00")).await;
        assert!(prompt.is_fallback());
        assert_eq!(prompt.text, FALLBACK_PROMPT);

        let unconfigured = DailyPrompts::new(db.clone(), NoGenerator);
        assert!(unconfigured.today(at("2024-03-01 09:00:00")).await.is_fallback());

        let working = DailyPrompts::new(
            db,
            Scripted {
                reply: Some("What made you laugh?"),
                calls: AtomicUsize::new(0),
            },
        );
        let later = working.today(at("2024-03-01 10:00:00")).await;
        assert!(!later.is_fallback());
        assert_eq!(later.text, "What made you laugh?");
    }

    #[tokio::test]
    async fn blank_output_falls_back() {
        let (_dir, db) = db();
        let prompts = DailyPrompts::new(
            db,
            Scripted {
                reply: Some("   "),
                calls: AtomicUsize::new(0),
            },
        );
        assert!(prompts.today(at("2024-03-01 08:00:00")).await.is_fallback());
    }
}
