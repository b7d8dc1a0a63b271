use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub base_url: String,
    /// Shared secret for the cron endpoint. Empty rejects every call.
    pub cron_secret: String,
    /// Run the sweeper in-process every this many seconds; 0 disables.
    pub sweep_interval_secs: u64,
    pub streak_utc_offset_minutes: i32,
    pub pairing_counts_as_interaction: bool,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// Empty means prompts always take the fallback path.
    pub api_key: String,
    pub model: String,
    pub api_url: String,
}

pub const DEFAULT_PROMPT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PROMPT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset, empty or unparsable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let port = parse_or_warn("PORT", get("PORT")).unwrap_or(3000);
        let base_url = get("BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));
        let pairing_counts_as_interaction = !matches!(
            get("STREAK_PAIRING_COUNTS").as_deref(),
            Some("0" | "false" | "no" | "off")
        );

        Self {
            data_dir: get("TETHERED_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            cron_secret: get("CRON_SECRET").unwrap_or_default(),
            sweep_interval_secs: parse_or_warn("SWEEP_INTERVAL_SECS", get("SWEEP_INTERVAL_SECS"))
                .unwrap_or(0),
            streak_utc_offset_minutes: parse_or_warn(
                "STREAK_UTC_OFFSET_MINUTES",
                get("STREAK_UTC_OFFSET_MINUTES"),
            )
            .unwrap_or(0),
            pairing_counts_as_interaction,
            prompt: PromptConfig {
                api_key: get("PROMPT_API_KEY").unwrap_or_default(),
                model: get("PROMPT_MODEL").unwrap_or_else(|| DEFAULT_PROMPT_MODEL.to_string()),
                api_url: get("PROMPT_API_URL")
                    .unwrap_or_else(|| DEFAULT_PROMPT_API_URL.to_string()),
            },
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring invalid {key}={raw:?}");
            None
        }
    }
}
