mod types;

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

pub use self::types::*;

fn default_cache_ttl() -> Duration {
    Config::default().cache_ttl
}

fn default_max_initial_refresh_sleep() -> Duration {
    Config::default().max_initial_refresh_sleep
}

fn default_user_agent() -> String {
    Config::default().user_agent
}

fn default_platforms() -> Vec<PlatformConfig> {
    Config::default().platforms
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub bind_addr: String,

    /// Minimum interval between aggregation cycles; the cache freshness gate.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: Duration,

    /// Upper bound on the background refresher's startup jitter.
    #[serde(default = "default_max_initial_refresh_sleep")]
    pub max_initial_refresh_sleep: Duration,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_platforms")]
    pub platforms: Vec<PlatformConfig>,
}

impl Config {
    pub fn update(&mut self, args: crate::cli::Args) {
        fn set_if_some<T>(dst: &mut T, v: Option<T>) {
            if let Some(v) = v {
                *dst = v;
            }
        }

        set_if_some(&mut self.bind_addr, args.bind_addr);
    }
}

impl Default for Config {
    fn default() -> Self {
        // The built-in platform table mirrors the deployment this service
        // was written for; a config file replaces it wholesale.
        let platform = |id: &str, name: &str, emoji: &str, url: &str, note: &str| PlatformConfig {
            id: id.into(),
            name: name.into(),
            emoji: emoji.into(),
            url: Url::parse(url).unwrap(),
            feed_url: None,
            note: Some(note.into()),
            scraping: false,
            last_chapter: None,
            last_update: None,
        };

        let platforms = vec![
            PlatformConfig {
                last_chapter: Some("Chapter 18".into()),
                last_update: Some("2025-08-06T14:30:00".into()),
                ..platform(
                    "wattpad",
                    "Wattpad",
                    "📚",
                    "https://www.wattpad.com/story/390996157-unyielding",
                    "Daily parts Mon-Sat",
                )
            },
            PlatformConfig {
                last_chapter: Some("Episode 18".into()),
                last_update: Some("2025-08-06T15:45:00".into()),
                ..platform(
                    "tapas",
                    "Tapas",
                    "🎨",
                    "https://tapas.io/series/unyielding_",
                    "Daily parts Mon-Sat",
                )
            },
            PlatformConfig {
                scraping: true,
                ..platform(
                    "royalroad",
                    "Royal Road",
                    "👑",
                    "https://www.royalroad.com/fiction/110754/unyielding",
                    "Full chapters every Monday",
                )
            },
            PlatformConfig {
                scraping: true,
                feed_url: Some(
                    Url::parse("https://archiveofourown.org/works/64068811/chapters.atom")
                        .unwrap(),
                ),
                ..platform(
                    "ao3",
                    "Archive of Our Own",
                    "📖",
                    "https://archiveofourown.org/works/64068811",
                    "Full chapters every Monday",
                )
            },
            PlatformConfig {
                last_chapter: Some("Chapter 18".into()),
                last_update: Some("2025-08-05T16:20:00".into()),
                ..platform(
                    "inkspired",
                    "Inkspired",
                    "🌟",
                    "https://getinkspired.com/de/story/558599/unyielding",
                    "Full chapters every Monday",
                )
            },
            PlatformConfig {
                last_chapter: Some("Chapter 17".into()),
                last_update: Some("2025-07-29T18:00:00".into()),
                ..platform(
                    "scribblehub",
                    "ScribbleHub",
                    "✍️",
                    "https://www.scribblehub.com/series/1514528/unyielding/",
                    "Full chapters every Monday",
                )
            },
            PlatformConfig {
                scraping: true,
                ..platform(
                    "kofi",
                    "Ko-fi Posts",
                    "☕",
                    "https://ko-fi.com/amke",
                    "Updates & Blog Posts",
                )
            },
        ];

        Config {
            bind_addr: "127.0.0.1:3001".into(),
            cache_ttl: Duration::from_secs(3600),
            max_initial_refresh_sleep: Duration::from_secs(45),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .into(),
            platforms,
        }
    }
}

fn default_platform_scraping() -> bool {
    true
}

/// One tracked platform. `scraping = false` switches the platform to manual
/// tracking via `last-chapter`/`last-update`, which the manual-update
/// endpoint overwrites at runtime.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PlatformConfig {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub emoji: String,

    pub url: Url,
    pub feed_url: Option<Url>,
    pub note: Option<String>,

    #[serde(default = "default_platform_scraping")]
    pub scraping: bool,

    pub last_chapter: Option<String>,

    /// Manual update instant, e.g. `2025-08-06T14:30:00`.
    pub last_update: Option<String>,
}

pub fn load(search_paths: &[PathBuf]) -> Result<Config> {
    for path in search_paths {
        debug!("Trying to load {}", path.display());
        let mut contents = String::new();

        {
            let mut f = match File::open(path) {
                Ok(f) => f,

                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(file = %path.display(), "File not found, skipping");
                    continue;
                }

                Err(e) => {
                    return Err(e)
                        .context(anyhow!("could not load a config file `{}`", path.display()));
                }
            };

            f.read_to_string(&mut contents).with_context(|| {
                anyhow!(
                    "could not read the contents of a config file `{}`",
                    path.display()
                )
            })?;
        }

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| anyhow!("could not load the config file `{}`", path.display()))?;

        info!("Loaded a config file `{}`", path.display());

        return Ok(cfg);
    }

    info!("Using the default config");

    Ok(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_platform_table_is_well_formed() {
        let cfg = Config::default();

        assert!(!cfg.platforms.is_empty());
        assert!(cfg.platforms.iter().any(|p| p.id == "royalroad" && p.scraping));
        assert!(cfg
            .platforms
            .iter()
            .find(|p| p.id == "ao3")
            .is_some_and(|p| p.feed_url.is_some()));

        // Manual platforms must carry the fields the aggregator synthesizes from.
        for platform in cfg.platforms.iter().filter(|p| !p.scraping) {
            assert!(platform.last_chapter.is_some(), "{}", platform.id);
            assert!(platform.last_update.is_some(), "{}", platform.id);
        }
    }

    #[test]
    fn config_parses_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
            bind-addr = "0.0.0.0:8080"
            cache-ttl = "30m"

            [[platforms]]
            id = "royalroad"
            name = "Royal Road"
            url = "https://www.royalroad.com/fiction/1/example"
            note = "weekly"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.cache_ttl, Duration::from_secs(1800));
        assert_eq!(cfg.platforms.len(), 1);
        assert!(cfg.platforms[0].scraping);
    }
}
