//! Analyse one article from disk and print the result as JSON.
//!
//! Configuration is the same as the service: `BIAS_CONFIG_PATH` plus env
//! overrides.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use news_bias_analyzer::config::{AppConfig, FusionOverrides};
use news_bias_analyzer::{init_tracing, ArticleInput, SharedResources};

static RESOURCES: SharedResources = SharedResources::new();

#[derive(Parser)]
#[command(name = "bias_cli")]
#[command(about = "Estimate the political lean of one news article")]
#[command(version)]
struct Cli {
    /// Article text file, or `-` to read stdin
    path: PathBuf,

    /// Publisher name as scraped
    #[arg(long)]
    source: Option<String>,

    /// Article URL; the publisher is derived from it when --source is absent
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    title: Option<String>,
}

fn read_article(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let text = read_article(&cli.path)?;

    let cfg = AppConfig::load()?;
    let analyzer = RESOURCES.get_or_load(&cfg).await?.analyzer();

    let article = ArticleInput {
        text,
        source: cli.source,
        url: cli.url,
        title: cli.title,
    };
    let result = analyzer
        .analyze(&article, &FusionOverrides::default())
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn flags_are_optional_and_path_is_required() {
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from(["bias_cli", "-", "--source", "Reuters"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("-"));
        assert_eq!(cli.source.as_deref(), Some("Reuters"));
        assert!(cli.url.is_none() && cli.title.is_none());

        assert!(Cli::try_parse_from(["bias_cli"]).is_err());
        assert!(Cli::try_parse_from(["bias_cli", "a.txt", "--bogus"]).is_err());
    }
}
