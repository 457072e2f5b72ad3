use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SampleStrategy;

#[derive(Parser, Debug)]
#[command(name = "visionmine")]
#[command(about = "Mine visionOS documentation and sample code into a JSON knowledge base")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./visionmine.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for cache, knowledge and downloaded projects
    #[arg(long, global = true, env = "VISIONMINE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover documentation, framework and sample links
    Discover(DiscoverArgs),
    /// Scrape individual documentation pages
    Scrape(ScrapeArgs),
    /// Breadth-first crawl of the visionOS documentation tree
    Crawl(CrawlArgs),
    /// Discover, select and download sample projects
    Samples(SamplesArgs),
    /// Run pattern analysis over downloaded Swift sources
    Analyze(AnalyzeArgs),
    /// Search matched terms in the analysis index
    Search(SearchArgs),
    /// Statistics over scraped documentation
    Stats,
    /// Central topics and topic clusters from extracted pages
    Topics(TopicsArgs),
    /// Record documentation code patterns and print suggested updates
    Evolution,
    /// List the knowledge tools available to code generators
    Tools,
    /// Run one knowledge tool with JSON input
    Tool(ToolArgs),
    /// Inspect or clear cached data
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Print the merged configuration
    ShowConfig,
    /// Remove the whole data directory
    Clean(CleanArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Base URLs to start from (defaults to the configured base URLs)
    pub urls: Vec<String>,

    /// Also survey the section/topic/sample structure of each base URL
    #[arg(long)]
    pub structure: bool,
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Pages to scrape (defaults to the configured base URLs)
    pub urls: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Start URL (defaults to the first configured base URL)
    pub start: Option<String>,

    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SamplesArgs {
    /// Only take a small selection of samples
    #[arg(long)]
    pub test_mode: bool,

    /// Number of samples to take in test mode
    #[arg(long)]
    pub count: Option<usize>,

    /// Selection strategy in test mode: first, diverse, random, arkit_first
    #[arg(long)]
    pub strategy: Option<SampleStrategy>,

    /// Re-download projects that already exist locally
    #[arg(long)]
    pub force: bool,

    /// Discover samples without downloading them
    #[arg(long)]
    pub skip_downloads: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory of Swift sources (defaults to the projects directory)
    pub dir: Option<PathBuf>,

    /// Also run the line-based project analysis on this project
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    #[arg(short, long)]
    pub fuzzy: bool,

    /// List files with matches in this category instead
    #[arg(long, conflicts_with = "import")]
    pub category: bool,

    /// List files importing this module instead
    #[arg(long)]
    pub import: bool,
}

#[derive(Args, Debug)]
pub struct TopicsArgs {
    #[arg(short, long, default_value = "10")]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct ToolArgs {
    pub name: String,

    /// Tool input as a JSON object
    #[arg(default_value = "{}")]
    pub input: String,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Delete cache files, the samples cache and the log
    Clear,
    /// Summarize cached samples
    Inspect,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["visionmine", "--data-dir", "/tmp/d", "--no-color", "stats"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/d")));
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_parse_samples() {
        let cli = Cli::try_parse_from([
            "visionmine", "samples", "--test-mode", "--count", "2", "--strategy", "diverse",
        ])
        .unwrap();
        match cli.command {
            Commands::Samples(args) => {
                assert!(args.test_mode);
                assert_eq!(args.count, Some(2));
                assert_eq!(args.strategy, Some(SampleStrategy::Diverse));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_cache_and_tool() {
        let cli = Cli::try_parse_from(["visionmine", "cache", "clear"]).unwrap();
        assert!(matches!(cli.command, Commands::Cache { action: CacheAction::Clear }));

        let cli = Cli::try_parse_from(["visionmine", "tool", "list_relationships"]).unwrap();
        match cli.command {
            Commands::Tool(args) => assert_eq!(args.input, "{}"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
