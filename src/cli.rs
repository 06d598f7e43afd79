use clap::{Args, Parser};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub crawl: CrawlArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CrawlArgs {
    /// Seed list: one URL per line, `#` starts a comment line.
    pub seeds: String,

    /// Maximum link depth to traverse (negative = unlimited, 0 = seeds only).
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub depth: i64,

    /// Maximum concurrent fetches (non-positive = unlimited).
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub limit: i64,

    /// Output directory for page artifacts and summary files.
    #[arg(long, default_value = "./output")]
    pub out: String,

    /// Skip list in the seed list format; these URLs are never fetched.
    #[arg(long)]
    pub exclude: Option<String>,

    /// Failed fetches tolerated per URL before it is abandoned (non-positive = unlimited).
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    pub max_attempts: i64,

    /// Per-request timeout of the HTTP renderer.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::Cli;

    #[test]
    fn defaults_are_unlimited() {
        let cli = Cli::try_parse_from(["sitecrawl", "seeds.txt"]).unwrap();
        assert_eq!(cli.crawl.seeds, "seeds.txt");
        assert_eq!(cli.crawl.depth, -1);
        assert_eq!(cli.crawl.limit, -1);
        assert_eq!(cli.crawl.out, "./output");
        assert_eq!(cli.crawl.max_attempts, 3);
        assert!(cli.crawl.exclude.is_none());
    }

    #[test]
    fn accepts_negative_depth_and_limit() {
        let cli = Cli::try_parse_from([
            "sitecrawl",
            "seeds.txt",
            "--depth",
            "-5",
            "--limit",
            "-1",
        ])
        .unwrap();
        assert_eq!(cli.crawl.depth, -5);
        assert_eq!(cli.crawl.limit, -1);
    }

    #[test]
    fn seed_list_is_required() {
        assert!(Cli::try_parse_from(["sitecrawl"]).is_err());
    }
}
