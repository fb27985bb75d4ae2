use anyhow::Result;
use chrono::Local;
use chronofilter::{
    load_posts, AnnotatedPost, AppConfig, Collaborators, ContentAnalyzer, FeedSession, LlmConfig,
    Sentiment, User,
};
use clap::{Parser, Subcommand};
use interfaces::identity::SessionIdentity;
use interfaces::state::SqliteStateStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Score a social feed and filter it by your preferences.
#[derive(Parser)]
#[command(name = "chronofilter")]
#[command(about = "Sentiment, credibility and bot scoring for social feeds")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Identity key whose preferences are loaded and saved; anonymous if omitted
    #[arg(long, global = true)]
    user: Option<String>,

    /// Overrides CHRONOFILTER_DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Overrides CHRONOFILTER_LLM_ENDPOINT
    #[arg(long, global = true)]
    llm_endpoint: Option<String>,

    /// Overrides CHRONOFILTER_LLM_MODEL
    #[arg(long, global = true)]
    llm_model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a feed file and print the posts that pass your filters
    Feed {
        /// JSON array of posts
        #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_posts.json"))]
        posts: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Hide every post from a source
    Block { username: String },

    /// Stop hiding a source
    Unblock { username: String },

    /// Rank a source above the rest
    Prefer { username: String },

    /// Stop ranking a source first
    Unprefer { username: String },

    /// Change filter settings
    Set {
        /// positive, neutral or negative
        #[arg(long)]
        sentiment: Option<Sentiment>,

        /// Minimum credibility score, clamped to 0..=1
        #[arg(long)]
        threshold: Option<f64>,

        /// Hide posts with a bot probability of 0.7 or more
        #[arg(long)]
        hide_bots: Option<bool>,
    },

    /// Show the current filter settings
    Prefs,

    /// Show recent block/prefer actions
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("chronofilter=debug,interfaces=debug,info")
    } else {
        EnvFilter::new("chronofilter=info,interfaces=info,warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = build_config(&cli)?;
    let collaborators = connect(&cli, &config).await?;

    match cli.command {
        Commands::Feed { posts, json } => {
            let analyzer = ContentAnalyzer::from_config(&config)?;
            let posts = load_posts(&posts).await?;
            let annotated = analyzer.annotate(posts).await;
            let session = FeedSession::open(annotated, collaborators).await;

            if json {
                println!("{}", serde_json::to_string_pretty(session.visible())?);
            } else {
                print_feed(session.visible());
                println!("\n{} of {} posts shown", session.visible_count(), session.total_count());
            }
        }
        Commands::Block { username } => {
            warn_if_anonymous(&cli.user);
            let mut session = FeedSession::open(Vec::new(), collaborators).await;
            session.block(&username).await;
            info!("Blocked @{}", username);
        }
        Commands::Unblock { username } => {
            warn_if_anonymous(&cli.user);
            let mut session = FeedSession::open(Vec::new(), collaborators).await;
            session.unblock(&username).await;
            info!("Unblocked @{}", username);
        }
        Commands::Prefer { username } => {
            warn_if_anonymous(&cli.user);
            let mut session = FeedSession::open(Vec::new(), collaborators).await;
            session.prefer(&username).await;
            info!("Preferring @{}", username);
        }
        Commands::Unprefer { username } => {
            warn_if_anonymous(&cli.user);
            let mut session = FeedSession::open(Vec::new(), collaborators).await;
            session.unprefer(&username).await;
            info!("No longer preferring @{}", username);
        }
        Commands::Set {
            sentiment,
            threshold,
            hide_bots,
        } => {
            warn_if_anonymous(&cli.user);
            let mut session = FeedSession::open(Vec::new(), collaborators).await;
            let mut filters = session.filters().clone();
            if let Some(sentiment) = sentiment {
                filters.set_sentiment_preference(sentiment);
            }
            if let Some(threshold) = threshold {
                filters.set_credibility_threshold(threshold);
            }
            if let Some(hide_bots) = hide_bots {
                filters.set_hide_bots(hide_bots);
            }
            session.update_filters(filters).await;
            print_prefs(&session);
        }
        Commands::Prefs => {
            let session = FeedSession::open(Vec::new(), collaborators).await;
            print_prefs(&session);
        }
        Commands::History { limit } => {
            let session = FeedSession::open(Vec::new(), collaborators).await;
            for interaction in session.recent_interactions(limit).await {
                println!(
                    "{}  {:<16} @{}",
                    interaction.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    interaction.action,
                    interaction.target
                );
            }
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    if let Some(endpoint) = &cli.llm_endpoint {
        let mut llm = config.llm.take().unwrap_or_else(|| LlmConfig::new(endpoint.clone()));
        llm.endpoint = endpoint.clone();
        config.llm = Some(llm);
    }
    if let (Some(model), Some(llm)) = (&cli.llm_model, config.llm.as_mut()) {
        llm.model = model.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn connect(cli: &Cli, config: &AppConfig) -> Result<Collaborators> {
    let Some(user_key) = &cli.user else {
        return Ok(Collaborators::anonymous());
    };

    let store = SqliteStateStore::connect(&config.database_url).await?;
    let identity = SessionIdentity::signed_in(User {
        user_key: user_key.clone(),
        username: user_key.clone(),
        display_name: user_key.clone(),
    });
    Ok(Collaborators::with_store(Arc::new(store), Arc::new(identity)))
}

fn warn_if_anonymous(user: &Option<String>) {
    if user.is_none() {
        warn!("No --user given; this change is not saved");
    }
}

fn print_feed(posts: &[AnnotatedPost]) {
    for entry in posts {
        let verified = if entry.post.author.verified { " ✓" } else { "" };
        println!(
            "\n@{}{} ({})  [{}, credibility {:.0}%, bot {:.0}%]",
            entry.post.author.username,
            verified,
            entry.post.timestamp,
            entry.analysis.sentiment,
            entry.analysis.credibility_score * 100.0,
            entry.analysis.bot_probability * 100.0,
        );
        println!("  {}", entry.post.content);
        println!(
            "  ♥ {}  ⟲ {}  ↩ {}",
            entry.post.like_count, entry.post.retweet_count, entry.post.reply_count
        );
    }
}

fn print_prefs(session: &FeedSession) {
    let filters = session.filters();
    let join = |set: &std::collections::BTreeSet<String>| {
        set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    };
    println!("sentiment preference:  {}", filters.sentiment_preference());
    println!("credibility threshold: {:.2}", filters.credibility_threshold());
    println!("hide bots:             {}", filters.hide_bots());
    println!("blocked:               {}", join(filters.blocked_sources()));
    println!("preferred:             {}", join(filters.preferred_sources()));
}
