//! NFM CLI - Mint music tracks as NFTs
//!
//! # Main Commands
//!
//! ```bash
//! nfm serve                                   # Start HTTP server (port 3000)
//! nfm mint --title Midnight --category Jazz \
//!     --image cover.png --audio track.mp3 --address 0x...
//! nfm posts --account 0x...                   # List feed posts
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! nfm categories                              # Show available genres
//! nfm metadata --title T --category Jazz ...  # Print the metadata document
//! ```
//!
//! Configuration is read from the environment (and `.env`), see `MintConfig`.

use clap::{Parser, Subcommand};
use nfm::{
    models::short_address, AssetUri, AuthorIdentity, Category, DraftMint, MediaFile, MintConfig,
    MintMetadata, MintOrchestrator, UploadFailurePolicy,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "nfm")]
#[command(about = "Mint music tracks as NFTs and publish them to the feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Abort a mint when the image or audio upload fails
        #[arg(long)]
        strict_uploads: bool,
    },

    /// Upload media, mint the token and record the feed post
    Mint {
        /// Track title
        #[arg(short, long)]
        title: String,

        /// Genre (see `nfm categories`)
        #[arg(short, long)]
        category: String,

        /// Cover image (JPEG or PNG)
        #[arg(long)]
        image: PathBuf,

        /// Audio file
        #[arg(long)]
        audio: PathBuf,

        /// Wallet address of the author
        #[arg(long)]
        address: Option<String>,

        /// Display name of the author (defaults to the address)
        #[arg(long)]
        username: Option<String>,

        /// Profile picture URI of the author
        #[arg(long)]
        pfp: Option<String>,

        /// Abort when the image or audio upload fails
        #[arg(long)]
        strict_uploads: bool,
    },

    /// List feed posts, newest first
    Posts {
        /// Only posts by this wallet address
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Show available genres
    Categories,

    /// Print the metadata document for the given fields
    Metadata {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        category: String,

        #[arg(long)]
        image_uri: Option<String>,

        #[arg(long)]
        audio_uri: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            port,
            strict_uploads,
        } => cmd_serve(port, strict_uploads).await,

        Commands::Mint {
            title,
            category,
            image,
            audio,
            address,
            username,
            pfp,
            strict_uploads,
        } => {
            let identity = address.map(|eth_address| AuthorIdentity {
                username: username.unwrap_or_else(|| eth_address.clone()),
                eth_address,
                pfp,
            });
            cmd_mint(title, category, &image, &audio, identity, strict_uploads).await
        }

        Commands::Posts { account } => cmd_posts(account.as_deref()).await,

        Commands::Categories => cmd_categories(),

        Commands::Metadata {
            title,
            category,
            image_uri,
            audio_uri,
        } => cmd_metadata(&title, &category, image_uri, audio_uri),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(strict_uploads: bool) -> Result<MintConfig, Box<dyn std::error::Error>> {
    let mut config = MintConfig::from_env()?;
    if strict_uploads {
        config.upload_policy = UploadFailurePolicy::Abort;
    }
    Ok(config)
}

async fn cmd_serve(port: u16, strict_uploads: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(strict_uploads)?;
    let orchestrator = Arc::new(MintOrchestrator::from_config(&config));
    nfm::server::start_server(port, orchestrator).await
}

async fn cmd_mint(
    title: String,
    category: String,
    image: &Path,
    audio: &Path,
    identity: Option<AuthorIdentity>,
    strict_uploads: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(strict_uploads)?;
    let orchestrator = MintOrchestrator::from_config(&config);

    eprintln!("🎵 Minting: {} ({})", title, category);
    let draft = DraftMint {
        title,
        category,
        image: Some(MediaFile::from_path(image).await?),
        audio: Some(MediaFile::from_path(audio).await?),
    };

    let outcome = orchestrator.submit(&draft, identity.as_ref()).await?;

    eprintln!("\n✨ Minted in {}", outcome.tx_hash);
    eprintln!("   Metadata: {}", outcome.metadata_uri);
    match &outcome.post {
        Some(post) => eprintln!("   Feed post: {}", post.object_id),
        None => eprintln!("   ⚠️  No feed post recorded"),
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn cmd_posts(account: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(false)?;
    let orchestrator = MintOrchestrator::from_config(&config);

    let posts = orchestrator.posts().list(account).await?;
    if posts.is_empty() {
        eprintln!("📋 No posts yet.");
        return Ok(());
    }

    eprintln!("📋 Posts ({}):\n", posts.len());
    for recorded in posts {
        let post = &recorded.post;
        let when = post
            .created_at
            .map(|t| t.format("%b %-d").to_string())
            .unwrap_or_default();
        println!(
            "  🎵 {} [{}] by {} ({}) · {}",
            post.title,
            post.category,
            post.author_username,
            short_address(&post.author_address),
            when
        );
        println!("     Audio: {}", post.audio);
        if let Some(image) = &post.image {
            println!("     Image: {}", image);
        }
        println!();
    }
    Ok(())
}

fn cmd_categories() -> Result<(), Box<dyn std::error::Error>> {
    for category in Category::ALL {
        println!("{}", category);
    }
    Ok(())
}

fn cmd_metadata(
    title: &str,
    category: &str,
    image_uri: Option<String>,
    audio_uri: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let category: Category = category.parse()?;
    let image = image_uri.map(AssetUri::new);
    let audio = audio_uri.map(AssetUri::new);

    let metadata = MintMetadata::assemble(title, image.as_ref(), audio.as_ref(), category);
    nfm::validate_metadata(&metadata.to_value()?)?;

    eprintln!("📄 {}", metadata.file_name());
    println!("{}", String::from_utf8(metadata.to_bytes()?)?);
    Ok(())
}
