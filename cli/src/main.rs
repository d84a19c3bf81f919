use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use telefs::{Config, CreateRequest, DirNode, DirectoryOps, FileOps, FileSystem, FsError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const FILE_MODE: u32 = 0o100_644;

#[derive(Parser)]
#[command(name = "telefs-cli")]
#[command(about = "Inspect and drive a telefs filesystem", long_about = None)]
pub struct Cli {
    /// JSON config; defaults apply when the file does not exist.
    #[arg(short, long, default_value = "telefs.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the root directory
    List,

    /// Create an empty file
    Touch { name: String },

    /// Upload a local file, replacing any previous contents
    Put {
        #[arg(short, long)]
        file: PathBuf,

        /// Name inside the filesystem; defaults to the local file name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Print file contents to stdout
    Cat {
        name: String,

        #[arg(long, default_value_t = 0)]
        offset: u64,

        #[arg(long)]
        size: Option<usize>,
    },

    /// Show file attributes
    Stat { name: String },

    /// Remove a file, or a whole tag group with `#<tag>`
    Rm { name: String },
}

async fn load_config(path: &Path) -> Result<Config> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        Ok(Config::load(path).await?)
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

/// New files belong to whoever owns the working directory.
async fn current_owner() -> Result<(u32, u32)> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let metadata = tokio::fs::metadata(&cwd)
        .await
        .with_context(|| format!("failed to stat {}", cwd.display()))?;
    Ok((metadata.uid(), metadata.gid()))
}

async fn lookup_or_create(root: &DirNode, name: &str) -> Result<telefs::FileNode> {
    match root.lookup(name).await {
        Ok(node) => Ok(node),
        Err(e) if e.is_not_found() => {
            let (uid, gid) = current_owner().await?;
            Ok(root.create(CreateRequest::new(name, FILE_MODE, uid, gid)).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config).await?;
    let fs = FileSystem::from_config(&config)
        .await
        .context("failed to assemble filesystem")?;
    let root = fs.root();

    match cli.command {
        Commands::List => {
            for record in root.read_dir_all().await? {
                println!("{}\t{}\t{}", record.name, record.size, record.tag.caption());
            }
        }
        Commands::Touch { name } => {
            let (uid, gid) = current_owner().await?;
            let node = root.create(CreateRequest::new(&name, FILE_MODE, uid, gid)).await?;
            println!("created {} (inode {})", name, node.record().inode);
        }
        Commands::Put { file, name } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = match name {
                Some(name) => name,
                None => match file.file_name().and_then(|n| n.to_str()) {
                    Some(n) => n.to_string(),
                    None => bail!("invalid file name: {}", file.display()),
                },
            };
            let node = lookup_or_create(&root, &name).await?;
            let written = node.write(&data).await?;
            println!("wrote {} bytes to {}", written, name);
        }
        Commands::Cat { name, offset, size } => {
            let node = root.lookup(&name).await?;
            let attr = node.attr().await?;
            let size = size.unwrap_or(attr.size as usize);
            let data = node.read(offset, size).await?;
            std::io::stdout().write_all(&data)?;
        }
        Commands::Stat { name } => {
            let attr = root.lookup(&name).await?.attr().await?;
            println!("{}", format_attr(&attr));
        }
        Commands::Rm { name } => {
            root.remove(&name).await?;
            println!("removed {}", name);
        }
    }
    Ok(())
}

fn format_attr(attr: &telefs::Attr) -> String {
    format!(
        "inode={} size={} mode={:o} uid={} gid={} nlink={} mtime={}",
        attr.inode, attr.size, attr.mode, attr.uid, attr.gid, attr.nlink, attr.mtime
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        let code = e.downcast_ref::<FsError>().map(FsError::errno).unwrap_or(1);
        std::process::exit(code);
    }
}
