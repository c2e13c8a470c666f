use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "infinity",
    about = "Our Infinity: journal entries, photos, and albums",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding records and media (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML config file (default: <data-dir>/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, list, reorder, or delete journal entries
    Entry(EntryArgs),
    /// Manage albums and the order of their photos
    Album(AlbumArgs),
    /// Upload photos and manage their album memberships
    Photo(PhotoArgs),
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    #[command(subcommand)]
    pub action: EntryAction,
}

#[derive(Subcommand, Debug)]
pub enum EntryAction {
    /// Append a new entry
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List entries in journal order
    List,
    /// Move the entry at FROM to TO (zero-based)
    Move { from: usize, to: usize },
    /// Delete an entry and its photos
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct AlbumArgs {
    #[command(subcommand)]
    pub action: AlbumAction,
}

#[derive(Subcommand, Debug)]
pub enum AlbumAction {
    /// Create an album
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List albums with photo counts
    List,
    /// Show an album's photos in order
    Show { id: String },
    /// Rename an album
    Rename { id: String, name: String },
    /// Set (or with no PHOTO, clear) the cover photo
    Cover { id: String, photo: Option<String> },
    /// Move the photo at FROM to TO within the album (zero-based)
    Move { id: String, from: usize, to: usize },
    /// Delete an album (its photos are kept)
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct PhotoArgs {
    #[command(subcommand)]
    pub action: PhotoAction,
}

#[derive(Subcommand, Debug)]
pub enum PhotoAction {
    /// Upload image files into the gallery or an entry
    Upload {
        files: Vec<PathBuf>,
        /// Owning entry (default: the gallery)
        #[arg(long)]
        entry: Option<String>,
        /// Album to add the uploaded photos to
        #[arg(long)]
        album: Option<String>,
    },
    /// List every photo, newest first
    List,
    /// Add a photo to one or more albums
    Attach { photo: String, albums: Vec<String> },
    /// Remove a photo from an album
    Detach { photo: String, album: String },
    /// Make a photo's albums exactly the given set
    Select { photo: String, albums: Vec<String> },
    /// Show the albums containing a photo
    Albums { photo: String },
    /// Delete a photo everywhere
    Delete { photo: String },
}
