use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use infinity_sdk::{
    AlbumId, AlbumUpdate, AttachStatus, EntryId, Journal, JournalConfig, PhotoId, PhotoOwner,
    PhotoUpload,
};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let journal = Journal::open(config)
        .await
        .context("failed to open journal")?;
    let format = cli.format;

    let changed = match cli.command {
        Command::Entry(args) => cmd_entry(&journal, args.action, format).await?,
        Command::Album(args) => cmd_album(&journal, args.action, format).await?,
        Command::Photo(args) => cmd_photo(&journal, args.action, format).await?,
    };
    if changed {
        journal.save().await.context("failed to save journal")?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<JournalConfig> {
    let mut config = match &cli.config {
        Some(path) => JournalConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => {
            let dir = cli
                .data_dir
                .clone()
                .unwrap_or_else(|| JournalConfig::default().data_dir);
            let candidate = dir.join("config.toml");
            if candidate.exists() {
                JournalConfig::load(&candidate)
                    .with_context(|| format!("failed to read config {}", candidate.display()))?
            } else {
                JournalConfig::default()
            }
        }
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn parse_id<T>(kind: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("invalid {kind} id {raw:?}"))
}

fn parse_ids<T>(kind: &str, raw: &[String]) -> anyhow::Result<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.iter().map(|r| parse_id(kind, r)).collect()
}

/// Content type for an upload, from its file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

async fn cmd_entry(
    journal: &Journal,
    action: EntryAction,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    match action {
        EntryAction::Add { title, description } => {
            let entry = journal.create_entry(&title, description.as_deref()).await?;
            emit(format, &entry, || {
                println!(
                    "{} Created entry {} at position {}",
                    "✓".green().bold(),
                    entry.title.bold(),
                    entry.position
                );
                println!("  {}", entry.id.to_string().dimmed());
            })?;
            Ok(true)
        }
        EntryAction::List => {
            let entries = journal.entries().await?;
            emit(format, &entries, || {
                if entries.is_empty() {
                    println!("No entries.");
                }
                for e in &entries {
                    println!(
                        "{:>3}  {}  {}",
                        e.position,
                        e.id.to_string().dimmed(),
                        e.title.bold()
                    );
                }
            })?;
            Ok(false)
        }
        EntryAction::Move { from, to } => {
            let entries = journal.move_entry(from, to).await?;
            emit(format, &entries, || {
                println!("{} Moved entry {} → {}", "✓".green().bold(), from, to);
                for e in &entries {
                    println!("{:>3}  {}", e.position, e.title);
                }
            })?;
            Ok(true)
        }
        EntryAction::Delete { id } => {
            let id: EntryId = parse_id("entry", &id)?;
            let deleted = journal.delete_entry(id).await?;
            emit(format, &json!({ "deleted": deleted }), || {
                if deleted {
                    println!("{} Deleted entry {}", "✓".green().bold(), id);
                } else {
                    println!("No entry {}", id);
                }
            })?;
            Ok(deleted)
        }
    }
}

async fn cmd_album(
    journal: &Journal,
    action: AlbumAction,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    match action {
        AlbumAction::Create { name, description } => {
            let album = journal.create_album(&name, description.as_deref()).await?;
            emit(format, &album, || {
                println!("{} Created album {}", "✓".green().bold(), album.name.bold());
                println!("  {}", album.id.to_string().dimmed());
            })?;
            Ok(true)
        }
        AlbumAction::List => {
            let albums = journal.albums().await?;
            emit(format, &albums, || {
                if albums.is_empty() {
                    println!("No albums.");
                }
                for a in &albums {
                    println!(
                        "{}  {}  ({} photos)",
                        a.album.id.to_string().dimmed(),
                        a.album.name.bold(),
                        a.photo_count
                    );
                }
            })?;
            Ok(false)
        }
        AlbumAction::Show { id } => {
            let id: AlbumId = parse_id("album", &id)?;
            let view = journal.album(id).await?;
            emit(format, &view, || {
                println!(
                    "{} ({} photos)",
                    view.summary.album.name.bold(),
                    view.summary.photo_count
                );
                if let Some(description) = &view.summary.album.description {
                    println!("  {}", description);
                }
                if let Some(cover) = &view.summary.cover_photo_url {
                    println!("  Cover: {}", cover.blue());
                }
                for (index, v) in view.photos.iter().enumerate() {
                    println!(
                        "{:>3}. {}  {}  {}",
                        index,
                        v.photo.name.bold(),
                        v.entry_title.cyan(),
                        v.photo.id.to_string().dimmed()
                    );
                }
            })?;
            Ok(false)
        }
        AlbumAction::Rename { id, name } => {
            let id: AlbumId = parse_id("album", &id)?;
            let album = journal
                .update_album(id, AlbumUpdate::default().rename(name))
                .await?;
            emit(format, &album, || {
                println!("{} Renamed album to {}", "✓".green().bold(), album.name.bold());
            })?;
            Ok(true)
        }
        AlbumAction::Cover { id, photo } => {
            let id: AlbumId = parse_id("album", &id)?;
            let photo: Option<PhotoId> = photo
                .map(|p| parse_id("photo", &p))
                .transpose()?;
            let album = journal
                .update_album(id, AlbumUpdate::default().cover(photo))
                .await?;
            emit(format, &album, || match photo {
                Some(p) => println!(
                    "{} Cover of {} set to {}",
                    "✓".green().bold(),
                    album.name.bold(),
                    p
                ),
                None => println!(
                    "{} Cover of {} cleared",
                    "✓".green().bold(),
                    album.name.bold()
                ),
            })?;
            Ok(true)
        }
        AlbumAction::Move { id, from, to } => {
            let id: AlbumId = parse_id("album", &id)?;
            let order = journal.move_in_album(id, from, to).await?;
            emit(format, &order, || {
                println!("{} Moved photo {} → {}", "✓".green().bold(), from, to);
            })?;
            Ok(true)
        }
        AlbumAction::Delete { id } => {
            let id: AlbumId = parse_id("album", &id)?;
            let deleted = journal.delete_album(id).await?;
            emit(format, &json!({ "deleted": deleted }), || {
                if deleted {
                    println!("{} Deleted album {}", "✓".green().bold(), id);
                } else {
                    println!("No album {}", id);
                }
            })?;
            Ok(deleted)
        }
    }
}

async fn cmd_photo(
    journal: &Journal,
    action: PhotoAction,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    match action {
        PhotoAction::Upload { files, entry, album } => {
            let owner = match entry {
                Some(raw) => PhotoOwner::Entry(parse_id("entry", &raw)?),
                None => PhotoOwner::Gallery,
            };
            let album: Option<AlbumId> = album.map(|a| parse_id("album", &a)).transpose()?;

            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                uploads.push(PhotoUpload::new(
                    name,
                    content_type_for(path),
                    Bytes::from(bytes),
                ));
            }

            let batch = journal.upload_all(uploads, owner, album).await;
            let photos: Vec<_> = batch.uploaded.iter().map(|r| &r.photo).collect();
            emit(format, &photos, || {
                for receipt in &batch.uploaded {
                    println!(
                        "{} {}  {}",
                        "✓".green().bold(),
                        receipt.photo.name.bold(),
                        receipt.photo.id.to_string().dimmed()
                    );
                    if let AttachStatus::Failed { album_id, reason } = &receipt.attached {
                        println!(
                            "  {} not added to album {}: {}",
                            "!".yellow().bold(),
                            album_id,
                            reason
                        );
                    }
                }
                for name in &batch.skipped {
                    println!("{} {} (not an image)", "-".dimmed(), name);
                }
                for (name, error) in &batch.failed {
                    println!("{} {}: {}", "✗".red().bold(), name, error);
                }
            })?;
            Ok(!batch.uploaded.is_empty())
        }
        PhotoAction::List => {
            let photos = journal.photos().await?;
            emit(format, &photos, || {
                if photos.is_empty() {
                    println!("No photos.");
                }
                for v in &photos {
                    println!(
                        "{}  {}  {}",
                        v.photo.id.to_string().dimmed(),
                        v.photo.name.bold(),
                        v.entry_title.cyan()
                    );
                }
            })?;
            Ok(false)
        }
        PhotoAction::Attach { photo, albums } => {
            let photo: PhotoId = parse_id("photo", &photo)?;
            let albums: Vec<AlbumId> = parse_ids("album", &albums)?;
            let outcome = journal.add_to_albums(photo, &albums).await?;
            let added: Vec<AlbumId> = outcome.added.iter().map(|m| m.album_id).collect();
            let summary = json!({ "added": added, "already_present": outcome.already_present });
            emit(format, &summary, || {
                println!(
                    "{} Added to {} album(s), {} already present",
                    "✓".green().bold(),
                    added.len(),
                    outcome.already_present.len()
                );
            })?;
            Ok(!added.is_empty())
        }
        PhotoAction::Detach { photo, album } => {
            let photo: PhotoId = parse_id("photo", &photo)?;
            let album: AlbumId = parse_id("album", &album)?;
            let removed = journal.remove_from_album(photo, album).await?;
            emit(format, &json!({ "removed": removed }), || {
                if removed {
                    println!("{} Removed from album", "✓".green().bold());
                } else {
                    println!("Photo was not in that album.");
                }
            })?;
            Ok(removed)
        }
        PhotoAction::Select { photo, albums } => {
            let photo: PhotoId = parse_id("photo", &photo)?;
            let albums: Vec<AlbumId> = parse_ids("album", &albums)?;
            let change = journal.set_albums(photo, &albums).await?;
            let summary = json!({ "added": change.added, "removed": change.removed });
            emit(format, &summary, || {
                println!(
                    "{} {} added, {} removed",
                    "✓".green().bold(),
                    change.added.len(),
                    change.removed.len()
                );
            })?;
            Ok(!change.added.is_empty() || !change.removed.is_empty())
        }
        PhotoAction::Albums { photo } => {
            let photo: PhotoId = parse_id("photo", &photo)?;
            let mut albums: Vec<AlbumId> =
                journal.albums_of(photo).await?.into_iter().collect();
            albums.sort();
            emit(format, &albums, || {
                if albums.is_empty() {
                    println!("Not in any album.");
                }
                for a in &albums {
                    println!("{}", a);
                }
            })?;
            Ok(false)
        }
        PhotoAction::Delete { photo } => {
            let photo: PhotoId = parse_id("photo", &photo)?;
            let deleted = journal.delete_photo(photo).await?;
            emit(format, &json!({ "deleted": deleted }), || {
                if deleted {
                    println!("{} Deleted photo {}", "✓".green().bold(), photo);
                } else {
                    println!("No photo {}", photo);
                }
            })?;
            Ok(deleted)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(dir: &Path, args: &[&str]) -> Cli {
        let mut argv = vec!["infinity", "--data-dir", dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn content_types_from_extension() {
        assert_eq!(content_type_for(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("x.png")), "image/png");
        assert_eq!(content_type_for(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn parses_nested_subcommands() {
        let parsed = Cli::try_parse_from([
            "infinity", "album", "move", "abc", "2", "0", "--format", "json",
        ])
        .unwrap();
        assert_eq!(parsed.format, OutputFormat::Json);
        match parsed.command {
            Command::Album(AlbumArgs {
                action: AlbumAction::Move { id, from, to },
            }) => {
                assert_eq!(id, "abc");
                assert_eq!((from, to), (2, 0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bad_ids_are_reported() {
        let err = parse_id::<AlbumId>("album", "nope").unwrap_err();
        assert!(err.to_string().contains("invalid album id"));
    }

    #[tokio::test]
    async fn commands_persist_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("beach.jpg");
        std::fs::write(&image, b"\xff\xd8\xff\xe0").unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"hello").unwrap();

        run_command(cli(dir.path(), &["entry", "add", "Day one"])).await.unwrap();
        run_command(cli(dir.path(), &["album", "create", "Summer"])).await.unwrap();

        let config = JournalConfig::for_data_dir(dir.path());
        let album = {
            let journal = Journal::open(config.clone()).await.unwrap();
            journal.albums().await.unwrap()[0].album.id
        };

        run_command(cli(
            dir.path(),
            &[
                "photo",
                "upload",
                image.to_str().unwrap(),
                notes.to_str().unwrap(),
                "--album",
                &album.to_string(),
            ],
        ))
        .await
        .unwrap();

        let journal = Journal::open(config).await.unwrap();
        assert_eq!(journal.entries().await.unwrap().len(), 1);
        let view = journal.album(album).await.unwrap();
        assert_eq!(view.photos.len(), 1);
        assert_eq!(view.photos[0].photo.name, "beach.jpg");
        assert_eq!(view.photos[0].entry_title, "Gallery");
    }
}
