use std::path::Path;

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use famalbum_core::domain::{Filter, Photo, PhotoDraft, PhotoUpdate};
use famalbum_core::exif::extract_exif;
use famalbum_core::slug::slugify;
use famalbum_core::{Album, ImportProgress};
use indicatif::{ProgressBar, ProgressStyle};

use super::stats::format_size;

pub fn add(
    album: &mut Album,
    path: &Path,
    email: String,
    headline: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let Some(id) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
        bail!("not a file: {}", path.display());
    };
    let size = std::fs::metadata(path)?.len();
    let photo = album.publish(PhotoDraft {
        id,
        size,
        email,
        headline,
        tags,
        exif: extract_exif(path),
    })?;
    println!("Published {} ({}, {})", photo.id, photo.date, format_size(photo.size));
    Ok(())
}

fn active_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::with_template(
        "  {bar:30.cyan/blue} {spinner:.green} {pos:>5}/{len:<5} {prefix:.dim} {msg}",
    )?
    .progress_chars("━╸─"))
}

pub fn import(album: &mut Album, dir: &Path, email: &str) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(active_style()?);
    pb.set_prefix("Publishing");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let mut summary = (0usize, 0usize);
    album.import_dir(
        dir,
        email,
        Some(&mut |progress| match progress {
            ImportProgress::Start { total } => pb.set_length(total as u64),
            ImportProgress::Published { id } => {
                pb.set_message(id);
                pb.inc(1);
            }
            ImportProgress::Skipped { .. } => pb.inc(1),
            ImportProgress::Complete { published, skipped } => summary = (published, skipped),
        }),
    )?;
    pb.finish_and_clear();

    println!(
        "Imported {} photos from {} ({} already in the album)",
        summary.0,
        dir.display(),
        summary.1
    );
    Ok(())
}

/// Filter from command line options. Free text is slugged the same way
/// headlines are, so `--text "Šabac leto"` matches `sabac` and `leto`. Words
/// shorter than three letters are never indexed and are dropped.
#[allow(clippy::too_many_arguments)]
pub fn build_filter(
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    model: Option<String>,
    lens: Option<String>,
    nick: Option<String>,
    tags: Vec<String>,
    text: Option<&str>,
) -> Filter {
    let text: Vec<String> = text
        .map(|t| {
            slugify(t)
                .split('-')
                .filter(|w| w.len() >= 3)
                .map(|w| w.chars().take(8).collect())
                .collect()
        })
        .unwrap_or_default();
    Filter {
        year,
        month,
        day,
        model,
        lens,
        nick,
        tags: tags.into_iter().filter(|t| !t.is_empty()).collect(),
        text,
    }
}

/// `--lens ""` clears the field.
pub fn clearable(value: String) -> Option<String> {
    Some(value).filter(|v| !v.is_empty())
}

pub fn ls(album: &Album, filter: &Filter, cursor: Option<&str>) -> Result<()> {
    let page = album.find(filter, cursor)?;
    if page.photos.is_empty() {
        println!("No photos.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id"),
        Cell::new("Date"),
        Cell::new("Headline"),
        Cell::new("Nick"),
        Cell::new("Camera"),
        Cell::new("Tags"),
        Cell::new("Size"),
    ]);
    for photo in &page.photos {
        table.add_row(photo_row(photo));
    }
    println!("{table}");

    if let Some(next) = page.next {
        println!("  next page: --cursor {next}");
    }
    Ok(())
}

fn photo_row(photo: &Photo) -> Vec<Cell> {
    let camera = match (&photo.model, &photo.lens) {
        (Some(model), Some(lens)) => format!("{model} / {lens}"),
        (Some(model), None) => model.clone(),
        (None, Some(lens)) => lens.clone(),
        (None, None) => String::new(),
    };
    vec![
        Cell::new(&photo.id),
        Cell::new(&photo.date),
        Cell::new(&photo.headline),
        Cell::new(&photo.nick),
        Cell::new(camera),
        Cell::new(photo.tags.join(", ")),
        Cell::new(format_size(photo.size)),
    ]
}

pub fn edit(album: &mut Album, id: &str, update: PhotoUpdate) -> Result<()> {
    let photo = album.edit(id, update)?;
    println!("Updated {}", photo.id);
    Ok(())
}

pub fn rm(album: &mut Album, ids: &[String]) -> Result<()> {
    let removed = album.delete(ids)?;
    let bytes: u64 = removed.iter().map(|p| p.size).sum();
    println!("Deleted {} photos ({})", removed.len(), format_size(bytes));
    Ok(())
}

pub fn tag(album: &mut Album, ids: &[String], tags: &[String]) -> Result<()> {
    let n = album.apply_tags(ids, tags)?;
    println!("Tagged {n} photos");
    Ok(())
}

pub fn headline(album: &mut Album, ids: &[String], headline: &str) -> Result<()> {
    match album.apply_headline(ids, headline)? {
        0 => println!("Empty headline, nothing changed"),
        n => println!("Set headline on {n} photos"),
    }
    Ok(())
}
