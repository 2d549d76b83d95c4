pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod exif;
pub mod ledger;
pub mod slug;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use catalog::Catalog;
use config::AlbumConfig;
use domain::*;
use error::{Error, Result};
use ledger::{default_rules, CounterPlan, FamilyMap, Ledger, Projection, ReconcileReport};

/// File extensions accepted by `import_dir`.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Callback events for directory imports.
pub enum ImportProgress {
    /// Files discovered, about to publish.
    Start { total: usize },
    /// A new photo was published.
    Published { id: String },
    /// A file was skipped (already in the album).
    Skipped { path: PathBuf },
    /// Import finished.
    Complete { published: usize, skipped: usize },
}

/// The main entry point: photo records plus the counter ledger kept in step
/// with them.
pub struct Album {
    catalog: Catalog,
    ledger: Ledger,
    config: AlbumConfig,
    family: FamilyMap,
}

impl Album {
    /// Open or create an album at the given catalog path.
    pub fn open(catalog_path: &Path) -> Result<Self> {
        Self::from_catalog(Catalog::open(catalog_path)?)
    }

    /// Open an in-memory album (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_catalog(Catalog::open_in_memory()?)
    }

    fn from_catalog(catalog: Catalog) -> Result<Self> {
        let config = AlbumConfig::load(&catalog)?;
        let family = catalog.family()?;
        let mut ledger = Ledger::with_family(family.clone());
        ledger.init(&catalog)?;
        Ok(Self {
            catalog,
            ledger,
            config,
            family,
        })
    }

    // ── Records ──────────────────────────────────────────────────────

    /// Store a new photo and count its tracked values.
    pub fn publish(&mut self, draft: PhotoDraft) -> Result<Photo> {
        let exif = draft.exif;
        let date = match exif.date {
            Some(date) => date,
            None => Local::now().format(exif::DATE_FORMAT).to_string(),
        };
        let (date, year, month, day) = split_date(&date)?;

        let mut tags = normalize_tags(draft.tags);
        if exif.flash && !tags.iter().any(|t| t == "flash") {
            tags.push("flash".to_string());
        }

        let headline = draft
            .headline
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| self.config.no_title.clone());

        let photo = Photo {
            id: draft.id,
            size: draft.size,
            nick: self.family.nick_for(&draft.email),
            email: draft.email,
            text: slug::slice_slug(&headline),
            headline,
            date,
            year: Some(year),
            month: Some(month),
            day: Some(day),
            model: Some(exif.model).filter(|m| !m.is_empty()),
            lens: exif.lens,
            focal_length: exif.focal_length,
            aperture: exif.aperture,
            shutter: exif.shutter,
            iso: exif.iso,
            flash: exif.flash,
            dim: exif.dim,
            loc: exif.loc,
            tags,
        };

        self.catalog.insert_photo(&photo)?;
        self.ledger
            .apply_plan(&mut self.catalog, &CounterPlan::for_create(&photo))?;
        info!(id = %photo.id, "photo published");
        Ok(photo)
    }

    /// Apply field updates to a photo and move its counts accordingly.
    pub fn edit(&mut self, id: &str, update: PhotoUpdate) -> Result<Photo> {
        let old = self.catalog.get_photo(id)?;
        let mut new = old.clone();

        if let Some(headline) = update.headline {
            let headline = headline.trim();
            new.headline = if headline.is_empty() {
                self.config.no_title.clone()
            } else {
                headline.to_string()
            };
            new.text = slug::slice_slug(&new.headline);
        }
        if let Some(email) = update.email {
            if email != old.email {
                new.nick = self.family.nick_for(&email);
                new.email = email;
            }
        }
        if let Some(date) = update.date {
            let (date, year, month, day) = split_date(&date)?;
            new.date = date;
            new.year = Some(year);
            new.month = Some(month);
            new.day = Some(day);
        }
        if let Some(model) = update.model {
            new.model = model.filter(|m| !m.is_empty());
        }
        if let Some(lens) = update.lens {
            new.lens = lens.filter(|l| !l.is_empty());
        }
        if let Some(tags) = update.tags {
            new.tags = normalize_tags(tags);
        }

        self.catalog.update_photo(&new)?;
        self.ledger
            .apply_plan(&mut self.catalog, &CounterPlan::for_edit(&old, &new))?;
        Ok(new)
    }

    /// Delete photos and uncount their values. Every id must exist; nothing is
    /// deleted otherwise. Repeated ids are deleted once.
    pub fn delete(&mut self, ids: &[String]) -> Result<Vec<Photo>> {
        let mut unique: Vec<&String> = Vec::with_capacity(ids.len());
        for id in ids {
            if unique.contains(&id) {
                continue;
            }
            if !self.catalog.contains_photo(id)? {
                return Err(Error::PhotoNotFound(id.clone()));
            }
            unique.push(id);
        }

        let mut removed = Vec::with_capacity(unique.len());
        for id in unique {
            let photo = self.catalog.delete_photo(id)?;
            self.ledger
                .apply_plan(&mut self.catalog, &CounterPlan::for_delete(&photo))?;
            removed.push(photo);
        }
        info!(count = removed.len(), "photos deleted");
        Ok(removed)
    }

    /// Replace the tag set of each photo.
    pub fn apply_tags(&mut self, ids: &[String], tags: &[String]) -> Result<usize> {
        let tags = normalize_tags(tags.to_vec());
        for id in ids {
            let mut photo = self.catalog.get_photo(id)?;
            let plan = CounterPlan::for_tags(&photo.tags, &tags);
            photo.tags = tags.clone();
            self.catalog.update_photo(&photo)?;
            self.ledger.apply_plan(&mut self.catalog, &plan)?;
        }
        Ok(ids.len())
    }

    /// Set headline and search tokens on each photo. An empty headline is a no-op.
    pub fn apply_headline(&mut self, ids: &[String], headline: &str) -> Result<usize> {
        let headline = headline.trim();
        if headline.is_empty() {
            return Ok(0);
        }
        let text = slug::slice_slug(headline);
        for id in ids {
            let mut photo = self.catalog.get_photo(id)?;
            photo.headline = headline.to_string();
            photo.text = text.clone();
            self.catalog.update_photo(&photo)?;
        }
        Ok(ids.len())
    }

    pub fn photo(&self, id: &str) -> Result<Photo> {
        self.catalog.get_photo(id)
    }

    pub fn photos(&self) -> Result<Vec<Photo>> {
        self.catalog.list_all_photos()
    }

    /// One gallery page. The page size grows with the number of tags and text
    /// tokens searched, since any of them may match.
    pub fn find(&self, filter: &Filter, cursor: Option<&str>) -> Result<Page> {
        let limit = self
            .config
            .page_limit
            .saturating_mul(filter.tags.len().max(1))
            .saturating_mul(filter.text.len().max(1));
        self.catalog.find_photos(filter, limit, cursor)
    }

    /// Publish every image under `dir` not yet in the album, reading EXIF in
    /// parallel.
    pub fn import_dir(
        &mut self,
        dir: &Path,
        email: &str,
        mut progress_cb: Option<&mut dyn FnMut(ImportProgress)>,
    ) -> Result<usize> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() && is_image(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        if let Some(ref mut cb) = progress_cb {
            cb(ImportProgress::Start { total: files.len() });
        }

        // EXIF + size in parallel (no DB access here)
        let drafts: Vec<(PathBuf, Option<PhotoDraft>)> = files
            .par_iter()
            .map(|path| {
                let id = match path.file_name() {
                    Some(name) => name.to_string_lossy().to_string(),
                    None => return (path.clone(), None),
                };
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let draft = PhotoDraft {
                    id,
                    size,
                    email: email.to_string(),
                    headline: None,
                    tags: Vec::new(),
                    exif: exif::extract_exif(path),
                };
                (path.clone(), Some(draft))
            })
            .collect();

        let mut published = 0usize;
        let mut skipped = 0usize;
        for (path, draft) in drafts {
            let draft = match draft {
                Some(draft) if !self.catalog.contains_photo(&draft.id)? => draft,
                _ => {
                    skipped += 1;
                    if let Some(ref mut cb) = progress_cb {
                        cb(ImportProgress::Skipped { path });
                    }
                    continue;
                }
            };
            let photo = self.publish(draft)?;
            published += 1;
            if let Some(ref mut cb) = progress_cb {
                cb(ImportProgress::Published { id: photo.id });
            }
        }

        if let Some(ref mut cb) = progress_cb {
            cb(ImportProgress::Complete { published, skipped });
        }
        info!(dir = %dir.display(), published, skipped, "import finished");
        Ok(published)
    }

    // ── Counters ─────────────────────────────────────────────────────

    /// Cached counters, grouped by field.
    pub fn counters(&self) -> &Projection {
        self.ledger.projection()
    }

    /// Distinct values per field.
    pub fn counts(&self) -> BTreeMap<TrackedField, usize> {
        self.ledger.counts()
    }

    /// Re-read every counter from the catalog.
    pub fn refresh_counters(&mut self) -> Result<()> {
        self.ledger.refresh(&self.catalog)
    }

    pub fn recompute_stat(&mut self, field: TrackedField) -> Result<ReconcileReport> {
        self.ledger.recompute_field(&mut self.catalog, field)
    }

    pub fn recompute_all(&mut self) -> Result<Vec<ReconcileReport>> {
        self.ledger
            .reconcile(&mut self.catalog, &TrackedField::ALL)
    }

    /// Recompute the fields an interrupted update reported as stale.
    pub fn reconcile(&mut self, fields: &[TrackedField]) -> Result<Vec<ReconcileReport>> {
        self.ledger.reconcile(&mut self.catalog, fields)
    }

    pub fn bucket(&self) -> Result<Bucket> {
        self.catalog.get_bucket()
    }

    /// Recompute bucket totals from the photo records.
    pub fn recompute_bucket(&self) -> Result<Bucket> {
        let photos = self.catalog.list_all_photos()?;
        let bucket = Bucket {
            size: photos.iter().map(|p| p.size).sum(),
            count: photos.len() as u64,
        };
        self.catalog.set_bucket(bucket)?;
        Ok(bucket)
    }

    // ── Family ───────────────────────────────────────────────────────

    pub fn family(&self) -> &FamilyMap {
        &self.family
    }

    /// Map an e-mail to a nick. Existing photos keep their nick until edited;
    /// nick counters follow on the next `recompute_stat(Nick)`.
    pub fn set_family(&mut self, email: &str, nick: &str) -> Result<()> {
        self.catalog.set_family(email, nick)?;
        self.reload_family()
    }

    pub fn remove_family(&mut self, email: &str) -> Result<bool> {
        let removed = self.catalog.remove_family(email)?;
        if removed {
            self.reload_family()?;
        } else {
            warn!(email, "no family entry to remove");
        }
        Ok(removed)
    }

    fn reload_family(&mut self) -> Result<()> {
        self.family = self.catalog.family()?;
        self.ledger.set_rules(default_rules(self.family.clone()));
        Ok(())
    }

    // ── Config ───────────────────────────────────────────────────────

    pub fn config(&self) -> &AlbumConfig {
        &self.config
    }

    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        AlbumConfig::set(&self.catalog, key, value)?;
        self.config = AlbumConfig::load(&self.catalog)?;
        Ok(())
    }
}

/// Normalize `YYYY-MM-DD[ HH:MM]` to `YYYY-MM-DD HH:MM` and split out its parts.
fn split_date(raw: &str) -> Result<(String, i32, u32, u32)> {
    use chrono::Datelike;

    let raw = raw.trim();
    let parsed = NaiveDateTime::parse_from_str(raw, exif::DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|_| Error::InvalidDate(raw.to_string()))?;
    Ok((
        parsed.format(exif::DATE_FORMAT).to_string(),
        parsed.year(),
        parsed.month(),
        parsed.day(),
    ))
}

/// Trim, drop empties and collapse duplicates, keeping first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
