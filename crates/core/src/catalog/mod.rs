pub mod schema;

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use tracing::warn;

use crate::domain::*;
use crate::error::{Error, Result};
use crate::ledger::{CounterKey, CounterOp, CounterWrite, FamilyMap, LedgerStore};

/// How long a connection waits on a locked database before reporting busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra attempts for a counter transaction that still found the database busy.
const BUSY_RETRIES: usize = 3;

const BUCKET_ID: &str = "total";

const PHOTO_COLUMNS: &str = "id, size, email, nick, headline, date, year, month, day, model, lens,
     focal_length, aperture, shutter, iso, flash, width, height, loc, tags, text";

/// SQLite-backed store for photo records, counters, family map and config.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create a catalog at the given path with WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // ── Photos ───────────────────────────────────────────────────────

    /// Insert a new photo and add it to the bucket totals.
    pub fn insert_photo(&mut self, photo: &Photo) -> Result<()> {
        let tx = self.conn.transaction()?;
        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM photos WHERE id = ?1",
                params![photo.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(Error::PhotoAlreadyExists(photo.id.clone()));
        }

        tx.execute(
            "INSERT INTO photos (id, size, email, nick, headline, date, year, month, day, model, lens,
             focal_length, aperture, shutter, iso, flash, width, height, loc, tags, text)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)",
            params![
                photo.id,
                photo.size as i64,
                photo.email,
                photo.nick,
                photo.headline,
                photo.date,
                photo.year,
                photo.month,
                photo.day,
                photo.model,
                photo.lens,
                photo.focal_length,
                photo.aperture,
                photo.shutter,
                photo.iso,
                photo.flash,
                photo.dim.map(|d| d.0),
                photo.dim.map(|d| d.1),
                photo.loc,
                serde_json::to_string(&photo.tags)?,
                serde_json::to_string(&photo.text)?,
            ],
        )?;
        adjust_bucket(&tx, photo.size as i64, 1)?;
        tx.commit()?;
        Ok(())
    }

    /// Overwrite every stored attribute of an existing photo.
    pub fn update_photo(&self, photo: &Photo) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE photos SET size=?2, email=?3, nick=?4, headline=?5, date=?6, year=?7, month=?8,
             day=?9, model=?10, lens=?11, focal_length=?12, aperture=?13, shutter=?14, iso=?15,
             flash=?16, width=?17, height=?18, loc=?19, tags=?20, text=?21
             WHERE id=?1",
            params![
                photo.id,
                photo.size as i64,
                photo.email,
                photo.nick,
                photo.headline,
                photo.date,
                photo.year,
                photo.month,
                photo.day,
                photo.model,
                photo.lens,
                photo.focal_length,
                photo.aperture,
                photo.shutter,
                photo.iso,
                photo.flash,
                photo.dim.map(|d| d.0),
                photo.dim.map(|d| d.1),
                photo.loc,
                serde_json::to_string(&photo.tags)?,
                serde_json::to_string(&photo.text)?,
            ],
        )?;
        if changed == 0 {
            return Err(Error::PhotoNotFound(photo.id.clone()));
        }
        Ok(())
    }

    /// Delete a photo and take it out of the bucket totals. Returns the removed record.
    pub fn delete_photo(&mut self, id: &str) -> Result<Photo> {
        let tx = self.conn.transaction()?;
        let photo = tx
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"),
                params![id],
                photo_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::PhotoNotFound(id.to_string()))?;
        tx.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        adjust_bucket(&tx, -(photo.size as i64), -1)?;
        tx.commit()?;
        Ok(photo)
    }

    pub fn get_photo(&self, id: &str) -> Result<Photo> {
        self.conn
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"),
                params![id],
                photo_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::PhotoNotFound(id.to_string()))
    }

    pub fn contains_photo(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM photos WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_all_photos(&self) -> Result<Vec<Photo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PHOTO_COLUMNS} FROM photos ORDER BY date DESC, id DESC"))?;
        let photos = stmt
            .query_map([], photo_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(photos)
    }

    /// One gallery page, newest first, starting after the photo `cursor`.
    /// `tags` and `text` filters match photos containing any of the values.
    pub fn find_photos(&self, filter: &Filter, limit: usize, cursor: Option<&str>) -> Result<Page> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        let mut push_eq = |column: &str, value: Box<dyn ToSql>, args: &mut Vec<Box<dyn ToSql>>| {
            args.push(value);
            clauses.push(format!("{column} = ?{}", args.len()));
        };
        if let Some(year) = filter.year {
            push_eq("year", Box::new(year), &mut args);
        }
        if let Some(month) = filter.month {
            push_eq("month", Box::new(month), &mut args);
        }
        if let Some(day) = filter.day {
            push_eq("day", Box::new(day), &mut args);
        }
        if let Some(model) = &filter.model {
            push_eq("model", Box::new(model.clone()), &mut args);
        }
        if let Some(lens) = &filter.lens {
            push_eq("lens", Box::new(lens.clone()), &mut args);
        }
        if let Some(nick) = &filter.nick {
            push_eq("nick", Box::new(nick.clone()), &mut args);
        }

        for (column, values) in [("tags", &filter.tags), ("text", &filter.text)] {
            if values.is_empty() {
                continue;
            }
            let mut placeholders = Vec::with_capacity(values.len());
            for value in values {
                args.push(Box::new(value.clone()));
                placeholders.push(format!("?{}", args.len()));
            }
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM json_each(photos.{column}) WHERE json_each.value IN ({}))",
                placeholders.join(", ")
            ));
        }

        if let Some(cursor) = cursor {
            let after = self.get_photo(cursor)?;
            args.push(Box::new(after.date));
            let date_idx = args.len();
            args.push(Box::new(after.id));
            let id_idx = args.len();
            clauses.push(format!(
                "(date < ?{date_idx} OR (date = ?{date_idx} AND id < ?{id_idx}))"
            ));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        // One extra row tells whether another page follows.
        let fetch = i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX);
        args.push(Box::new(fetch));
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos {where_sql} ORDER BY date DESC, id DESC LIMIT ?{}",
            args.len()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let mut photos = stmt
            .query_map(params.as_slice(), photo_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let next = if photos.len() > limit {
            photos.truncate(limit);
            photos.last().map(|p| p.id.clone())
        } else {
            None
        };
        Ok(Page { photos, next })
    }

    // ── Bucket ───────────────────────────────────────────────────────

    pub fn get_bucket(&self) -> Result<Bucket> {
        let bucket = self
            .conn
            .query_row(
                "SELECT size, count FROM bucket WHERE id = ?1",
                params![BUCKET_ID],
                |row| {
                    Ok(Bucket {
                        size: row.get::<_, i64>(0)?.max(0) as u64,
                        count: row.get::<_, i64>(1)?.max(0) as u64,
                    })
                },
            )
            .optional()?;
        Ok(bucket.unwrap_or_default())
    }

    pub fn set_bucket(&self, bucket: Bucket) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bucket (id, size, count) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET size = excluded.size, count = excluded.count",
            params![BUCKET_ID, bucket.size as i64, bucket.count as i64],
        )?;
        Ok(())
    }

    // ── Family ───────────────────────────────────────────────────────

    pub fn family(&self) -> Result<FamilyMap> {
        let mut stmt = self.conn.prepare("SELECT email, nick FROM family")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(FamilyMap::from_pairs(pairs))
    }

    pub fn set_family(&self, email: &str, nick: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO family (email, nick) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET nick = excluded.nick",
            params![email, nick],
        )?;
        Ok(())
    }

    pub fn remove_family(&self, email: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM family WHERE email = ?1", params![email])?;
        Ok(removed > 0)
    }

    // ── Config ───────────────────────────────────────────────────

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // ── Counters ─────────────────────────────────────────────────

    fn try_transact_counter(
        &mut self,
        key: &CounterKey,
        decide: &dyn Fn(Option<u64>) -> CounterWrite,
    ) -> Result<CounterWrite> {
        let id = key.id();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<i64> = tx
            .query_row(
                "SELECT count FROM counters WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let write = decide(current.map(|c| c.max(0) as u64));
        match write {
            CounterWrite::Create(count) => {
                tx.execute(
                    "INSERT INTO counters (id, field, value, count) VALUES (?1, ?2, ?3, ?4)",
                    params![id, key.field.as_str(), key.value, count as i64],
                )?;
            }
            CounterWrite::Update(count) => {
                tx.execute(
                    "UPDATE counters SET count = ?2 WHERE id = ?1",
                    params![id, count as i64],
                )?;
            }
            CounterWrite::Delete => {
                tx.execute("DELETE FROM counters WHERE id = ?1", params![id])?;
            }
            CounterWrite::Noop => {}
        }
        tx.commit()?;
        Ok(write)
    }
}

impl LedgerStore for Catalog {
    fn transact_counter(
        &mut self,
        key: &CounterKey,
        decide: &dyn Fn(Option<u64>) -> CounterWrite,
    ) -> Result<CounterWrite> {
        let mut attempt = 0;
        loop {
            match self.try_transact_counter(key, decide) {
                Err(err) if is_busy(&err) && attempt < BUSY_RETRIES => {
                    attempt += 1;
                    warn!(%key, attempt, "counter transaction busy, retrying");
                }
                result => return result,
            }
        }
    }

    fn write_counters(&mut self, ops: &[CounterOp]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for op in ops {
            match op {
                CounterOp::Put(entry) if entry.count > 0 => {
                    tx.execute(
                        "INSERT INTO counters (id, field, value, count) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(id) DO UPDATE SET count = excluded.count",
                        params![
                            CounterKey::new(entry.field, entry.value.clone()).id(),
                            entry.field.as_str(),
                            entry.value,
                            entry.count as i64
                        ],
                    )?;
                }
                CounterOp::Put(entry) => {
                    tx.execute(
                        "DELETE FROM counters WHERE id = ?1",
                        params![CounterKey::new(entry.field, entry.value.clone()).id()],
                    )?;
                }
                CounterOp::Delete(key) => {
                    tx.execute("DELETE FROM counters WHERE id = ?1", params![key.id()])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn scan_records(&self) -> Result<Vec<Photo>> {
        self.list_all_photos()
    }

    fn load_counters(&self) -> Result<Vec<CounterEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT field, value, count FROM counters ORDER BY field, value")?;
        let rows = stmt
            .query_map([], counter_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().flatten().collect())
    }

    fn counters_for_field(&self, field: TrackedField) -> Result<Vec<CounterEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT field, value, count FROM counters WHERE field = ?1 ORDER BY value",
        )?;
        let rows = stmt
            .query_map(params![field.as_str()], counter_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().flatten().collect())
    }

    fn get_counter(&self, key: &CounterKey) -> Result<Option<CounterEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT field, value, count FROM counters WHERE id = ?1",
                params![key.id()],
                counter_from_row,
            )
            .optional()?;
        Ok(row.flatten())
    }

    fn put_counter(&mut self, entry: &CounterEntry) -> Result<()> {
        self.write_counters(&[CounterOp::Put(entry.clone())])
    }

    fn delete_counter(&mut self, key: &CounterKey) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM counters WHERE id = ?1", params![key.id()])?;
        Ok(removed > 0)
    }
}

fn is_busy(err: &Error) -> bool {
    matches!(
        err,
        Error::Database(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

fn adjust_bucket(conn: &Connection, size: i64, count: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO bucket (id, size, count) VALUES (?1, MAX(?2, 0), MAX(?3, 0))
         ON CONFLICT(id) DO UPDATE SET size = MAX(size + ?2, 0), count = MAX(count + ?3, 0)",
        params![BUCKET_ID, size, count],
    )?;
    Ok(())
}

/// Rows whose field is no longer a tracked field are skipped.
fn counter_from_row(row: &Row<'_>) -> rusqlite::Result<Option<CounterEntry>> {
    let field: String = row.get(0)?;
    let Ok(field) = field.parse::<TrackedField>() else {
        return Ok(None);
    };
    Ok(Some(CounterEntry {
        field,
        value: row.get(1)?,
        count: row.get::<_, i64>(2)?.max(0) as u64,
    }))
}

fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    let width: Option<u32> = row.get(16)?;
    let height: Option<u32> = row.get(17)?;
    Ok(Photo {
        id: row.get(0)?,
        size: row.get::<_, i64>(1)?.max(0) as u64,
        email: row.get(2)?,
        nick: row.get(3)?,
        headline: row.get(4)?,
        date: row.get(5)?,
        year: row.get(6)?,
        month: row.get(7)?,
        day: row.get(8)?,
        model: row.get(9)?,
        lens: row.get(10)?,
        focal_length: row.get(11)?,
        aperture: row.get(12)?,
        shutter: row.get(13)?,
        iso: row.get(14)?,
        flash: row.get(15)?,
        dim: width.zip(height),
        loc: row.get(18)?,
        tags: json_list(row, 19)?,
        text: json_list(row, 20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_photo(id: &str, date: &str, tags: &[&str]) -> Photo {
        Photo {
            id: id.to_string(),
            size: 1024,
            email: "a@x.com".to_string(),
            nick: "ana".to_string(),
            headline: "Summer".to_string(),
            date: date.to_string(),
            year: date.get(0..4).and_then(|y| y.parse().ok()),
            month: date.get(5..7).and_then(|m| m.parse().ok()),
            day: date.get(8..10).and_then(|d| d.parse().ok()),
            model: Some("X100".to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            text: vec!["sum".into(), "summ".into()],
            ..Default::default()
        }
    }

    // ── Photo tests ──────────────────────────────────────────────

    #[test]
    fn test_catalog_open_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sub/catalog.db");
        let _catalog = Catalog::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_insert_and_get_photo() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let mut photo = make_photo("a.jpg", "2024-05-01 10:00", &["x", "y"]);
        photo.dim = Some((4000, 3000));
        photo.aperture = Some(2.8);
        catalog.insert_photo(&photo).unwrap();

        let loaded = catalog.get_photo("a.jpg").unwrap();
        assert_eq!(loaded, photo);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let photo = make_photo("a.jpg", "2024-05-01 10:00", &[]);
        catalog.insert_photo(&photo).unwrap();
        let err = catalog.insert_photo(&photo).unwrap_err();
        assert!(matches!(err, Error::PhotoAlreadyExists(_)));
        assert_eq!(catalog.get_bucket().unwrap().count, 1);
    }

    #[test]
    fn test_update_missing_photo() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = catalog
            .update_photo(&make_photo("nope.jpg", "2024-01-01 00:00", &[]))
            .unwrap_err();
        assert!(matches!(err, Error::PhotoNotFound(_)));
    }

    #[test]
    fn test_delete_photo_adjusts_bucket() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.insert_photo(&make_photo("a.jpg", "2024-05-01 10:00", &[])).unwrap();
        catalog.insert_photo(&make_photo("b.jpg", "2024-05-02 10:00", &[])).unwrap();
        assert_eq!(catalog.get_bucket().unwrap(), Bucket { size: 2048, count: 2 });

        let removed = catalog.delete_photo("a.jpg").unwrap();
        assert_eq!(removed.id, "a.jpg");
        assert_eq!(catalog.get_bucket().unwrap(), Bucket { size: 1024, count: 1 });
        assert!(matches!(catalog.delete_photo("a.jpg"), Err(Error::PhotoNotFound(_))));
    }

    #[test]
    fn test_find_photos_newest_first_with_cursor() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        for (i, day) in ["01", "02", "03", "04", "05"].iter().enumerate() {
            catalog
                .insert_photo(&make_photo(&format!("{i}.jpg"), &format!("2024-05-{day} 10:00"), &[]))
                .unwrap();
        }

        let first = catalog.find_photos(&Filter::default(), 2, None).unwrap();
        let ids: Vec<&str> = first.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["4.jpg", "3.jpg"]);
        assert_eq!(first.next.as_deref(), Some("3.jpg"));

        let second = catalog
            .find_photos(&Filter::default(), 2, first.next.as_deref())
            .unwrap();
        let ids: Vec<&str> = second.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2.jpg", "1.jpg"]);

        let last = catalog
            .find_photos(&Filter::default(), 2, second.next.as_deref())
            .unwrap();
        assert_eq!(last.photos.len(), 1);
        assert!(last.next.is_none());
    }

    #[test]
    fn test_find_photos_filters() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.insert_photo(&make_photo("a.jpg", "2023-01-01 10:00", &["x"])).unwrap();
        catalog.insert_photo(&make_photo("b.jpg", "2024-05-01 10:00", &["y"])).unwrap();
        let mut c = make_photo("c.jpg", "2024-06-01 10:00", &["z"]);
        c.text = vec!["win".into(), "wint".into()];
        catalog.insert_photo(&c).unwrap();

        let by_year = Filter {
            year: Some(2024),
            ..Default::default()
        };
        assert_eq!(catalog.find_photos(&by_year, 10, None).unwrap().photos.len(), 2);

        let by_tags = Filter {
            tags: vec!["x".into(), "z".into()],
            ..Default::default()
        };
        let ids: Vec<String> = catalog
            .find_photos(&by_tags, 10, None)
            .unwrap()
            .photos
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["c.jpg", "a.jpg"]);

        let by_text = Filter {
            text: vec!["wint".into()],
            month: Some(6),
            ..Default::default()
        };
        let page = catalog.find_photos(&by_text, 10, None).unwrap();
        assert_eq!(page.photos.len(), 1);
        assert_eq!(page.photos[0].id, "c.jpg");
    }

    #[test]
    fn test_find_photos_unbounded_limit() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog.insert_photo(&make_photo("a.jpg", "2024-05-01 10:00", &[])).unwrap();
        let page = catalog
            .find_photos(&Filter::default(), usize::MAX, None)
            .unwrap();
        assert_eq!(page.photos.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_find_photos_unknown_cursor() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = catalog
            .find_photos(&Filter::default(), 10, Some("ghost.jpg"))
            .unwrap_err();
        assert!(matches!(err, Error::PhotoNotFound(_)));
    }

    // ── Counter tests ────────────────────────────────────────────

    #[test]
    fn test_transact_counter_applies_decision() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let key = CounterKey::new(TrackedField::Tags, "x");
        let write = catalog.transact_counter(&key, &|cur| {
            assert_eq!(cur, None);
            CounterWrite::Create(2)
        });
        assert_eq!(write.unwrap(), CounterWrite::Create(2));
        catalog
            .transact_counter(&key, &|cur| {
                assert_eq!(cur, Some(2));
                CounterWrite::Update(5)
            })
            .unwrap();
        assert_eq!(catalog.get_counter(&key).unwrap().unwrap().count, 5);

        catalog.transact_counter(&key, &|_| CounterWrite::Delete).unwrap();
        assert!(catalog.get_counter(&key).unwrap().is_none());
    }

    #[test]
    fn test_zero_count_rejected_by_schema() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let key = CounterKey::new(TrackedField::Tags, "x");
        let err = catalog
            .transact_counter(&key, &|_| CounterWrite::Create(0))
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(catalog.get_counter(&key).unwrap().is_none());
    }

    #[test]
    fn test_write_counters_batch_and_crud() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog
            .put_counter(&CounterEntry {
                field: TrackedField::Lens,
                value: "50mm".to_string(),
                count: 1,
            })
            .unwrap();
        catalog
            .write_counters(&[
                CounterOp::Put(CounterEntry {
                    field: TrackedField::Lens,
                    value: "85mm".to_string(),
                    count: 3,
                }),
                CounterOp::Delete(CounterKey::new(TrackedField::Lens, "50mm")),
            ])
            .unwrap();

        let lenses = catalog.counters_for_field(TrackedField::Lens).unwrap();
        assert_eq!(lenses.len(), 1);
        assert_eq!(lenses[0].value, "85mm");
        assert!(catalog
            .delete_counter(&CounterKey::new(TrackedField::Lens, "85mm"))
            .unwrap());
        assert!(catalog.load_counters().unwrap().is_empty());
    }

    // ── Family / config tests ────────────────────────────────────

    #[test]
    fn test_failed_recompute_rolls_back_whole_batch() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog
            .insert_photo(&make_photo("r1.jpg", "2024-05-01 10:00", &["boom", "x"]))
            .unwrap();
        catalog
            .put_counter(&CounterEntry {
                field: TrackedField::Tags,
                value: "old".to_string(),
                count: 3,
            })
            .unwrap();
        // Reject one insert of the batch after the stale delete already ran.
        catalog
            .conn
            .execute_batch(
                "CREATE TEMP TRIGGER reject_boom BEFORE INSERT ON counters
                 WHEN NEW.value = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut ledger = crate::ledger::Ledger::with_family(FamilyMap::default());
        ledger.init(&catalog).unwrap();
        let before = ledger.projection().clone();

        let err = ledger
            .recompute_field(&mut catalog, TrackedField::Tags)
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        let tags = catalog.counters_for_field(TrackedField::Tags).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, "old");
        assert_eq!(tags[0].count, 3);
        assert_eq!(ledger.projection(), &before);
    }

    #[test]
    fn test_family_roundtrip() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.set_family("a@x.com", "ana").unwrap();
        catalog.set_family("a@x.com", "anna").unwrap();
        assert_eq!(catalog.family().unwrap().lookup("a@x.com"), Some("anna"));
        assert!(catalog.remove_family("a@x.com").unwrap());
        assert!(!catalog.remove_family("a@x.com").unwrap());
        assert!(catalog.family().unwrap().is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.get_config("page_limit").unwrap(), None);
        catalog.set_config("page_limit", "12").unwrap();
        assert_eq!(catalog.get_config("page_limit").unwrap().as_deref(), Some("12"));
        catalog.set_config("page_limit", "20").unwrap();
        assert_eq!(catalog.get_config("page_limit").unwrap().as_deref(), Some("20"));
    }
}
