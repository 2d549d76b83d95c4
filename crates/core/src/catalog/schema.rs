use rusqlite::Connection;

use crate::error::Result;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS photos (
            id           TEXT PRIMARY KEY,
            size         INTEGER NOT NULL DEFAULT 0,
            email        TEXT NOT NULL,
            nick         TEXT NOT NULL,
            headline     TEXT NOT NULL,
            date         TEXT NOT NULL,
            year         INTEGER,
            month        INTEGER,
            day          INTEGER,
            model        TEXT,
            lens         TEXT,
            focal_length INTEGER,
            aperture     REAL,
            shutter      TEXT,
            iso          INTEGER,
            flash        INTEGER NOT NULL DEFAULT 0,
            width        INTEGER,
            height       INTEGER,
            loc          TEXT,
            tags         TEXT NOT NULL DEFAULT '[]',
            text         TEXT NOT NULL DEFAULT '[]',
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_photos_date ON photos(date DESC, id DESC);
        CREATE INDEX IF NOT EXISTS idx_photos_year ON photos(year);
        CREATE INDEX IF NOT EXISTS idx_photos_model ON photos(model);
        CREATE INDEX IF NOT EXISTS idx_photos_nick ON photos(nick);

        CREATE TABLE IF NOT EXISTS counters (
            id    TEXT PRIMARY KEY,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            count INTEGER NOT NULL CHECK (count > 0)
        );

        CREATE INDEX IF NOT EXISTS idx_counters_field ON counters(field);

        CREATE TABLE IF NOT EXISTS family (
            email TEXT PRIMARY KEY,
            nick  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bucket (
            id    TEXT PRIMARY KEY,
            size  INTEGER NOT NULL,
            count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}
