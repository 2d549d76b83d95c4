use crate::catalog::Catalog;
use crate::error::{Error, Result};

pub const PAGE_LIMIT_KEY: &str = "page_limit";
pub const NO_TITLE_KEY: &str = "no_title";

/// Largest accepted `page_limit`.
pub const MAX_PAGE_LIMIT: usize = 10_000;

/// Album settings stored in the catalog's `config` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumConfig {
    /// Photos per gallery page before filter multipliers.
    pub page_limit: usize,
    /// Headline given to photos published without one.
    pub no_title: String,
}

impl Default for AlbumConfig {
    fn default() -> Self {
        Self {
            page_limit: 100,
            no_title: "No name".to_string(),
        }
    }
}

impl AlbumConfig {
    /// Read settings from the catalog, defaulting whatever is unset.
    pub fn load(catalog: &Catalog) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = catalog.get_config(PAGE_LIMIT_KEY)? {
            config.page_limit = parse_page_limit(&raw)?;
        }
        if let Some(raw) = catalog.get_config(NO_TITLE_KEY)? {
            config.no_title = raw;
        }
        Ok(config)
    }

    /// Validate and persist one setting.
    pub fn set(catalog: &Catalog, key: &str, value: &str) -> Result<()> {
        match key {
            PAGE_LIMIT_KEY => {
                parse_page_limit(value)?;
            }
            NO_TITLE_KEY if !value.trim().is_empty() => {}
            _ => {
                return Err(Error::InvalidConfig {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
        }
        catalog.set_config(key, value.trim())
    }
}

fn parse_page_limit(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(Error::InvalidConfig {
            key: PAGE_LIMIT_KEY.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(AlbumConfig::load(&catalog).unwrap(), AlbumConfig::default());
    }

    #[test]
    fn test_set_and_load() {
        let catalog = Catalog::open_in_memory().unwrap();
        AlbumConfig::set(&catalog, PAGE_LIMIT_KEY, "12").unwrap();
        AlbumConfig::set(&catalog, NO_TITLE_KEY, "Untitled").unwrap();
        let config = AlbumConfig::load(&catalog).unwrap();
        assert_eq!(config.page_limit, 12);
        assert_eq!(config.no_title, "Untitled");
    }

    #[test]
    fn test_rejects_bad_values() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(matches!(
            AlbumConfig::set(&catalog, PAGE_LIMIT_KEY, "0"),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(AlbumConfig::set(&catalog, PAGE_LIMIT_KEY, &usize::MAX.to_string()).is_err());
        assert!(AlbumConfig::set(&catalog, PAGE_LIMIT_KEY, "10001").is_err());
        assert!(AlbumConfig::set(&catalog, PAGE_LIMIT_KEY, "10000").is_ok());
        assert!(AlbumConfig::set(&catalog, NO_TITLE_KEY, "  ").is_err());
        assert!(AlbumConfig::set(&catalog, "theme", "dark").is_err());
    }

    #[test]
    fn test_load_rejects_corrupt_stored_value() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.set_config(PAGE_LIMIT_KEY, "lots").unwrap();
        assert!(AlbumConfig::load(&catalog).is_err());
        catalog
            .set_config(PAGE_LIMIT_KEY, &usize::MAX.to_string())
            .unwrap();
        assert!(matches!(
            AlbumConfig::load(&catalog),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
