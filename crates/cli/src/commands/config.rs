use anyhow::Result;
use famalbum_core::config::{NO_TITLE_KEY, PAGE_LIMIT_KEY};
use famalbum_core::Album;

pub fn set(album: &mut Album, key: &str, value: &str) -> Result<()> {
    album.set_config(key, value)?;
    println!("{key} = {value}");
    Ok(())
}

pub fn show(album: &Album) {
    let config = album.config();
    println!("  {PAGE_LIMIT_KEY:<12} {}", config.page_limit);
    println!("  {NO_TITLE_KEY:<12} {}", config.no_title);
}
