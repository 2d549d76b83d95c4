use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use famalbum_core::Album;

pub fn add(album: &mut Album, email: &str, nick: &str) -> Result<()> {
    album.set_family(email, nick)?;
    println!("Mapped {email} -> {nick}");
    println!("  existing photos keep their nick; run `famalbum stats recompute nick` to recount");
    Ok(())
}

pub fn list(album: &Album) {
    let family = album.family();
    if family.is_empty() {
        println!("No family members. Add one with `famalbum family add <email> <nick>`.");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("E-mail"), Cell::new("Nick")]);
    for (email, nick) in family.iter() {
        table.add_row(vec![Cell::new(email), Cell::new(nick)]);
    }
    println!("{table}");
}

pub fn rm(album: &mut Album, email: &str) -> Result<()> {
    if album.remove_family(email)? {
        println!("Removed {email}");
    } else {
        println!("{email} is not in the family map");
    }
    Ok(())
}
