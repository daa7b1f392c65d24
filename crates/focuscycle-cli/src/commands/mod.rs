pub mod config;
pub mod phases;
pub mod run;
pub mod sessions;

use std::path::Path;

use focuscycle_core::storage::Database;

/// Open the database at `path`, or the default one under the data dir.
pub fn open_database(path: Option<&Path>) -> Result<Database, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => Database::open_at(path)?,
        None => Database::open()?,
    })
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_secs(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
