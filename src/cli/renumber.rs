use crate::db::get_connection;
use crate::error::Result;
use crate::renumber::renumber_transactions;
use crate::settings::Settings;

pub fn run(settings: &Settings, db: Option<&str>) -> Result<()> {
    let mut conn = get_connection(&settings.mmex_db_path(db)?)?;
    let result = renumber_transactions(&mut conn)?;
    println!(
        "{} transactions renumbered, {} ids changed",
        result.total, result.changed
    );
    Ok(())
}
