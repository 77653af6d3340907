use rusqlite::Connection;

use crate::error::Result;

pub struct RenumberResult {
    pub total: usize,
    pub changed: usize,
}

/// Rewrite every `TRANSID` so ids follow transaction date order, starting at
/// zero. Rows are parked on negative ids first so the primary key never
/// collides mid-update.
pub fn renumber_transactions(conn: &mut Connection) -> Result<RenumberResult> {
    let tx = conn.transaction()?;

    let ids: Vec<i64> = {
        let mut stmt = tx.prepare(
            "SELECT TRANSID FROM CHECKINGACCOUNT_V1 ORDER BY TRANSDATE ASC, TRANSID ASC",
        )?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        rows
    };

    let mut changed = 0usize;
    {
        let mut park = tx.prepare("UPDATE CHECKINGACCOUNT_V1 SET TRANSID = ?1 WHERE TRANSID = ?2")?;
        for (new_id, old_id) in ids.iter().enumerate() {
            let new_id = new_id as i64;
            if new_id != *old_id {
                changed += 1;
            }
            park.execute(rusqlite::params![-(new_id + 1), old_id])?;
        }
        for new_id in 0..ids.len() as i64 {
            park.execute(rusqlite::params![new_id, -(new_id + 1)])?;
        }
    }

    tx.commit()?;
    log::info!("renumbered {} transactions ({changed} changed)", ids.len());
    Ok(RenumberResult {
        total: ids.len(),
        changed,
    })
}
