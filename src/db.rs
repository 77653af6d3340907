use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::error::{MigrateError, Result};
use crate::models::{CheckingRow, MmexCategory};

/// `PARENTID` value MMEX uses for top-level categories.
pub const ROOT_PARENT_ID: i64 = -1;

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(MigrateError::Other(format!(
            "MMEX database not found: {}",
            db_path.display()
        )));
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn open_read_only(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

pub fn load_categories(conn: &Connection) -> Result<Vec<MmexCategory>> {
    let mut stmt = conn.prepare("SELECT CATEGID, CATEGNAME, PARENTID FROM CATEGORY_V1")?;
    let categories = stmt
        .query_map([], |row| {
            let parent: Option<i64> = row.get(2)?;
            Ok(MmexCategory {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: parent.filter(|p| *p != ROOT_PARENT_ID),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

fn load_name_index(conn: &Connection, sql: &str) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut index = HashMap::new();
    for (id, name) in rows {
        // lowest id wins on duplicate names
        index.entry(name).or_insert(id);
    }
    Ok(index)
}

/// `ACCOUNTNAME -> ACCOUNTID`
pub fn load_accounts(conn: &Connection) -> Result<HashMap<String, i64>> {
    load_name_index(
        conn,
        "SELECT ACCOUNTID, ACCOUNTNAME FROM ACCOUNTLIST_V1 ORDER BY ACCOUNTID",
    )
}

/// `PAYEENAME -> PAYEEID`
pub fn load_payees(conn: &Connection) -> Result<HashMap<String, i64>> {
    load_name_index(conn, "SELECT PAYEEID, PAYEENAME FROM PAYEE_V1 ORDER BY PAYEEID")
}

/// Every `TRANSID` in ascending order.
pub fn load_transaction_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT TRANSID FROM CHECKINGACCOUNT_V1 ORDER BY TRANSID")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

pub fn insert_checking_row(conn: &Connection, row: &CheckingRow) -> Result<()> {
    conn.execute(
        "INSERT INTO CHECKINGACCOUNT_V1 (TRANSID, ACCOUNTID, TOACCOUNTID, PAYEEID, TRANSCODE, \
         TRANSAMOUNT, STATUS, TRANSACTIONNUMBER, NOTES, CATEGID, TRANSDATE, LASTUPDATEDTIME, \
         DELETEDTIME, FOLLOWUPID, TOTRANSAMOUNT, COLOR) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        rusqlite::params![
            row.transid,
            row.accountid,
            row.toaccountid,
            row.payeeid,
            row.transcode,
            row.transamount,
            row.status,
            row.transactionnumber,
            row.notes,
            row.categid,
            row.transdate,
            row.lastupdatedtime,
            row.deletedtime,
            row.followupid,
            row.totransamount,
            row.color,
        ],
    )?;
    Ok(())
}

/// Subset of the MMEX schema touched by this tool.
#[cfg(test)]
pub const TEST_SCHEMA: &str = "
CREATE TABLE CATEGORY_V1 (
    CATEGID INTEGER PRIMARY KEY,
    CATEGNAME TEXT NOT NULL,
    ACTIVE INTEGER,
    PARENTID INTEGER
);
CREATE TABLE ACCOUNTLIST_V1 (
    ACCOUNTID INTEGER PRIMARY KEY,
    ACCOUNTNAME TEXT NOT NULL
);
CREATE TABLE PAYEE_V1 (
    PAYEEID INTEGER PRIMARY KEY,
    PAYEENAME TEXT NOT NULL
);
CREATE TABLE CHECKINGACCOUNT_V1 (
    TRANSID INTEGER PRIMARY KEY,
    ACCOUNTID INTEGER NOT NULL,
    TOACCOUNTID INTEGER,
    PAYEEID INTEGER NOT NULL,
    TRANSCODE TEXT NOT NULL,
    TRANSAMOUNT NUMERIC NOT NULL,
    STATUS TEXT,
    TRANSACTIONNUMBER TEXT,
    NOTES TEXT,
    CATEGID INTEGER,
    TRANSDATE TEXT,
    LASTUPDATEDTIME TEXT,
    DELETEDTIME TEXT,
    FOLLOWUPID INTEGER,
    TOTRANSAMOUNT NUMERIC,
    COLOR INTEGER
);
";

#[cfg(test)]
pub fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finances.mmb");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(TEST_SCHEMA).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_category(conn: &Connection, id: i64, name: &str, parent: Option<i64>) {
        conn.execute(
            "INSERT INTO CATEGORY_V1 (CATEGID, CATEGNAME, ACTIVE, PARENTID) VALUES (?1, ?2, 1, ?3)",
            rusqlite::params![id, name, parent],
        )
        .unwrap();
    }

    #[test]
    fn test_load_categories_maps_root_sentinel() {
        let (_dir, conn) = test_db();
        add_category(&conn, 1, "Food", Some(-1));
        add_category(&conn, 2, "Groceries", Some(1));
        add_category(&conn, 3, "Legacy", None);
        let cats = load_categories(&conn).unwrap();
        assert_eq!(cats.len(), 3);
        assert_eq!(cats[0].parent_id, None);
        assert_eq!(cats[1].parent_id, Some(1));
        assert_eq!(cats[2].parent_id, None);
    }

    #[test]
    fn test_load_accounts_prefers_lowest_id() {
        let (_dir, conn) = test_db();
        conn.execute_batch(
            "INSERT INTO ACCOUNTLIST_V1 (ACCOUNTID, ACCOUNTNAME) VALUES (4, 'Casa');
             INSERT INTO ACCOUNTLIST_V1 (ACCOUNTID, ACCOUNTNAME) VALUES (2, 'Casa');
             INSERT INTO ACCOUNTLIST_V1 (ACCOUNTID, ACCOUNTNAME) VALUES (3, 'Intesa');",
        )
        .unwrap();
        let accounts = load_accounts(&conn).unwrap();
        assert_eq!(accounts["Casa"], 2);
        assert_eq!(accounts["Intesa"], 3);
    }

    #[test]
    fn test_load_transaction_ids_sorted() {
        let (_dir, conn) = test_db();
        for id in [5, 0, 2] {
            conn.execute(
                "INSERT INTO CHECKINGACCOUNT_V1 (TRANSID, ACCOUNTID, PAYEEID, TRANSCODE, TRANSAMOUNT) \
                 VALUES (?1, 1, 1, 'Withdrawal', 1.0)",
                [id],
            )
            .unwrap();
        }
        assert_eq!(load_transaction_ids(&conn).unwrap(), vec![0, 2, 5]);
    }

    #[test]
    fn test_get_connection_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(get_connection(&dir.path().join("missing.mmb")).is_err());
    }
}
