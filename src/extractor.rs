use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::categories::{prefixes, root_segment, CategoryTree};
use crate::db::{load_categories, open_read_only};
use crate::error::{MigrateError, Result};
use crate::ledger::{distinct_categories, read_ledger};

/// Reads raw category data from a source and reduces it to colon-delimited
/// category paths, persisted as a JSON array.
pub trait CategoryExtractor {
    fn source(&self) -> &Path;

    fn output(&self) -> &Path;

    /// Raw category strings or rows, reduced to sorted unique paths.
    fn extract_categories(&self) -> Result<Vec<String>>;

    /// Extract and merge into the output file. Returns the number of paths
    /// now stored.
    fn execute(&self) -> Result<usize> {
        let categories = self.extract_categories()?;
        log::info!(
            "extracted {} categories from {}",
            categories.len(),
            self.source().display()
        );
        if categories.is_empty() {
            return Err(MigrateError::EmptyCategories(
                self.source().display().to_string(),
            ));
        }
        save_categories(self.output(), &categories)
    }
}

pub struct LedgerCategoriesExtractor {
    pub path: PathBuf,
    pub output_path: PathBuf,
    pub asset_root: String,
    pub starting_balance_account: String,
}

impl CategoryExtractor for LedgerCategoriesExtractor {
    fn source(&self) -> &Path {
        &self.path
    }

    fn output(&self) -> &Path {
        &self.output_path
    }

    fn extract_categories(&self) -> Result<Vec<String>> {
        let rows = read_ledger(&self.path)?;
        Ok(expand_ledger_categories(
            &distinct_categories(&rows),
            &self.asset_root,
            &self.starting_balance_account,
        ))
    }
}

pub struct MmexCategoriesExtractor {
    pub path: PathBuf,
    pub output_path: PathBuf,
}

impl CategoryExtractor for MmexCategoriesExtractor {
    fn source(&self) -> &Path {
        &self.path
    }

    fn output(&self) -> &Path {
        &self.output_path
    }

    fn extract_categories(&self) -> Result<Vec<String>> {
        let conn = open_read_only(&self.path)?;
        let tree = CategoryTree::new(load_categories(&conn)?);
        Ok(tree.paths())
    }
}

/// Drop asset accounts and the starting-balance pseudo-account, then expand
/// every category into all of its prefixes.
pub fn expand_ledger_categories(
    raw: &[String],
    asset_root: &str,
    starting_balance_account: &str,
) -> Vec<String> {
    raw.iter()
        .filter(|c| root_segment(c) != asset_root && c.as_str() != starting_balance_account)
        .flat_map(|c| prefixes(c))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn check_json_extension(path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(MigrateError::FileExtension {
            path: path.display().to_string(),
            expected: "json",
        });
    }
    Ok(())
}

/// Write a value as 4-space indented JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    check_json_extension(path)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    let mut file = File::create(path)?;
    file.write_all(&buf)?;
    file.write_all(b"\n")?;
    Ok(())
}

pub fn read_categories(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Union `categories` with whatever the output file already holds.
pub fn save_categories(path: &Path, categories: &[String]) -> Result<usize> {
    check_json_extension(path)?;
    let mut merged: BTreeSet<String> = categories.iter().cloned().collect();
    if path.exists() {
        let existing = read_categories(path)?;
        log::debug!("merging with {} existing categories", existing.len());
        merged.extend(existing);
    }
    let merged: Vec<String> = merged.into_iter().collect();
    write_json(path, &merged)?;
    Ok(merged.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expand_ledger_categories() {
        let raw = strings(&["Food:Groceries:Organic"]);
        assert_eq!(
            expand_ledger_categories(&raw, "Assets", "StartingBalance"),
            strings(&["Food", "Food:Groceries", "Food:Groceries:Organic"])
        );
    }

    #[test]
    fn test_expand_filters_pseudo_categories() {
        let raw = strings(&[
            "Assets:Intesa XME",
            "StartingBalance",
            "Spese:Cibo",
            "Spese:Casa:Affitto",
            "Guadagni",
        ]);
        assert_eq!(
            expand_ledger_categories(&raw, "Assets", "StartingBalance"),
            strings(&["Guadagni", "Spese", "Spese:Casa", "Spese:Casa:Affitto", "Spese:Cibo"])
        );
    }

    #[test]
    fn test_save_rejects_non_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_categories(&dir.path().join("out.txt"), &strings(&["A"])).unwrap_err();
        assert!(matches!(err, MigrateError::FileExtension { .. }));
    }

    #[test]
    fn test_save_merges_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("categories.json");
        assert_eq!(save_categories(&path, &strings(&["B", "A"])).unwrap(), 2);
        assert_eq!(save_categories(&path, &strings(&["B", "A"])).unwrap(), 2);
        assert_eq!(save_categories(&path, &strings(&["C"])).unwrap(), 3);
        assert_eq!(read_categories(&path).unwrap(), strings(&["A", "B", "C"]));
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n    \"A\""));
    }

    #[test]
    fn test_ledger_extractor_execute() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("2022.csv");
        std::fs::write(
            &input,
            "\"2022/01/03\",\"\",\"Spesa\",\"Spese:Cibo\",\"€\",\"12.5\",\"*\",\"\"\n\
             \"2022/01/03\",\"\",\"Spesa\",\"Assets:Intesa\",\"€\",\"-12.5\",\"*\",\"\"\n",
        )
        .unwrap();
        let extractor = LedgerCategoriesExtractor {
            path: input,
            output_path: dir.path().join("ledger_categories.json"),
            asset_root: "Assets".into(),
            starting_balance_account: "StartingBalance".into(),
        };
        assert_eq!(extractor.execute().unwrap(), 2);
        assert_eq!(extractor.execute().unwrap(), 2);
    }

    #[test]
    fn test_ledger_extractor_fails_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("2022.csv");
        std::fs::write(
            &input,
            "\"2022/01/01\",\"\",\"Starting balances\",\"Assets:Intesa\",\"€\",\"10\",\"*\",\"\"\n",
        )
        .unwrap();
        let extractor = LedgerCategoriesExtractor {
            path: input,
            output_path: dir.path().join("ledger_categories.json"),
            asset_root: "Assets".into(),
            starting_balance_account: "StartingBalance".into(),
        };
        assert!(matches!(extractor.execute(), Err(MigrateError::EmptyCategories(_))));
    }

    #[test]
    fn test_mmex_extractor_execute() {
        let (dir, conn) = test_db();
        conn.execute_batch(
            "INSERT INTO CATEGORY_V1 VALUES (1, 'A', 1, -1);
             INSERT INTO CATEGORY_V1 VALUES (2, 'B', 1, 1);
             INSERT INTO CATEGORY_V1 VALUES (3, 'C', 1, 2);",
        )
        .unwrap();
        drop(conn);
        let output = dir.path().join("mmex_categories.json");
        let extractor = MmexCategoriesExtractor {
            path: dir.path().join("finances.mmb"),
            output_path: output.clone(),
        };
        assert_eq!(extractor.execute().unwrap(), 3);
        assert_eq!(read_categories(&output).unwrap(), strings(&["A", "A:B", "A:B:C"]));
    }
}
