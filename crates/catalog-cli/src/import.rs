//! CSV model and local checks for the bulk importer.

use anyhow::{bail, Context, Result};
use catalog_core::models::CreateEntryRequest;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const COL_NAME: &str = "Name";
pub const COL_FOLDER: &str = "Folder path";
pub const COL_PUBLISHER: &str = "Publisher";
pub const COL_RANGE: &str = "Range";
pub const COL_FACTION: &str = "Faction Tag";
pub const COL_ARMY_ROLE: &str = "Army Role";
pub const COL_GW_ALTERNATIVE: &str = "GW Alternative";

pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_NAME,
    COL_FOLDER,
    COL_PUBLISHER,
    COL_RANGE,
    COL_FACTION,
    COL_ARMY_ROLE,
    COL_GW_ALTERNATIVE,
];

/// Tag type names the importer fills, in report order
pub const TAG_TYPES: [&str; 4] = [COL_PUBLISHER, COL_FACTION, COL_ARMY_ROLE, COL_GW_ALTERNATIVE];

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// One data row, values trimmed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    /// Line number in the file; the header is row 1
    pub row_number: usize,
    pub name: String,
    pub folder_path: String,
    pub publisher: String,
    pub range: String,
    pub faction_tag: String,
    pub army_role: String,
    pub gw_alternative: String,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl CsvRow {
    /// Tag names keyed by tag type, as the import API expects them
    pub fn tags(&self) -> BTreeMap<String, Vec<String>> {
        let mut tags = BTreeMap::new();
        if !self.publisher.is_empty() {
            tags.insert(COL_PUBLISHER.to_string(), vec![self.publisher.clone()]);
        }
        if !self.faction_tag.is_empty() {
            tags.insert(COL_FACTION.to_string(), vec![self.faction_tag.clone()]);
        }
        if !self.army_role.is_empty() {
            tags.insert(COL_ARMY_ROLE.to_string(), vec![self.army_role.clone()]);
        }
        let alternatives: Vec<String> = self
            .gw_alternative
            .split(';')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        if !alternatives.is_empty() {
            tags.insert(COL_GW_ALTERNATIVE.to_string(), alternatives);
        }
        tags
    }

    pub fn to_request(&self) -> CreateEntryRequest {
        CreateEntryRequest {
            name: self.name.clone(),
            publisher: non_empty(&self.publisher),
            range: non_empty(&self.range),
            folder_location: non_empty(&self.folder_path),
            tags: self.tags(),
        }
    }

    pub fn publisher(&self) -> Option<&str> {
        (!self.publisher.is_empty()).then_some(self.publisher.as_str())
    }

    pub fn range(&self) -> Option<&str> {
        (!self.range.is_empty()).then_some(self.range.as_str())
    }
}

/// Read every data row of a CSV file.
///
/// Fails when the header is missing or lacks a required column.
pub fn read_rows(path: &Path) -> Result<Vec<CsvRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("CSV file not found: {}", path.display()))?;
    parse_rows(file)
}

pub fn parse_rows<R: std::io::Read>(input: R) -> Result<Vec<CsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().context("Error reading CSV file")?.clone();
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), idx))
        .filter(|(h, _)| !h.is_empty())
        .collect();
    if columns.is_empty() {
        bail!("CSV file is empty or has no header row");
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        bail!("CSV is missing required columns: {}", missing.join(", "));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.context("Error reading CSV file")?;
        let value = |column: &str| {
            columns
                .get(column)
                .and_then(|i| record.get(*i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        rows.push(CsvRow {
            row_number: idx + 2,
            name: value(COL_NAME),
            folder_path: value(COL_FOLDER),
            publisher: value(COL_PUBLISHER),
            range: value(COL_RANGE),
            faction_tag: value(COL_FACTION),
            army_role: value(COL_ARMY_ROLE),
            gw_alternative: value(COL_GW_ALTERNATIVE),
        });
    }
    Ok(rows)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

/// Top-level image files of a folder, sorted by path
pub fn find_images(folder: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image(p))
        .collect();
    images.sort();
    images
}

/// Local checks run before any API call
pub fn validate_row(row: &CsvRow) -> Vec<String> {
    let mut errors = Vec::new();
    if row.name.is_empty() {
        errors.push("Name is required".to_string());
    }

    if row.folder_path.is_empty() {
        errors.push("Folder path is required".to_string());
        return errors;
    }
    let folder = Path::new(&row.folder_path);
    if !folder.exists() {
        errors.push(format!("Folder does not exist: {}", row.folder_path));
    } else if !folder.is_dir() {
        errors.push(format!("Not a directory: {}", row.folder_path));
    } else if find_images(folder).is_empty() {
        errors.push(format!("No image files found in: {}", row.folder_path));
    }
    errors
}

/// Tag names in the CSV that the server does not know yet
pub fn new_tags(
    rows: &[CsvRow],
    existing: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut new: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        for (tag_type, names) in row.tags() {
            let known = existing.get(&tag_type);
            for name in names {
                if known.is_some_and(|k| k.contains(&name)) {
                    continue;
                }
                new.entry(tag_type.clone()).or_default().insert(name);
            }
        }
    }
    new
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Name,Folder path,Publisher,Range,Faction Tag,Army Role,GW Alternative\n";

    fn row() -> CsvRow {
        CsvRow {
            row_number: 2,
            name: "Knight".to_string(),
            publisher: "Acme Minis".to_string(),
            faction_tag: "Order".to_string(),
            gw_alternative: "Paladin; ;Templar".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_rows_strips_bom_and_trims() {
        let csv = format!("\u{feff}{}  Knight ,/tmp/k,Acme,, Order ,,a;b\n", HEADER);
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].name, "Knight");
        assert_eq!(rows[0].faction_tag, "Order");
        assert_eq!(rows[0].range, "");
    }

    #[test]
    fn test_parse_rows_reports_missing_columns() {
        let err = parse_rows("Name,Folder path\nKnight,/tmp\n".as_bytes()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CSV is missing required columns: Publisher, Range, Faction Tag, Army Role, GW Alternative"
        );
    }

    #[test]
    fn test_parse_rows_empty_file() {
        assert!(parse_rows("".as_bytes()).is_err());
    }

    #[test]
    fn test_tags_mapping() {
        let tags = row().tags();
        assert_eq!(tags["Publisher"], vec!["Acme Minis"]);
        assert_eq!(tags["Faction Tag"], vec!["Order"]);
        assert_eq!(tags["GW Alternative"], vec!["Paladin", "Templar"]);
        assert!(!tags.contains_key("Army Role"));
    }

    #[test]
    fn test_to_request_blank_fields_are_none() {
        let request = row().to_request();
        assert_eq!(request.name, "Knight");
        assert_eq!(request.publisher.as_deref(), Some("Acme Minis"));
        assert!(request.range.is_none());
        assert!(request.folder_location.is_none());
    }

    #[test]
    fn test_validate_row_required_fields() {
        let errors = validate_row(&CsvRow::default());
        assert_eq!(errors, vec!["Name is required", "Folder path is required"]);
    }

    #[test]
    fn test_validate_row_folder_checks() {
        let dir = tempfile::tempdir().unwrap();
        let mut row = row();

        row.folder_path = dir.path().join("missing").display().to_string();
        assert!(validate_row(&row)[0].starts_with("Folder does not exist: "));

        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"x").unwrap();
        row.folder_path = file.display().to_string();
        assert!(validate_row(&row)[0].starts_with("Not a directory: "));

        row.folder_path = dir.path().display().to_string();
        assert!(validate_row(&row)[0].starts_with("No image files found in: "));

        std::fs::write(dir.path().join("B.JPG"), b"x").unwrap();
        assert!(validate_row(&row).is_empty());
    }

    #[test]
    fn test_find_images_top_level_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"x").unwrap();
        std::fs::write(dir.path().join("a.JPEG"), b"x").unwrap();
        std::fs::write(dir.path().join("model.stl"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.jpg"), b"x").unwrap();

        let names: Vec<String> = find_images(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPEG", "b.png"]);
    }

    #[test]
    fn test_new_tags_skips_known() {
        let mut existing = BTreeMap::new();
        existing.insert("Publisher".to_string(), vec!["Acme Minis".to_string()]);
        let new = new_tags(&[row()], &existing);
        assert!(!new.contains_key("Publisher"));
        assert_eq!(
            new["GW Alternative"].iter().collect::<Vec<_>>(),
            vec!["Paladin", "Templar"]
        );
        assert!(new["Faction Tag"].contains("Order"));
    }
}
