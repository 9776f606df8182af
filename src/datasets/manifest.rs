use std::{collections::HashMap, io::Read, path::Path};

use serde::Deserialize;

use super::errors::{DatasetError, Result};

/// One `filename,label` line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestRow {
    pub filename: String,
    pub label: String,
}

/// Rows of a manifest csv, in file order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
}

impl Manifest {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let parse = || -> Result<Self, csv::Error> {
            let rdr = csv::Reader::from_path(path)?;
            Self::collect(rdr)
        };
        parse().map_err(|source| DatasetError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Columns are matched by header name; anything besides `filename` and
    /// `label` is ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        Self::collect(csv::Reader::from_reader(reader))
    }

    fn collect<R: Read>(mut rdr: csv::Reader<R>) -> Result<Self, csv::Error> {
        let rows = rdr
            .deserialize::<ManifestRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&ManifestRow> {
        self.rows.get(index)
    }
}

impl FromIterator<ManifestRow> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Distinct labels of a manifest in sorted order.
///
/// The label at position `k` has class code `k + 1` and first appears in the
/// manifest at row `first_indices()[k]`.
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    labels: Vec<String>,
    first_indices: Vec<usize>,
    codes: HashMap<String, usize>,
}

impl ClassIndex {
    pub fn new(manifest: &Manifest) -> Self {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        for (i, row) in manifest.rows().iter().enumerate() {
            first_seen.entry(row.label.as_str()).or_insert(i);
        }

        let mut classes: Vec<(&str, usize)> = first_seen.into_iter().collect();
        classes.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let labels: Vec<String> = classes.iter().map(|(l, _)| l.to_string()).collect();
        let first_indices = classes.iter().map(|&(_, i)| i).collect();
        let codes = labels
            .iter()
            .enumerate()
            .map(|(k, l)| (l.clone(), k + 1))
            .collect();

        Self {
            labels,
            first_indices,
            codes,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn first_indices(&self) -> &[usize] {
        &self.first_indices
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.codes.get(label).copied()
    }

    pub fn label_name(&self, code: usize) -> Option<&str> {
        code.checked_sub(1)
            .and_then(|k| self.labels.get(k))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(filename: &str, label: &str) -> ManifestRow {
        ManifestRow {
            filename: filename.into(),
            label: label.into(),
        }
    }

    #[test]
    fn test_parse_by_header_name() {
        let csv = "label,filename,split\ncat,a.jpg,train\ndog,b.jpg,train\n";
        let manifest = Manifest::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get(0), Some(&row("a.jpg", "cat")));
        assert_eq!(manifest.get(1), Some(&row("b.jpg", "dog")));
        assert_eq!(manifest.get(2), None);
    }

    #[test]
    fn test_parse_missing_column() {
        let csv = "filename\na.jpg\n";
        assert!(Manifest::from_reader(csv.as_bytes()).is_err());
    }

    fn write_manifest(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_from_path_missing_label_column() {
        let (_dir, path) = write_manifest("filename,split\na.jpg,train\n");
        match Manifest::from_path(&path) {
            Err(DatasetError::ManifestParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected ManifestParse, got {other:?}"),
        }
    }

    #[test]
    fn test_from_path_extra_field_in_row() {
        let (_dir, path) = write_manifest("filename,label\na.jpg,cat\nb.jpg,dog,extra\n");
        match Manifest::from_path(&path) {
            Err(DatasetError::ManifestParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected ManifestParse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_file() {
        let err = Manifest::from_path("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, DatasetError::ManifestParse { .. }));
    }

    #[test]
    fn test_class_index_sorted_codes() {
        let manifest: Manifest = [
            row("a.jpg", "cat"),
            row("b.jpg", "dog"),
            row("c.jpg", "cat"),
        ]
        .into_iter()
        .collect();
        let classes = ClassIndex::new(&manifest);

        assert_eq!(classes.labels(), &["cat".to_string(), "dog".to_string()]);
        assert_eq!(classes.first_indices(), &[0, 1]);
        assert_eq!(classes.code("cat"), Some(1));
        assert_eq!(classes.code("dog"), Some(2));
        assert_eq!(classes.code("bird"), None);
        assert_eq!(classes.label_name(2), Some("dog"));
        assert_eq!(classes.label_name(0), None);
        assert_eq!(classes.label_name(3), None);
    }

    #[test]
    fn test_first_index_follows_label_order() {
        // file order differs from label order
        let manifest: Manifest = [
            row("0.png", "zebra"),
            row("1.png", "zebra"),
            row("2.png", "ant"),
            row("3.png", "moth"),
            row("4.png", "ant"),
        ]
        .into_iter()
        .collect();
        let classes = ClassIndex::new(&manifest);

        assert_eq!(classes.labels(), &["ant", "moth", "zebra"]);
        assert_eq!(classes.first_indices(), &[2, 3, 0]);
    }

    #[test]
    fn test_codes_have_no_gaps() {
        let manifest: Manifest = (0..40)
            .map(|i| row(&format!("{i}.png"), &format!("n{:02}", (i * 7) % 13)))
            .collect();
        let classes = ClassIndex::new(&manifest);
        assert_eq!(classes.num_classes(), 13);

        let mut codes: Vec<usize> = classes
            .labels()
            .iter()
            .map(|l| classes.code(l).unwrap())
            .collect();
        codes.sort_unstable();
        assert_eq!(codes, (1..=13).collect::<Vec<_>>());
    }
}
