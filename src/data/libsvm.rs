//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! Indices are kept as written and must be strictly increasing. Index 0 is
//! accepted; precomputed-kernel data stores the example's serial number
//! there.

use crate::core::{Dataset, Problem, Result, SVMError, SparseVector};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset implementation for LibSVM format files
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    problem: Problem,
    dimensions: usize,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut labels = Vec::new();
        let mut vectors = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, vector) = Self::parse_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            labels.push(label);
            vectors.push(vector);
        }

        if labels.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let problem = Problem::new(labels, vectors)?;
        let dimensions = problem.max_index();
        Ok(LibSVMDataset {
            problem,
            dimensions,
        })
    }

    /// Parse a single line in libsvm format
    fn parse_line(line: &str) -> Result<(f64, SparseVector)> {
        let mut parts = line.split_whitespace();

        let label_str = parts
            .next()
            .ok_or_else(|| SVMError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid label: {}", label_str)))?;

        Ok((label, parse_features(parts)?))
    }

    /// The parsed examples as a training problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn into_problem(self) -> Problem {
        self.problem
    }
}

/// Parse `index:value` tokens with strictly increasing indices
pub(crate) fn parse_features<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<SparseVector> {
    let mut indices = Vec::new();
    let mut values = Vec::new();

    for feature_str in tokens {
        let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
            SVMError::ParseError(format!("Invalid feature format: {}", feature_str))
        })?;

        let index = index_str
            .parse::<usize>()
            .map_err(|_| SVMError::ParseError(format!("Invalid feature index: {}", index_str)))?;
        let value = value_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid feature value: {}", value_str)))?;

        if indices.last().is_some_and(|&last| index <= last) {
            return Err(SVMError::ParseError(format!(
                "Feature indices must be strictly increasing: {} after {}",
                index,
                indices.last().copied().unwrap_or_default()
            )));
        }
        indices.push(index);
        values.push(value);
    }

    Ok(SparseVector { indices, values })
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.problem.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn label(&self, i: usize) -> f64 {
        self.problem.label(i)
    }

    fn vector(&self, i: usize) -> &SparseVector {
        self.problem.vector(i)
    }

    fn get_labels(&self) -> Vec<f64> {
        self.problem.labels().to_vec()
    }

    fn to_problem(&self) -> Problem {
        self.problem.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_basic() {
        let (label, vector) = LibSVMDataset::parse_line("+1 1:0.5 3:1.2").unwrap();

        assert_eq!(label, 1.0);
        assert_eq!(vector.indices, vec![1, 3]);
        assert_eq!(vector.values, vec![0.5, 1.2]);
    }

    #[test]
    fn test_parse_line_keeps_labels() {
        let (label, _) = LibSVMDataset::parse_line("3 1:1.0").unwrap();
        assert_eq!(label, 3.0);

        let (label, vector) = LibSVMDataset::parse_line("-2.5").unwrap();
        assert_eq!(label, -2.5);
        assert!(vector.is_empty());
    }

    #[test]
    fn test_parse_line_invalid_format() {
        assert!(LibSVMDataset::parse_line("+1 1").is_err());
        assert!(LibSVMDataset::parse_line("+1 abc:1.0").is_err());
        assert!(LibSVMDataset::parse_line("+1 1:abc").is_err());
        assert!(LibSVMDataset::parse_line("one 1:1.0").is_err());
        // Indices must increase
        assert!(LibSVMDataset::parse_line("+1 3:1.0 2:1.0").is_err());
        assert!(LibSVMDataset::parse_line("+1 2:1.0 2:1.0").is_err());
    }

    #[test]
    fn test_precomputed_serial_index() {
        let (_, vector) = LibSVMDataset::parse_line("1 0:1 1:4.0 2:0.5").unwrap();
        assert_eq!(vector.indices, vec![0, 1, 2]);
        assert_eq!(crate::kernel::serial_number(&vector), Some(1));
    }

    #[test]
    fn test_from_reader_basic() {
        let data = "+1 1:0.5 3:1.2\n-1 2:0.3 5:2.1\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
        assert_eq!(dataset.vector(0).indices, vec![1, 3]);
        assert_eq!(dataset.vector(1).get(5), 2.1);
    }

    #[test]
    fn test_from_reader_empty_lines_and_comments() {
        let data = "# Comment line\n+1 1:0.5\n\n# Another comment\n-1 2:0.3\n";
        let dataset = LibSVMDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get_labels(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_from_reader_empty_dataset() {
        let result = LibSVMDataset::from_reader(Cursor::new("# Only comments\n\n"));
        assert!(matches!(result, Err(SVMError::EmptyDataset)));
    }

    #[test]
    fn test_from_reader_reports_line_number() {
        let result = LibSVMDataset::from_reader(Cursor::new("+1 1:0.5\n-1 x:1\n"));
        match result {
            Err(SVMError::ParseError(message)) => assert!(message.contains("line 2")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:0.5 3:1.2").expect("Failed to write");
        writeln!(temp_file, "-1 2:0.3 5:2.1").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let dataset = LibSVMDataset::from_file(temp_file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.into_problem().labels(), &[1.0, -1.0]);
    }

    #[test]
    fn test_from_file_io_error() {
        let result = LibSVMDataset::from_file("/non/existent/file.libsvm");
        assert!(matches!(result.unwrap_err(), SVMError::IoError(_)));
    }
}
