use std::path::{Path, PathBuf};

use hawkeye_3d::boxes::Box3d;

/// Minimum number of numeric tokens following the class token of a label record.
pub const MIN_NUMERIC_TOKENS: usize = 14;

/// Name of the label directory inside a sample directory.
pub const LABEL_DIR: &str = "labels";

/// Error types for label parsing.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    /// Failed to read the label file
    #[error("Failed to read the label file. {0}")]
    Io(#[from] std::io::Error),

    /// The label file does not exist
    #[error("Label file does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// A record has fewer numeric tokens than required
    #[error("Label record has {found} numeric tokens, expected at least 14")]
    TooFewTokens {
        /// Number of numeric tokens found
        found: usize,
    },

    /// A numeric token could not be parsed
    #[error("Invalid number in label record: {0:?}")]
    InvalidNumber(String),

    /// A record failed to parse
    #[error("{path}:{line}: {source}")]
    AtLine {
        /// The label file
        path: PathBuf,
        /// The 1-based line number
        line: usize,
        /// The underlying error
        #[source]
        source: Box<LabelError>,
    },
}

/// The label file of a sample: `<sample dir>/labels/<stem>.txt`.
pub fn label_path_for(sample_path: &Path) -> Option<PathBuf> {
    let stem = sample_path.file_stem()?;
    let dir = sample_path.parent().unwrap_or_else(|| Path::new(""));
    let mut path = dir.join(LABEL_DIR).join(stem);
    path.set_extension("txt");
    Some(path)
}

/// Parse one KITTI label record into a camera frame box.
///
/// The line is lower-cased and trimmed. Blank lines and records whose class differs
/// from `target_class` yield `Ok(None)`; those records are not checked any further.
/// For the target class the numeric tokens at positions 8 to 14 hold
/// `h, w, l, x, y, z, ry`.
///
/// # Example
///
/// ```
/// use hawkeye_data::label::parse_label_line;
///
/// let line = "Car 0.00 0 -1.58 587 173 614 200 1.65 1.67 3.64 -0.65 1.71 46.70 -1.59";
/// let b = parse_label_line(line, "car").unwrap().unwrap();
/// assert_eq!(b.to_array(), [-0.65, 1.71, 46.70, 1.65, 1.67, 3.64, -1.59]);
/// ```
pub fn parse_label_line(line: &str, target_class: &str) -> Result<Option<Box3d>, LabelError> {
    let line = line.trim().to_lowercase();
    let mut tokens = line.split_whitespace();
    let Some(class) = tokens.next() else {
        return Ok(None);
    };
    if class != target_class.to_lowercase() {
        return Ok(None);
    }

    let values = tokens
        .map(|t| match t.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(LabelError::InvalidNumber(t.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() < MIN_NUMERIC_TOKENS {
        return Err(LabelError::TooFewTokens {
            found: values.len(),
        });
    }

    Ok(Some(Box3d {
        x: values[10],
        y: values[11],
        z: values[12],
        h: values[7],
        w: values[8],
        l: values[9],
        heading: values[13],
    }))
}

/// Parse the content of a label file, keeping the `target_class` records in order.
pub fn parse_labels(content: &str, target_class: &str) -> Result<Vec<Box3d>, LabelError> {
    parse_labels_at(Path::new(""), content, target_class)
}

fn parse_labels_at(
    path: &Path,
    content: &str,
    target_class: &str,
) -> Result<Vec<Box3d>, LabelError> {
    let mut boxes = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let parsed = parse_label_line(line, target_class).map_err(|e| LabelError::AtLine {
            path: path.to_path_buf(),
            line: i + 1,
            source: Box::new(e),
        })?;
        boxes.extend(parsed);
    }
    Ok(boxes)
}

/// Read a label file and keep the `target_class` records.
pub fn read_labels(path: impl AsRef<Path>, target_class: &str) -> Result<Vec<Box3d>, LabelError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LabelError::FileDoesNotExist(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_labels_at(path, &content, target_class)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR: &str = "Car 0 0 0 0 0 0 0 1.5 1.6 4.0 0 0 0 0.2";

    #[test]
    fn label_path_is_inside_the_sample_dir() {
        let p = label_path_for(Path::new("/data/train/000042.bin"));
        assert_eq!(p, Some(PathBuf::from("/data/train/labels/000042.txt")));
        assert_eq!(label_path_for(Path::new("/")), None);
    }

    #[test]
    fn parses_target_class_fields() -> Result<(), LabelError> {
        let b = parse_label_line(CAR, "car")?;
        assert_eq!(
            b.map(|b| b.to_array()),
            Some([0.0, 0.0, 0.0, 1.5, 1.6, 4.0, 0.2])
        );
        Ok(())
    }

    #[test]
    fn other_classes_are_skipped_unchecked() -> Result<(), LabelError> {
        assert!(parse_label_line("DontCare -1 -1 -10 503 169 590 190", "car")?.is_none());
        assert!(parse_label_line("Pedestrian x", "car")?.is_none());
        assert!(parse_label_line("   ", "car")?.is_none());
        Ok(())
    }

    #[test]
    fn class_match_is_case_insensitive() -> Result<(), LabelError> {
        assert!(parse_label_line(&CAR.to_uppercase(), "Car")?.is_some());
        Ok(())
    }

    #[test]
    fn thirteen_number_example_line_has_too_few_fields() {
        // the heading is the 14th number, so this record cannot be read
        let res = parse_label_line("Car 0 0 0 0 0 0 1.5 1.6 4.0 0 0 0 0.2", "car");
        assert!(matches!(res, Err(LabelError::TooFewTokens { found: 13 })));
    }

    #[test]
    fn unparsable_numbers_are_fatal() {
        let res = parse_label_line("Car 0 0 0 0 0 0 0 1.5 abc 4.0 0 0 0 0.2", "car");
        assert!(matches!(res, Err(LabelError::InvalidNumber(t)) if t == "abc"));
    }

    #[test]
    fn non_finite_numbers_are_fatal() {
        for heading in ["inf", "-inf", "NaN"] {
            let line = format!("Car 0 0 0 0 0 0 0 1.5 1.6 4.0 0 0 0 {heading}");
            let res = parse_label_line(&line, "car");
            assert!(
                matches!(&res, Err(LabelError::InvalidNumber(t)) if t.eq_ignore_ascii_case(heading)),
                "{heading}: {res:?}"
            );
        }
        // large but finite headings are kept
        let b = parse_label_line("Car 0 0 0 0 0 0 0 1.5 1.6 4.0 0 0 0 1e10", "car");
        assert!(matches!(b, Ok(Some(_))));
    }

    #[test]
    fn errors_carry_the_line_number() {
        let content = format!("{CAR}\n\nCar 1 2\n");
        match parse_labels(&content, "car") {
            Err(LabelError::AtLine { line, source, .. }) => {
                assert_eq!(line, 3);
                assert!(matches!(*source, LabelError::TooFewTokens { found: 2 }));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn read_labels_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("000001.txt");
        std::fs::write(&path, format!("{CAR}\nDontCare -1 -1\n{CAR}\n"))?;
        assert_eq!(read_labels(&path, "car")?.len(), 2);
        assert!(read_labels(&path, "cyclist")?.is_empty());

        let missing = read_labels(dir.path().join("nope.txt"), "car");
        assert!(matches!(missing, Err(LabelError::FileDoesNotExist(_))));
        Ok(())
    }
}
