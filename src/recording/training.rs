//! CSV writer for self-play training examples.
//!
//! Format: game_id,move_number,planes,size,f_0..f_{k-1},pi_0..pi_{squares},outcome
//! One file holds examples of a single board size and feature set.

use std::fs::{self, File};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use crate::neural::features::BoardTensor;

/// One (features, search policy, outcome) example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub move_number: u32,
    pub features: BoardTensor,
    pub pi: Vec<f32>,
    /// +1 if the player to move went on to win, -1 if they lost, 0 for a draw.
    pub outcome: f32,
}

pub struct TrainingExampleWriter {
    writer: csv::Writer<File>,
    header_written: bool,
    rows: usize,
}

impl TrainingExampleWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, csv::Error> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
            header_written: false,
            rows: 0,
        })
    }

    /// Fresh identifier for a game's rows.
    pub fn new_game_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn write_header(&mut self, example: &TrainingExample) -> Result<(), csv::Error> {
        let mut header: Vec<String> = vec![
            "game_id".into(),
            "move_number".into(),
            "planes".into(),
            "size".into(),
        ];
        header.extend((0..example.features.data.len()).map(|i| format!("f_{}", i)));
        header.extend((0..example.pi.len()).map(|i| format!("pi_{}", i)));
        header.push("outcome".into());
        self.writer.write_record(&header)?;
        self.header_written = true;
        Ok(())
    }

    /// Writes every example of one game under `game_id`.
    pub fn write_game(&mut self, game_id: &str, examples: &[TrainingExample]) -> Result<(), csv::Error> {
        for example in examples {
            if !self.header_written {
                self.write_header(example)?;
            }
            let mut row: Vec<String> = vec![
                game_id.to_string(),
                example.move_number.to_string(),
                example.features.planes.to_string(),
                example.features.size.to_string(),
            ];
            row.extend(example.features.data.iter().map(|v| v.to_string()));
            row.extend(example.pi.iter().map(|v| v.to_string()));
            row.push(example.outcome.to_string());
            self.writer.write_record(&row)?;
            self.rows += 1;
        }
        self.writer.flush()?;
        log::debug!("wrote {} examples for game {}", examples.len(), game_id);
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Failure to read back a training CSV.
#[derive(Debug, Error)]
pub enum LoadExamplesError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("row {row}: {field} is not a valid number: {value:?}")]
    BadField {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: expected {expected} fields for {planes} planes on size {size}, found {got}")]
    FieldCount {
        row: usize,
        planes: usize,
        size: usize,
        expected: usize,
        got: usize,
    },
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    row: usize,
    index: usize,
    field: &'static str,
) -> Result<T, LoadExamplesError> {
    let raw = record.get(index).unwrap_or("");
    raw.trim().parse().map_err(|_| LoadExamplesError::BadField {
        row,
        field,
        value: raw.to_string(),
    })
}

/// Reads back examples written by [`TrainingExampleWriter`], keyed by game id.
///
/// Any row with a non-numeric value or the wrong number of fields fails the whole load.
pub fn load_examples<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<(String, TrainingExample)>, LoadExamplesError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut examples = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let game_id = record.get(0).unwrap_or("").to_string();
        let move_number: u32 = parse_field(&record, row, 1, "move_number")?;
        let planes: usize = parse_field(&record, row, 2, "planes")?;
        let size: usize = parse_field(&record, row, 3, "size")?;

        let feature_len = planes * size * size;
        let policy_len = size * size + 1;
        let expected = 4 + feature_len + policy_len + 1;
        if record.len() != expected {
            return Err(LoadExamplesError::FieldCount {
                row,
                planes,
                size,
                expected,
                got: record.len(),
            });
        }

        let pi_start = 4 + feature_len;
        let data = (4..pi_start)
            .map(|i| parse_field(&record, row, i, "feature"))
            .collect::<Result<Vec<f32>, _>>()?;
        let pi = (pi_start..pi_start + policy_len)
            .map(|i| parse_field(&record, row, i, "pi"))
            .collect::<Result<Vec<f32>, _>>()?;
        let outcome: f32 = parse_field(&record, row, pi_start + policy_len, "outcome")?;

        examples.push((
            game_id,
            TrainingExample {
                move_number,
                features: BoardTensor { planes, size, data },
                pi,
                outcome,
            },
        ));
    }
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(move_number: u32, outcome: f32) -> TrainingExample {
        let mut features = BoardTensor::zeros(3, 3);
        features.set(0, 1, 1, 1.0);
        let mut pi = vec![0.0; 10];
        pi[4] = 0.5;
        pi[9] = 0.5;
        TrainingExample {
            move_number,
            features,
            pi,
            outcome,
        }
    }

    #[test]
    fn test_write_and_load_game() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfplay").join("examples.csv");
        let game_id = TrainingExampleWriter::new_game_id();

        let mut writer = TrainingExampleWriter::create(&path).unwrap();
        writer
            .write_game(&game_id, &[example(0, 1.0), example(1, -1.0)])
            .unwrap();
        assert_eq!(writer.rows(), 2);
        drop(writer);

        let loaded = load_examples(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, game_id);
        assert_eq!(loaded[0].1, example(0, 1.0));
        assert_eq!(loaded[1].1.outcome, -1.0);
    }

    #[test]
    fn test_load_rejects_garbage_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(
            &path,
            "game_id,move_number,planes,size,f_0,pi_0,pi_1,outcome\ng,1,1,oops,nan?,zz,0.5,WIN\n",
        )
        .unwrap();
        assert!(matches!(
            load_examples(&path),
            Err(LoadExamplesError::BadField { row: 0, field: "size", .. })
        ));
    }

    #[test]
    fn test_load_rejects_truncated_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.csv");
        let mut writer = TrainingExampleWriter::create(&path).unwrap();
        writer.write_game("g", &[example(0, 1.0)]).unwrap();
        drop(writer);

        let text = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        let cut = lines[1].rfind(',').unwrap();
        lines[1].truncate(cut);
        fs::write(&path, lines.join("\n")).unwrap();

        assert!(matches!(
            load_examples(&path),
            Err(LoadExamplesError::FieldCount { row: 0, planes: 3, size: 3, expected: 42, got: 41 })
        ));
    }

    #[test]
    fn test_load_rejects_non_numeric_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.csv");
        let mut writer = TrainingExampleWriter::create(&path).unwrap();
        writer.write_game("g", &[example(0, 1.0)]).unwrap();
        drop(writer);

        let text = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        let cut = lines[1].rfind(',').unwrap();
        lines[1].truncate(cut);
        lines[1].push_str(",WIN");
        fs::write(&path, lines.join("\n")).unwrap();

        assert!(matches!(
            load_examples(&path),
            Err(LoadExamplesError::BadField { field: "outcome", .. })
        ));
    }

    #[test]
    fn test_game_ids_are_unique() {
        assert_ne!(
            TrainingExampleWriter::new_game_id(),
            TrainingExampleWriter::new_game_id()
        );
    }
}
