//! CSV output format writer.

use crate::constants::output::{
    BBOX_DECIMALS, CONFIDENCE_DECIMALS, EMPTY_CATEGORY, FAILED_CATEGORY,
};
use crate::constants::{EMPTY_LABEL, UTF8_BOM};
use crate::error::{Error, Result};
use crate::output::writer::display_path;
use crate::output::{Detection, ImageResult, OutputWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// CSV format output writer, one row per detection.
pub struct CsvWriter {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
    image_root: Option<PathBuf>,
    topn: usize,
    classification_threshold: f32,
}

impl CsvWriter {
    /// Create a new CSV writer.
    ///
    /// # Arguments
    ///
    /// * `path` - Output file path
    /// * `image_root` - Folder that image paths are written relative to
    /// * `topn` - Number of prediction column pairs
    /// * `classification_threshold` - Score below which the first prediction is `Unknown`
    /// * `include_bom` - Whether to prefix the file with a UTF-8 BOM
    pub fn new(
        path: &Path,
        image_root: Option<&Path>,
        topn: usize,
        classification_threshold: f32,
        include_bom: bool,
    ) -> Result<Self> {
        let file = File::create(path)?;
        let mut buf = BufWriter::new(file);

        if include_bom {
            buf.write_all(UTF8_BOM)?;
        }

        Ok(Self {
            writer: csv::Writer::from_writer(buf),
            path: path.to_path_buf(),
            image_root: image_root.map(Path::to_path_buf),
            topn: topn.max(1),
            classification_threshold,
        })
    }

    fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.writer.write_record(row).map_err(|e| Error::CsvWrite {
            path: self.path.clone(),
            source: e,
        })
    }

    fn detection_row(&self, file: &str, detection: &Detection) -> Vec<String> {
        let bbox = detection.bbox;
        let mut row = vec![
            file.to_string(),
            detection.category.name().to_string(),
            format!("{:.CONFIDENCE_DECIMALS$}", detection.confidence),
            format!("{:.BBOX_DECIMALS$}", bbox.x),
            format!("{:.BBOX_DECIMALS$}", bbox.y),
            format!("{:.BBOX_DECIMALS$}", bbox.width),
            format!("{:.BBOX_DECIMALS$}", bbox.height),
            detection.prediction(self.classification_threshold).to_string(),
        ];

        // The first prediction's score is reported even when it is replaced by `Unknown`.
        match detection.classifications.first() {
            Some(best) => row.push(format!("{:.CONFIDENCE_DECIMALS$}", best.confidence)),
            None => row.push(String::new()),
        }

        for i in 1..self.topn {
            match detection.classifications.get(i) {
                Some(c) => {
                    row.push(c.label.clone());
                    row.push(format!("{:.CONFIDENCE_DECIMALS$}", c.confidence));
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }

        row
    }

    fn placeholder_row(&self, file: &str, category: &str, prediction: &str) -> Vec<String> {
        let mut row = vec![file.to_string(), category.to_string()];
        row.extend(std::iter::repeat_n(String::new(), 5));
        row.push(prediction.to_string());
        row.extend(std::iter::repeat_n(String::new(), self.topn * 2 - 1));
        row
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        let mut header: Vec<String> = [
            "file",
            "detection_category",
            "detection_conf",
            "bbox_x",
            "bbox_y",
            "bbox_w",
            "bbox_h",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        for i in 1..=self.topn {
            header.push(format!("prediction_{i}"));
            header.push(format!("prediction_{i}_conf"));
        }

        self.write_row(&header)
    }

    fn write_image(&mut self, result: &ImageResult) -> Result<()> {
        let file = display_path(&result.file, self.image_root.as_deref());

        if result.failure.is_some() {
            let row = self.placeholder_row(&file, FAILED_CATEGORY, "");
            return self.write_row(&row);
        }

        if result.detections.is_empty() {
            let row = self.placeholder_row(&file, EMPTY_CATEGORY, EMPTY_LABEL);
            return self.write_row(&row);
        }

        for detection in &result.detections {
            let row = self.detection_row(&file, detection);
            self.write_row(&row)?;
        }

        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::output::{BBox, Classification, DetectionCategory};
    use tempfile::NamedTempFile;

    fn dingo_image() -> ImageResult {
        ImageResult {
            file: PathBuf::from("/survey/cam01/IMG_0001.JPG"),
            detections: vec![Detection {
                category: DetectionCategory::Animal,
                confidence: 0.912_34,
                bbox: BBox {
                    x: 0.1,
                    y: 0.2,
                    width: 0.3,
                    height: 0.4,
                },
                classifications: vec![
                    Classification {
                        label_index: 0,
                        label: "Dingo".to_string(),
                        confidence: 0.85,
                    },
                    Classification {
                        label_index: 1,
                        label: "Red Fox, juvenile".to_string(),
                        confidence: 0.1,
                    },
                ],
            }],
            failure: None,
        }
    }

    fn read(file: &NamedTempFile) -> String {
        std::fs::read_to_string(file.path()).unwrap()
    }

    #[test]
    fn test_csv_writer_basic() {
        let file = NamedTempFile::new().unwrap();
        let mut writer =
            CsvWriter::new(file.path(), Some(Path::new("/survey")), 2, 0.5, false).unwrap();

        writer.write_header().unwrap();
        writer.write_image(&dingo_image()).unwrap();
        writer.finalize().unwrap();

        let contents = read(&file);
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "file,detection_category,detection_conf,bbox_x,bbox_y,bbox_w,bbox_h,\
             prediction_1,prediction_1_conf,prediction_2,prediction_2_conf"
        );
        assert_eq!(
            lines.next().unwrap(),
            "cam01/IMG_0001.JPG,animal,0.9123,0.1000,0.2000,0.3000,0.4000,\
             Dingo,0.8500,\"Red Fox, juvenile\",0.1000"
        );
    }

    #[test]
    fn test_csv_writer_unknown_below_threshold() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::new(file.path(), None, 1, 0.9, false).unwrap();

        writer.write_header().unwrap();
        writer.write_image(&dingo_image()).unwrap();
        writer.finalize().unwrap();

        let contents = read(&file);
        assert!(contents.contains(",Unknown,0.8500"));
        assert!(!contents.contains("Dingo"));
    }

    #[test]
    fn test_csv_writer_empty_and_failed_rows() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::new(file.path(), None, 1, 0.5, false).unwrap();

        writer.write_header().unwrap();
        writer
            .write_image(&ImageResult {
                file: PathBuf::from("empty.jpg"),
                detections: Vec::new(),
                failure: None,
            })
            .unwrap();
        writer
            .write_image(&ImageResult::failed(
                PathBuf::from("broken.jpg"),
                "truncated".to_string(),
            ))
            .unwrap();
        writer.finalize().unwrap();

        let contents = read(&file);
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "empty.jpg,empty,,,,,,Empty,");
        assert_eq!(lines[2], "broken.jpg,failed,,,,,,,");
    }

    #[test]
    fn test_csv_writer_bom() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::new(file.path(), None, 1, 0.5, true).unwrap();
        writer.write_header().unwrap();
        writer.finalize().unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);
        assert_eq!(&bytes[3..7], b"file");
    }
}
