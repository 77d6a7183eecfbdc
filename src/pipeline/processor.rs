//! Detection and classification over a set of images.

use crate::constants::output::{CSV_EXTENSION, JSON_EXTENSION};
use crate::error::{Error, Result};
use crate::inference::{Classifier, Detector, open_image, top_n};
use crate::output::{
    Classification, CsvWriter, DetectionCategory, ImageResult, JsonInfo, JsonResultWriter,
    OutputWriter, progress,
};
use crate::pipeline::with_appended_extension;
use image::DynamicImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for a single `predict` run.
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Number of crops per classifier call.
    pub batch_size: usize,
    /// Number of classifications kept per crop.
    pub topn: usize,
    /// Output path without extension; `.csv` and `.json` are appended.
    pub output_base: PathBuf,
    /// Folder that output paths are written relative to.
    pub image_root: Option<PathBuf>,
    /// Whether to show a progress bar.
    pub show_progress: bool,
    /// Whether to prefix the CSV with a UTF-8 BOM.
    pub csv_bom: bool,
    /// Abort on the first image that cannot be decoded.
    pub fail_fast: bool,
    /// Run metadata for the JSON output.
    pub json_info: JsonInfo,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default)]
pub struct PredictSummary {
    /// Number of images with a result (including failures).
    pub images: usize,
    /// Number of images that could not be processed.
    pub failed: usize,
    /// Number of detections across all images.
    pub detections: usize,
    /// Number of animal crops sent to the classifier.
    pub classified: usize,
    /// Count of reported predictions per label.
    pub label_counts: BTreeMap<String, usize>,
    /// Wall-clock duration in seconds.
    pub duration_secs: f64,
    /// Whether the run was stopped early by an interrupt.
    pub interrupted: bool,
    /// Path of the CSV output.
    pub csv_path: PathBuf,
    /// Path of the JSON output.
    pub json_path: PathBuf,
}

/// A queued animal crop waiting for a classifier batch.
struct PendingCrop {
    image: usize,
    detection: usize,
    crop: DynamicImage,
}

/// Detects objects in images and classifies the animal crops.
pub struct DetectAndClassify<D: Detector, C: Classifier> {
    detector: D,
    classifier: C,
    labels: Vec<String>,
    detection_threshold: f32,
    classification_threshold: f32,
    cancel: Option<Arc<AtomicBool>>,
}

impl<D: Detector, C: Classifier> DetectAndClassify<D, C> {
    /// Combine a detector and classifier.
    ///
    /// Fails with `LabelMismatch` when the classifier width differs from the label count.
    pub fn new(
        detector: D,
        classifier: C,
        labels: Vec<String>,
        detection_threshold: f32,
        classification_threshold: f32,
    ) -> Result<Self> {
        if classifier.num_classes() != labels.len() {
            return Err(Error::LabelMismatch {
                outputs: classifier.num_classes(),
                labels: labels.len(),
            });
        }

        Ok(Self {
            detector,
            classifier,
            labels,
            detection_threshold,
            classification_threshold,
            cancel: None,
        })
    }

    /// Stop processing new images once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Process `images` in order and write the CSV and JSON outputs.
    pub fn predict(
        &mut self,
        images: &[PathBuf],
        options: &PredictOptions,
    ) -> Result<PredictSummary> {
        let start_time = Instant::now();
        let batch_size = options.batch_size.max(1);

        let mut results: Vec<ImageResult> = Vec::with_capacity(images.len());
        let mut pending: Vec<PendingCrop> = Vec::with_capacity(batch_size);
        let mut classified = 0;
        let mut interrupted = false;

        let pb = progress::create_image_progress(images.len(), options.show_progress);

        for path in images {
            if self.cancelled() {
                progress::suspend(pb.as_ref(), || {
                    warn!("Interrupted, writing results for processed images");
                });
                interrupted = true;
                break;
            }

            let image = match open_image(path) {
                Ok(image) => image,
                Err(e) if options.fail_fast => return Err(e),
                Err(e) => {
                    let reason = e.chain();
                    progress::suspend(pb.as_ref(), || {
                        warn!("Skipping {}: {reason}", path.display());
                    });
                    results.push(ImageResult::failed(path.clone(), reason));
                    progress::inc_progress(pb.as_ref());
                    continue;
                }
            };

            let mut detections = self.detector.detect(&image)?;
            detections.retain(|d| d.confidence >= self.detection_threshold);
            progress::suspend(pb.as_ref(), || {
                debug!("{}: {} detection(s)", path.display(), detections.len());
            });

            let image_index = results.len();
            for (detection_index, detection) in detections.iter().enumerate() {
                if detection.category != DetectionCategory::Animal {
                    continue;
                }
                let (x, y, w, h) = detection.bbox.to_pixels(image.width(), image.height());
                pending.push(PendingCrop {
                    image: image_index,
                    detection: detection_index,
                    crop: image.crop_imm(x, y, w, h),
                });
            }

            results.push(ImageResult {
                file: path.clone(),
                detections,
                failure: None,
            });

            while pending.len() >= batch_size {
                let batch: Vec<PendingCrop> = pending.drain(..batch_size).collect();
                classified += self.classify_batch(&batch, &mut results, options.topn)?;
            }
            progress::inc_progress(pb.as_ref());
        }

        classified += self.classify_batch(&pending, &mut results, options.topn)?;
        progress::finish_progress(pb, "Processing complete");

        let csv_path = with_appended_extension(&options.output_base, CSV_EXTENSION);
        let json_path = with_appended_extension(&options.output_base, JSON_EXTENSION);
        self.write_outputs(&results, options, &csv_path, &json_path)?;

        let mut label_counts = BTreeMap::new();
        for result in &results {
            for label in result.predictions(self.classification_threshold) {
                *label_counts.entry(label.to_string()).or_insert(0) += 1;
            }
        }

        Ok(PredictSummary {
            images: results.len(),
            failed: results.iter().filter(|r| r.failure.is_some()).count(),
            detections: results.iter().map(|r| r.detections.len()).sum(),
            classified,
            label_counts,
            duration_secs: start_time.elapsed().as_secs_f64(),
            interrupted,
            csv_path,
            json_path,
        })
    }

    /// Classify queued crops and attach the top-n labels to their detections.
    fn classify_batch(
        &mut self,
        pending: &[PendingCrop],
        results: &mut [ImageResult],
        topn: usize,
    ) -> Result<usize> {
        if pending.is_empty() {
            return Ok(0);
        }

        let crops: Vec<DynamicImage> = pending.iter().map(|p| p.crop.clone()).collect();
        let scores = self.classifier.classify(&crops)?;
        debug!("Classified batch of {} crop(s)", crops.len());

        for (queued, crop_scores) in pending.iter().zip(&scores) {
            if crop_scores.len() != self.labels.len() {
                return Err(Error::LabelMismatch {
                    outputs: crop_scores.len(),
                    labels: self.labels.len(),
                });
            }

            let classifications = top_n(crop_scores, topn)
                .into_iter()
                .map(|(index, confidence)| Classification {
                    label_index: index,
                    label: self.labels[index].clone(),
                    confidence,
                })
                .collect();

            if let Some(detection) = results
                .get_mut(queued.image)
                .and_then(|r| r.detections.get_mut(queued.detection))
            {
                detection.classifications = classifications;
            }
        }

        Ok(pending.len())
    }

    fn write_outputs(
        &self,
        results: &[ImageResult],
        options: &PredictOptions,
        csv_path: &Path,
        json_path: &Path,
    ) -> Result<()> {
        let image_root = options.image_root.as_deref();
        let mut writers: Vec<Box<dyn OutputWriter>> = vec![
            Box::new(CsvWriter::new(
                csv_path,
                image_root,
                options.topn,
                self.classification_threshold,
                options.csv_bom,
            )?),
            Box::new(JsonResultWriter::new(
                json_path,
                image_root,
                options.json_info.clone(),
                &self.labels,
            )),
        ];

        for writer in &mut writers {
            writer.write_header()?;
            for result in results {
                writer.write_image(result)?;
            }
            writer.finalize()?;
        }

        info!(
            "Wrote {} image result(s) to {} and {}",
            results.len(),
            csv_path.display(),
            json_path.display()
        );
        Ok(())
    }
}
