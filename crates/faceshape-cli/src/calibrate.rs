//! Accuracy harness: classify a labelled set of faces and compare the run
//! against a recorded baseline.

use crate::config::Config;
use crate::input::read_landmarks;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args};
use faceshape_core::calibration::{Baseline, CalibrationReport, LabelTable, Sample, ShapeStats};
use faceshape_core::{analyze, FaceShape, Point};
use faceshape_vision::{Credential, VisionClient};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["photos", "landmarks"])))]
pub struct CalibrateArgs {
    /// Directory of labelled photos, sent to the Vision API
    #[arg(long, value_name = "DIR")]
    pub photos: Option<PathBuf>,
    /// Directory of labelled landmark files (JSON point arrays or annotate responses)
    #[arg(long, value_name = "DIR")]
    pub landmarks: Option<PathBuf>,
    /// Label table (TOML `[labels]` name = shape); defaults to the bundled reference set
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,
    /// Baseline file to compare against
    #[arg(long, value_name = "FILE")]
    pub baseline: Option<PathBuf>,
    /// Overwrite the baseline with this run instead of comparing
    #[arg(long, requires = "baseline")]
    pub record: bool,
    /// Write per-subject results as JSON
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Cache detected landmarks here and reuse them on later runs
    #[arg(long, value_name = "DIR")]
    pub cache: Option<PathBuf>,
}

/// A labelled input that did not produce a sample.
#[derive(Debug, Clone, Serialize)]
pub struct Skipped {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput<'a> {
    generated_at: DateTime<Utc>,
    correct: usize,
    total: usize,
    accuracy: f64,
    per_shape: &'a BTreeMap<FaceShape, ShapeStats>,
    samples: &'a [Sample],
    skipped: &'a [Skipped],
}

enum Source {
    Photos {
        client: VisionClient,
        credential: Credential,
        cache: Option<PathBuf>,
    },
    Landmarks,
}

pub async fn run(args: CalibrateArgs, config: &Config) -> Result<()> {
    let custom_labels;
    let labels = match &args.labels {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            custom_labels = LabelTable::from_toml_str(&raw)
                .with_context(|| format!("invalid label table {}", path.display()))?;
            &custom_labels
        }
        None => LabelTable::reference(),
    };

    let (dir, source) = match (&args.photos, &args.landmarks) {
        (Some(dir), _) => {
            if let Some(cache) = &args.cache {
                std::fs::create_dir_all(cache)
                    .with_context(|| format!("failed to create {}", cache.display()))?;
            }
            let source = Source::Photos {
                client: config.vision_client()?,
                credential: config.credential()?,
                cache: args.cache.clone(),
            };
            (dir, source)
        }
        (None, Some(dir)) => (dir, Source::Landmarks),
        (None, None) => anyhow::bail!("one of --photos or --landmarks is required"),
    };

    let extensions: &[&str] = match source {
        Source::Photos { .. } => PHOTO_EXTENSIONS,
        Source::Landmarks => &["json"],
    };
    let files = list_inputs(dir, extensions)?;
    tracing::info!(
        dir = %dir.display(),
        files = files.len(),
        labels = labels.len(),
        "starting calibration"
    );

    let mut samples = Vec::new();
    let mut skipped = Vec::new();
    for path in &files {
        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some(expected) = labels.get(&name) else {
            tracing::warn!(file = %path.display(), "no label, skipping");
            continue;
        };

        let points = match source.landmarks(path, &name).await {
            Ok(Some(points)) => points,
            Ok(None) => {
                tracing::warn!(name = %name, "no face detected");
                skipped.push(Skipped {
                    name,
                    reason: "no face detected".into(),
                });
                continue;
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(name = %name, error = %reason, "landmark detection failed");
                skipped.push(Skipped { name, reason });
                continue;
            }
        };

        let analysis = analyze(&points);
        if let Some(reason) = analysis.error {
            tracing::warn!(name = %name, reason = %reason, "classifier fell back");
            skipped.push(Skipped { name, reason });
            continue;
        }
        let Some(ratios) = analysis.ratios else {
            continue;
        };

        let sample = Sample::new(
            name,
            expected,
            analysis.face_shape,
            analysis.matched_rule,
            ratios,
        );
        tracing::info!(
            name = %sample.name,
            expected = %sample.expected,
            predicted = %sample.predicted,
            rule = ?sample.matched_rule,
            correct = sample.is_correct,
            "classified"
        );
        println!("{}", subject_line(&sample));
        samples.push(sample);
    }

    let report = CalibrationReport::from_samples(samples);
    print!(
        "{}",
        Summary {
            report: &report,
            skipped: &skipped,
        }
    );

    let now = Utc::now();
    if let Some(path) = &args.output {
        let output = RunOutput {
            generated_at: now,
            correct: report.correct(),
            total: report.total(),
            accuracy: report.accuracy(),
            per_shape: report.per_shape(),
            samples: report.samples(),
            skipped: &skipped,
        };
        write_json(path, &output)?;
        tracing::info!(path = %path.display(), "wrote results");
    }

    let Some(baseline_path) = &args.baseline else {
        return Ok(());
    };
    if args.record {
        write_json(baseline_path, &report.to_baseline(now))?;
        println!(
            "Recorded baseline {}/{} to {}",
            report.correct(),
            report.total(),
            baseline_path.display()
        );
        return Ok(());
    }
    if !baseline_path.exists() {
        tracing::warn!(path = %baseline_path.display(), "no baseline yet, rerun with --record");
        return Ok(());
    }

    let raw = std::fs::read_to_string(baseline_path)
        .with_context(|| format!("failed to read {}", baseline_path.display()))?;
    let baseline: Baseline = serde_json::from_str(&raw)
        .with_context(|| format!("invalid baseline {}", baseline_path.display()))?;
    report.check_regression(&baseline)?;
    println!(
        "No regression against baseline {}/{} ({:.1}%)",
        baseline.correct,
        baseline.total,
        baseline.accuracy * 100.0
    );
    Ok(())
}

impl Source {
    async fn landmarks(&self, path: &Path, name: &str) -> Result<Option<Vec<Point>>> {
        let (client, credential, cache) = match self {
            Source::Landmarks => return read_landmarks(path).map(Some),
            Source::Photos {
                client,
                credential,
                cache,
            } => (client, credential, cache),
        };

        let cached = cache.as_ref().map(|dir| dir.join(format!("{name}.json")));
        if let Some(cached) = cached.as_ref().filter(|p| p.exists()) {
            tracing::debug!(path = %cached.display(), "using cached landmarks");
            return read_landmarks(cached).map(Some);
        }

        let image =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let points = client.detect_landmarks(credential, &image).await?;
        if let (Some(cached), Some(points)) = (&cached, &points) {
            write_json(cached, points)?;
        }
        Ok(points)
    }
}

/// Files in `dir` with one of `extensions`, sorted by name.
fn list_inputs(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn subject_line(sample: &Sample) -> String {
    let mark = if sample.is_correct { "ok  " } else { "MISS" };
    let rule = sample
        .matched_rule
        .map(|r| format!("rule {r:>2}"))
        .unwrap_or_else(|| "rule  -".into());
    let r = &sample.ratios;
    format!(
        "{mark} {:<18} expected {:<6} got {:<6} {rule}  {}",
        sample.name,
        sample.expected,
        sample.predicted,
        format_args!(
            "w/h {:.2} jaw/face {:.2} fh/jaw {:.2} angle {:.0}",
            r.width_to_height_ratio, r.jaw_to_face_ratio, r.forehead_to_jaw_ratio, r.avg_jaw_angle
        ),
    )
}

/// End-of-run report: accuracy, confusions, averages and skipped inputs.
struct Summary<'a> {
    report: &'a CalibrationReport,
    skipped: &'a [Skipped],
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(
            f,
            "\nAccuracy: {}/{} ({:.1}%)",
            report.correct(),
            report.total(),
            report.accuracy() * 100.0
        )?;

        writeln!(f, "\nPer shape:")?;
        for (shape, stats) in report.per_shape() {
            writeln!(
                f,
                "  {:<7} {}/{} ({:.1}%)  {}",
                shape,
                stats.correct,
                stats.total,
                stats.accuracy() * 100.0,
                shape.label()
            )?;
        }

        let mut confusions: BTreeMap<(FaceShape, FaceShape), Vec<&str>> = BTreeMap::new();
        for sample in report.misclassified() {
            confusions
                .entry((sample.expected, sample.predicted))
                .or_default()
                .push(&sample.name);
        }
        if !confusions.is_empty() {
            writeln!(f, "\nMisclassifications:")?;
            for ((expected, predicted), names) in &confusions {
                writeln!(
                    f,
                    "  {expected} -> {predicted}: {} ({})",
                    names.len(),
                    names.join(", ")
                )?;
            }
        }

        let averages = report.averages_by_expected();
        if !averages.is_empty() {
            writeln!(f, "\nAverages by expected shape:")?;
            for (shape, avg) in &averages {
                writeln!(
                    f,
                    "  {:<7} n={:<3} w/h {:.3} jaw/face {:.3} fh/jaw {:.3} angle {:.1}",
                    shape,
                    avg.count,
                    avg.width_to_height,
                    avg.jaw_to_face,
                    avg.forehead_to_jaw,
                    avg.avg_jaw_angle
                )?;
            }
        }

        if !self.skipped.is_empty() {
            writeln!(f, "\nSkipped {}:", self.skipped.len())?;
            for s in self.skipped {
                writeln!(f, "  {}: {}", s.name, s.reason)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceshape_core::Ratios;

    fn sample(name: &str, expected: FaceShape, predicted: FaceShape) -> Sample {
        let ratios = Ratios {
            width_to_height_ratio: 1.05,
            jaw_to_face_ratio: 0.8,
            forehead_to_jaw_ratio: 0.63,
            avg_jaw_angle: 27.0,
            ..Ratios::default()
        };
        Sample::new(name, expected, predicted, Some(5), ratios)
    }

    #[test]
    fn test_summary() {
        let report = CalibrationReport::from_samples(vec![
            sample("suzy", FaceShape::Oval, FaceShape::Oval),
            sample("iu", FaceShape::Heart, FaceShape::Oval),
            sample("v", FaceShape::Heart, FaceShape::Oval),
            sample("gong-yoo", FaceShape::Oblong, FaceShape::Oblong),
        ]);
        let skipped = [Skipped {
            name: "jennie".into(),
            reason: "no face detected".into(),
        }];
        let text = Summary {
            report: &report,
            skipped: &skipped,
        }
        .to_string();
        assert!(text.contains("Accuracy: 2/4 (50.0%)"));
        assert!(text.contains("heart   0/2 (0.0%)  역삼각형"));
        assert!(text.contains("heart -> oval: 2 (iu, v)"));
        assert!(text.contains("jennie: no face detected"));
    }

    #[test]
    fn test_subject_line() {
        let line = subject_line(&sample("iu", FaceShape::Heart, FaceShape::Oval));
        assert!(line.starts_with("MISS iu"));
        assert!(line.contains("rule  5"));
        assert!(line.contains("w/h 1.05"));
    }

    #[test]
    fn test_list_inputs_filters_and_sorts() {
        let dir = std::env::temp_dir().join(format!("faceshape-list-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for file in ["b.json", "a.JSON", "notes.txt", "c.jpg"] {
            std::fs::write(dir.join(file), "[]").unwrap();
        }
        let files = list_inputs(&dir, &["json"]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
