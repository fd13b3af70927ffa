//! File-level driver around the [`Normalizer`].
//!
//! Reads uploads from disk, runs each through [`Normalizer::process`], and
//! optionally writes the normalized PNG next to the input (or into a shared
//! output directory). Files are processed in parallel on the rayon pool; the
//! returned reports keep input order.
//!
//! A file that cannot be read or written fails on its own report. The batch
//! as a whole only errors while collecting inputs.

use crate::imaging::{BackendError, ImageBackend, supported_input_extensions};
use crate::normalize::{ErrorKind, Normalized, Normalizer, Report};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("input not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot walk directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Encode(#[from] BackendError),
    #[error("refusing to overwrite input {0}")]
    WouldOverwriteInput(PathBuf),
}

/// Where normalized PNGs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub filename_prefix: String,
    /// `None` writes next to each input.
    pub directory: Option<PathBuf>,
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Expand the command-line paths into the list of files to process.
///
/// Files are taken as given, whatever their extension. Directories are walked
/// recursively in file-name order and contribute only files with a decodable
/// extension.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(BatchError::NotFound(path.clone()));
        }
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && has_supported_extension(entry.path()) {
                    inputs.push(entry.into_path());
                }
            }
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

/// `<dir>/<prefix><stem>.png` for an input file.
pub fn output_path(input: &Path, options: &WriteOptions) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = options
        .directory
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}{}.png", options.filename_prefix, stem))
}

/// Name shown in messages and reports.
fn display_name(input: &Path) -> String {
    input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}

/// Encode `normalized` as PNG and write it to `output`.
pub fn write_png<B: ImageBackend>(
    normalizer: &Normalizer<B>,
    normalized: &Normalized,
    input: &Path,
    output: &Path,
) -> Result<(), BatchError> {
    if output == input {
        return Err(BatchError::WouldOverwriteInput(input.to_path_buf()));
    }
    let png = normalizer.encode_png(normalized)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| BatchError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(output, png).map_err(|source| BatchError::Io {
        path: output.to_path_buf(),
        source,
    })
}

/// Log a failure raised outside the normalizer and turn it into a report.
fn failed<B: ImageBackend>(
    normalizer: &Normalizer<B>,
    filename: &str,
    kind: ErrorKind,
    err: BatchError,
) -> Report {
    tracing::dispatcher::with_default(normalizer.dispatch(), || {
        error!(file = filename, kind = ?kind, "{err}");
    });
    Report::failure(filename, Some(kind), err.to_string())
}

/// Normalize one file and, with `write` set, save the PNG.
pub fn process_file<B: ImageBackend>(
    normalizer: &Normalizer<B>,
    input: &Path,
    category: &str,
    write: Option<&WriteOptions>,
) -> Report {
    let filename = display_name(input);
    let bytes = match fs::read(input) {
        Ok(bytes) => bytes,
        Err(source) => {
            let err = BatchError::Io {
                path: input.to_path_buf(),
                source,
            };
            return failed(normalizer, &filename, ErrorKind::ReadFailed, err);
        }
    };

    let result = normalizer.process(&filename, &bytes, category);
    let mut report = Report::from_result(&filename, &result);

    if let (Ok(done), Some(options)) = (&result, write) {
        let output = output_path(input, options);
        match write_png(normalizer, done, input, &output) {
            Ok(()) => report.output = Some(output.display().to_string()),
            Err(err) => return failed(normalizer, &filename, ErrorKind::WriteFailed, err),
        }
    }
    report
}

/// Process every input in parallel. Reports come back in input order.
pub fn run<B: ImageBackend>(
    normalizer: &Normalizer<B>,
    inputs: &[PathBuf],
    category: &str,
    write: Option<&WriteOptions>,
) -> Vec<Report> {
    inputs
        .par_iter()
        .map(|input| process_file(normalizer, input, category, write))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundsTable;
    use crate::test_helpers::{CapturedLogs, write_png as write_fixture};
    use tempfile::TempDir;

    fn normalizer() -> Normalizer {
        logged_normalizer().0
    }

    fn logged_normalizer() -> (Normalizer, CapturedLogs) {
        let logs = CapturedLogs::default();
        let normalizer = Normalizer::new(BoundsTable::standard().unwrap(), logs.dispatch());
        (normalizer, logs)
    }

    fn options(directory: Option<PathBuf>) -> WriteOptions {
        WriteOptions {
            filename_prefix: "resized_".into(),
            directory,
        }
    }

    // =========================================================================
    // collect_inputs
    // =========================================================================

    #[test]
    fn collect_walks_directories_in_name_order() {
        let tmp = TempDir::new().unwrap();
        write_fixture(&tmp.path().join("b.png"), 10, 10);
        write_fixture(&tmp.path().join("a.PNG"), 10, 10);
        fs::write(tmp.path().join("notes.txt"), "skip me").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        write_fixture(&tmp.path().join("sub/c.jpg"), 10, 10);

        let inputs = collect_inputs(&[tmp.path().to_path_buf()]).unwrap();
        let names: Vec<String> = inputs.iter().map(|p| display_name(p)).collect();

        assert_eq!(names, vec!["a.PNG", "b.png", "c.jpg"]);
    }

    #[test]
    fn collect_keeps_explicit_files_regardless_of_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("upload.bin");
        fs::write(&path, b"whatever").unwrap();

        let inputs = collect_inputs(std::slice::from_ref(&path)).unwrap();
        assert_eq!(inputs, vec![path]);
    }

    #[test]
    fn collect_missing_path_errors() {
        let result = collect_inputs(&[PathBuf::from("/nonexistent/upload.png")]);
        assert!(matches!(result, Err(BatchError::NotFound(_))));
    }

    // =========================================================================
    // output_path
    // =========================================================================

    #[test]
    fn output_path_next_to_input() {
        let path = output_path(Path::new("/uploads/me.jpg"), &options(None));
        assert_eq!(path, PathBuf::from("/uploads/resized_me.png"));
    }

    #[test]
    fn output_path_in_shared_directory() {
        let path = output_path(
            Path::new("/uploads/me.jpg"),
            &options(Some(PathBuf::from("/out"))),
        );
        assert_eq!(path, PathBuf::from("/out/resized_me.png"));
    }

    // =========================================================================
    // run
    // =========================================================================

    #[test]
    fn run_writes_normalized_pngs() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("sig.png");
        write_fixture(&input, 100, 50);
        let out_dir = tmp.path().join("out");

        let reports = run(
            &normalizer(),
            std::slice::from_ref(&input),
            "signature",
            Some(&options(Some(out_dir.clone()))),
        );

        assert_eq!(reports.len(), 1);
        assert!(reports[0].success, "{:?}", reports[0].error);
        let written = out_dir.join("resized_sig.png");
        assert_eq!(reports[0].output.as_deref(), Some(&*written.display().to_string()));
        assert_eq!(image::image_dimensions(&written).unwrap(), (354, 177));
    }

    #[test]
    fn run_without_write_leaves_disk_untouched() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("sig.png");
        write_fixture(&input, 100, 50);

        let reports = run(&normalizer(), std::slice::from_ref(&input), "signature", None);

        assert!(reports[0].success);
        assert_eq!(reports[0].output, None);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn run_keeps_order_and_isolates_failures() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.png");
        let empty = tmp.path().join("empty.png");
        let missing = tmp.path().join("missing.png");
        write_fixture(&good, 400, 500);
        fs::write(&empty, b"").unwrap();

        let reports = run(
            &normalizer(),
            &[good, empty, missing],
            "portrait-photo",
            None,
        );

        assert_eq!(reports.len(), 3);
        assert!(reports[0].success);
        assert_eq!(reports[0].resized_size, Some((400, 500)));
        assert_eq!(reports[1].error_kind, Some(ErrorKind::EmptyInput));
        assert!(!reports[2].success);
        assert_eq!(reports[2].error_kind, Some(ErrorKind::ReadFailed));
        assert!(reports[2].error.is_some());
    }

    #[test]
    fn read_failure_is_logged() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone.png");
        let (normalizer, logs) = logged_normalizer();

        let reports = run(&normalizer, &[missing], "signature", None);

        assert_eq!(reports[0].error_kind, Some(ErrorKind::ReadFailed));
        let text = logs.contents();
        assert!(text.contains("ERROR"));
        assert!(text.contains("gone.png"));
    }

    #[test]
    fn write_failure_is_a_plain_failure_and_logged() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("sig.png");
        write_fixture(&input, 100, 50);
        // A regular file where the output directory should be
        let blocker = tmp.path().join("out");
        fs::write(&blocker, b"not a directory").unwrap();
        let (normalizer, logs) = logged_normalizer();

        let reports = run(
            &normalizer,
            std::slice::from_ref(&input),
            "signature",
            Some(&options(Some(blocker))),
        );

        let report = &reports[0];
        assert!(!report.success);
        assert_eq!(report.error_kind, Some(ErrorKind::WriteFailed));
        assert!(report.error.is_some());
        assert_eq!(report.orig_size, None);
        assert_eq!(report.resized_size, None);
        assert_eq!(report.min_size, None);
        assert_eq!(report.max_size, None);
        assert_eq!(report.meets_minimum, None);
        assert_eq!(report.output, None);
        let text = logs.contents();
        assert!(text.contains("ERROR"));
        assert!(text.contains("WriteFailed"));
    }

    #[test]
    fn unknown_category_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("card.png");
        write_fixture(&input, 100, 50);
        let before = fs::read(&input).unwrap();

        let reports = run(
            &normalizer(),
            std::slice::from_ref(&input),
            "id-card",
            Some(&options(None)),
        );

        assert_eq!(reports[0].error_kind, Some(ErrorKind::UnknownCategory));
        assert_eq!(fs::read(&input).unwrap(), before);
        assert!(!tmp.path().join("resized_card.png").exists());
    }

    #[test]
    fn empty_prefix_cannot_overwrite_png_input() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("logo.png");
        write_fixture(&input, 400, 200);
        let before = fs::read(&input).unwrap();
        let opts = WriteOptions {
            filename_prefix: String::new(),
            directory: None,
        };

        let reports = run(&normalizer(), std::slice::from_ref(&input), "company-logo", Some(&opts));

        assert!(!reports[0].success);
        assert_eq!(reports[0].error_kind, Some(ErrorKind::WriteFailed));
        assert!(reports[0].error.as_deref().unwrap().contains("overwrite"));
        assert_eq!(fs::read(&input).unwrap(), before);
    }
}
