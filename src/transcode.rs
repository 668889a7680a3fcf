//! Per-file transcoding: decode, encode, write, measure.
//!
//! [`Transcoder::transcode`] is the fault boundary of the pipeline. Every
//! codec, filesystem and timeout failure is caught here and turned into a
//! [`ConversionOutcome::Failed`] carrying the error text. A panic inside the
//! backend is caught too and reported as `encoder panicked`.
//!
//! ## Write protocol
//!
//! Encoded bytes are held in memory, written to a temporary file next to the
//! output, then renamed over the output path. A reader never observes a
//! half-written `.webp`, and an encode that fails or times out leaves any
//! previous output untouched. The input file is only ever opened for reading.
//!
//! ## Timeouts
//!
//! With a timeout set, each encode runs on its own helper thread. Native
//! codec calls cannot be interrupted, so a thread that outlives the limit
//! keeps running until libwebp returns; only its result is discarded. At
//! most [`MAX_ABANDONED_ENCODES`] such threads are tolerated at once. Past
//! that, further files fail immediately without starting an encode, and
//! work resumes as soon as the stragglers return.
//!
//! ## Sizes
//!
//! Original and new sizes are read back with a post-write `stat`, so the
//! reported savings describe what is actually on disk.

use crate::imaging::{BackendError, EncodeParams, Effort, Encoded, ImageBackend, Quality};
use crate::types::{ConversionOutcome, Converted, InputFile, display_name};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("write failed: {0}")]
    Write(io::Error),
    #[error("stat failed: {0}")]
    Stat(io::Error),
    #[error("timed out after {}s", .0.as_secs_f32())]
    TimedOut(Duration),
    #[error("could not start encoder thread: {0}")]
    Spawn(io::Error),
    #[error("encoder thread exited without a result")]
    WorkerLost,
    #[error("encoder panicked")]
    Panicked,
    #[error("{0} timed-out encodes still running")]
    Overloaded(usize),
}

/// Timed-out encodes allowed to keep running before new ones are refused.
pub const MAX_ABANDONED_ENCODES: usize = 4;

const RUNNING: u8 = 0;
const DONE: u8 = 1;
const ABANDONED: u8 = 2;

/// Run-wide encoding settings. Fixed for every file in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeSettings {
    pub quality: Quality,
    pub effort: Effort,
    /// `None` runs the encode inline with no time limit.
    pub timeout: Option<Duration>,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            effort: Effort::default(),
            timeout: None,
        }
    }
}

/// Percentage of the original size saved by the output.
///
/// Negative when the output is larger. An empty original reports 0.
pub fn savings_percent(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - new_size as f64) / original_size as f64 * 100.0
}

pub struct Transcoder {
    backend: Arc<dyn ImageBackend>,
    settings: TranscodeSettings,
    abandoned: Arc<AtomicUsize>,
}

impl Transcoder {
    pub fn new(backend: Arc<dyn ImageBackend>, settings: TranscodeSettings) -> Self {
        Self {
            backend,
            settings,
            abandoned: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_backend(backend: impl ImageBackend, settings: TranscodeSettings) -> Self {
        Self::new(Arc::new(backend), settings)
    }

    /// Convert `input` into `output`. Always returns an outcome.
    pub fn transcode(&self, input: &InputFile, output: &Path) -> ConversionOutcome {
        match self.try_transcode(input, output) {
            Ok(converted) => ConversionOutcome::Converted(converted),
            Err(e) => {
                debug!(path = %input.path.display(), error = %e, "transcode failed");
                ConversionOutcome::failed(&input.path, e)
            }
        }
    }

    /// Helper threads that timed out and have not returned yet.
    pub fn abandoned_encodes(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    fn try_transcode(&self, input: &InputFile, output: &Path) -> Result<Converted, TranscodeError> {
        let encoded = self.encode(&input.path)?;
        debug!(
            path = %input.path.display(),
            width = encoded.width,
            height = encoded.height,
            mode = ?encoded.mode,
            bytes = encoded.bytes.len(),
            "encoded"
        );
        write_atomic(output, &encoded.bytes).map_err(TranscodeError::Write)?;

        let original_size = std::fs::metadata(&input.path)
            .map_err(TranscodeError::Stat)?
            .len();
        let new_size = std::fs::metadata(output)
            .map_err(TranscodeError::Stat)?
            .len();

        Ok(Converted {
            input: input.name(),
            output: display_name(output),
            original_size,
            new_size,
            savings: savings_percent(original_size, new_size),
            mode: encoded.mode,
        })
    }

    fn encode(&self, source: &Path) -> Result<Encoded, TranscodeError> {
        let params = EncodeParams {
            source: source.to_path_buf(),
            quality: self.settings.quality,
            effort: self.settings.effort,
        };

        let Some(limit) = self.settings.timeout else {
            return encode_guarded(self.backend.as_ref(), &params);
        };

        let stuck = self.abandoned.load(Ordering::SeqCst);
        if stuck >= MAX_ABANDONED_ENCODES {
            return Err(TranscodeError::Overloaded(stuck));
        }

        // The helper thread only produces bytes. If it outlives the limit its
        // result is dropped on the floor and nothing reaches the disk.
        let backend = Arc::clone(&self.backend);
        let state = Arc::new(AtomicU8::new(RUNNING));
        let thread_state = Arc::clone(&state);
        let abandoned = Arc::clone(&self.abandoned);
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("webp-encode".into())
            .spawn(move || {
                let result = encode_guarded(backend.as_ref(), &params);
                // Losing this race means the caller already counted us as abandoned.
                if thread_state
                    .compare_exchange(RUNNING, DONE, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    abandoned.fetch_sub(1, Ordering::SeqCst);
                }
                let _ = tx.send(result);
            })
            .map_err(TranscodeError::Spawn)?;

        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // Count first so the thread's decrement can never run ahead of it.
                self.abandoned.fetch_add(1, Ordering::SeqCst);
                if state
                    .compare_exchange(RUNNING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    self.abandoned.fetch_sub(1, Ordering::SeqCst);
                }
                Err(TranscodeError::TimedOut(limit))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TranscodeError::WorkerLost),
        }
    }
}

/// Run the backend, turning a panic into an error.
fn encode_guarded(
    backend: &dyn ImageBackend,
    params: &EncodeParams,
) -> Result<Encoded, TranscodeError> {
    match panic::catch_unwind(AssertUnwindSafe(|| backend.encode(params))) {
        Ok(result) => Ok(result?),
        Err(_) => Err(TranscodeError::Panicked),
    }
}

/// Write `bytes` to `output` via a sibling temp file and a rename.
fn write_atomic(output: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".webpify-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    // Temp files are created 0600; outputs are regular web assets.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{ColorMode, RustBackend};
    use crate::test_helpers::{create_test_png_rgb, create_test_png_rgba, write_corrupt};
    use std::fs;
    use tempfile::TempDir;

    fn input_in(tmp: &TempDir, name: &str, content: &[u8]) -> InputFile {
        let path = tmp.path().join(name);
        fs::write(&path, content).unwrap();
        InputFile::stat(&path).unwrap()
    }

    struct PanickingBackend;

    impl ImageBackend for PanickingBackend {
        fn encode(&self, _params: &EncodeParams) -> Result<Encoded, BackendError> {
            panic!("codec blew up");
        }
    }

    fn dir_names(tmp: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    // =========================================================================
    // savings_percent
    // =========================================================================

    #[test]
    fn savings_exact_formula() {
        assert_eq!(savings_percent(1000, 250), 75.0);
        assert_eq!(savings_percent(200, 200), 0.0);
    }

    #[test]
    fn savings_negative_when_output_grows() {
        assert_eq!(savings_percent(100, 150), -50.0);
    }

    #[test]
    fn savings_zero_original_is_zero() {
        assert_eq!(savings_percent(0, 0), 0.0);
        assert_eq!(savings_percent(0, 42), 0.0);
    }

    // =========================================================================
    // Transcoder with mock backend
    // =========================================================================

    #[test]
    fn converted_sizes_come_from_disk() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", &[0u8; 100]);
        let output = tmp.path().join("a.webp");

        let transcoder = Transcoder::with_backend(MockBackend::new(), TranscodeSettings::default());
        let outcome = transcoder.transcode(&input, &output);

        let ConversionOutcome::Converted(converted) = outcome else {
            panic!("expected Converted, got {outcome:?}");
        };
        let written = fs::metadata(&output).unwrap().len();
        assert_eq!(converted.input, "a.png");
        assert_eq!(converted.output, "a.webp");
        assert_eq!(converted.original_size, 100);
        assert_eq!(converted.new_size, written);
        assert_eq!(converted.savings, savings_percent(100, written));
    }

    #[test]
    fn settings_are_passed_to_backend() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", b"x");
        let backend = Arc::new(MockBackend::new());
        let transcoder = Transcoder::new(
            backend.clone(),
            TranscodeSettings {
                quality: Quality::new(70),
                effort: Effort::new(4),
                timeout: None,
            },
        );

        transcoder.transcode(&input, &tmp.path().join("a.webp"));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode { quality: 70, effort: 4, .. }
        ));
    }

    #[test]
    fn backend_error_becomes_failed_without_output() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "bad.png", b"junk");
        let output = tmp.path().join("bad.webp");
        let backend =
            MockBackend::with_results(vec![Err(BackendError::Decode("bad header".into()))]);

        let outcome =
            Transcoder::with_backend(backend, TranscodeSettings::default()).transcode(&input, &output);

        assert!(
            matches!(&outcome, ConversionOutcome::Failed { error, .. } if error.contains("bad header"))
        );
        assert!(!output.exists());
        assert_eq!(dir_names(&tmp), vec!["bad.png"]);
    }

    #[test]
    fn failed_encode_keeps_previous_output() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", b"png");
        let output = tmp.path().join("a.webp");
        fs::write(&output, b"previous").unwrap();
        let backend = MockBackend::with_results(vec![Err(BackendError::Encode("full".into()))]);

        let outcome =
            Transcoder::with_backend(backend, TranscodeSettings::default()).transcode(&input, &output);

        assert!(outcome.is_failed());
        assert_eq!(fs::read(&output).unwrap(), b"previous");
    }

    #[test]
    fn existing_output_is_replaced_and_no_temp_left() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", b"png");
        let output = tmp.path().join("a.webp");
        fs::write(&output, b"stale").unwrap();

        let outcome = Transcoder::with_backend(MockBackend::new(), TranscodeSettings::default())
            .transcode(&input, &output);

        assert!(outcome.is_converted());
        assert_eq!(
            fs::read(&output).unwrap(),
            MockBackend::encoded(ColorMode::Rgb).bytes
        );
        assert_eq!(dir_names(&tmp), vec!["a.png", "a.webp"]);
    }

    #[test]
    fn input_is_never_modified() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", b"original bytes");

        Transcoder::with_backend(MockBackend::new(), TranscodeSettings::default())
            .transcode(&input, &tmp.path().join("a.webp"));

        assert_eq!(fs::read(&input.path).unwrap(), b"original bytes");
    }

    #[test]
    fn slow_encode_times_out_and_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "slow.png", b"png");
        let output = tmp.path().join("slow.webp");
        let transcoder = Transcoder::with_backend(
            MockBackend::slow(Duration::from_millis(400)),
            TranscodeSettings {
                timeout: Some(Duration::from_millis(50)),
                ..TranscodeSettings::default()
            },
        );

        let outcome = transcoder.transcode(&input, &output);
        assert!(
            matches!(&outcome, ConversionOutcome::Failed { error, .. } if error.contains("timed out"))
        );

        // Let the abandoned encode finish; its result must not be written.
        std::thread::sleep(Duration::from_millis(600));
        assert!(!output.exists());
    }

    #[test]
    fn abandoned_encodes_are_capped() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::slow(Duration::from_millis(400)));
        let transcoder = Transcoder::new(
            backend.clone(),
            TranscodeSettings {
                timeout: Some(Duration::from_millis(20)),
                ..TranscodeSettings::default()
            },
        );

        let mut errors = Vec::new();
        for i in 0..=MAX_ABANDONED_ENCODES {
            let input = input_in(&tmp, &format!("{i}.png"), b"png");
            let outcome = transcoder.transcode(&input, &tmp.path().join(format!("{i}.webp")));
            let ConversionOutcome::Failed { error, .. } = outcome else {
                panic!("expected Failed, got {outcome:?}");
            };
            errors.push(error);
        }

        assert!(errors[..MAX_ABANDONED_ENCODES].iter().all(|e| e.contains("timed out")));
        assert_eq!(
            errors[MAX_ABANDONED_ENCODES],
            format!("{MAX_ABANDONED_ENCODES} timed-out encodes still running")
        );
        assert_eq!(backend.get_operations().len(), MAX_ABANDONED_ENCODES);

        std::thread::sleep(Duration::from_millis(700));
        assert_eq!(transcoder.abandoned_encodes(), 0);
    }

    #[test]
    fn inline_panic_becomes_failed() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", b"png");
        let output = tmp.path().join("a.webp");

        let outcome = Transcoder::with_backend(PanickingBackend, TranscodeSettings::default())
            .transcode(&input, &output);

        assert!(
            matches!(&outcome, ConversionOutcome::Failed { error, .. } if error == "encoder panicked")
        );
        assert!(!output.exists());
    }

    #[test]
    fn threaded_panic_becomes_failed() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", b"png");
        let transcoder = Transcoder::with_backend(
            PanickingBackend,
            TranscodeSettings {
                timeout: Some(Duration::from_secs(10)),
                ..TranscodeSettings::default()
            },
        );

        let outcome = transcoder.transcode(&input, &tmp.path().join("a.webp"));

        assert!(
            matches!(&outcome, ConversionOutcome::Failed { error, .. } if error == "encoder panicked")
        );
        assert_eq!(transcoder.abandoned_encodes(), 0);
    }

    #[test]
    fn fast_encode_within_timeout_converts() {
        let tmp = TempDir::new().unwrap();
        let input = input_in(&tmp, "a.png", b"png");
        let transcoder = Transcoder::with_backend(
            MockBackend::new(),
            TranscodeSettings {
                timeout: Some(Duration::from_secs(10)),
                ..TranscodeSettings::default()
            },
        );

        assert!(transcoder.transcode(&input, &tmp.path().join("a.webp")).is_converted());
    }

    // =========================================================================
    // Transcoder with the real backend
    // =========================================================================

    #[test]
    fn real_backend_preserves_alpha_on_disk() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("logo.png");
        create_test_png_rgba(&source, 40, 40);
        let input = InputFile::stat(&source).unwrap();
        let output = tmp.path().join("logo.webp");

        let outcome = Transcoder::with_backend(RustBackend::new(), TranscodeSettings::default())
            .transcode(&input, &output);

        assert!(matches!(
            &outcome,
            ConversionOutcome::Converted(c) if c.mode == ColorMode::Rgba
        ));
        let decoded = image::open(&output).unwrap();
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn real_backend_opaque_output_has_no_alpha() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("page.png");
        create_test_png_rgb(&source, 40, 40);
        let input = InputFile::stat(&source).unwrap();
        let output = tmp.path().join("page.webp");

        let outcome = Transcoder::with_backend(RustBackend::new(), TranscodeSettings::default())
            .transcode(&input, &output);

        assert!(outcome.is_converted());
        assert!(!image::open(&output).unwrap().color().has_alpha());
    }

    #[test]
    fn real_backend_corrupt_file_fails() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        write_corrupt(&source);
        let input = InputFile::stat(&source).unwrap();

        let outcome = Transcoder::with_backend(RustBackend::new(), TranscodeSettings::default())
            .transcode(&input, &tmp.path().join("broken.webp"));

        assert!(
            matches!(&outcome, ConversionOutcome::Failed { error, .. } if error.starts_with("decode failed"))
        );
    }
}
