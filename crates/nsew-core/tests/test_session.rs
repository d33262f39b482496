mod common;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nsew_core::chip::{locate_chip_images, ChipNaming};
use nsew_core::error::LoadErrorKind;
use nsew_core::io::{FileImageLoader, FileImageWriter, ImageLoader, ImageWriter, TileMetadata};
use nsew_core::pipeline::{ChipOutput, OutputFormat, StitchOutput, StitchingConfig};
use nsew_core::session::StitchSession;
use nsew_core::{Quadrant, StitchError, TileImage};

/// Loader that waits for a signal before each decode.
struct GatedLoader {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl ImageLoader for GatedLoader {
    fn load(&self, path: &Path) -> nsew_core::Result<(TileImage, TileMetadata)> {
        if let Ok(rx) = self.gate.lock() {
            let _ = rx.recv();
        }
        FileImageLoader.load(path)
    }

    fn dimensions(&self, path: &Path) -> nsew_core::Result<(u32, u32)> {
        FileImageLoader.dimensions(path)
    }
}

/// Loader that counts its calls.
#[derive(Default)]
struct CountingLoader {
    loads: AtomicUsize,
}

impl ImageLoader for CountingLoader {
    fn load(&self, path: &Path) -> nsew_core::Result<(TileImage, TileMetadata)> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        FileImageLoader.load(path)
    }

    fn dimensions(&self, path: &Path) -> nsew_core::Result<(u32, u32)> {
        FileImageLoader.dimensions(path)
    }
}

/// Writer that blocks until released and records the order of its saves.
struct GatedWriter {
    gate: Mutex<mpsc::Receiver<()>>,
    entered: Mutex<mpsc::Sender<PathBuf>>,
    log: Mutex<Vec<(&'static str, PathBuf)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedWriter {
    fn new(gate: mpsc::Receiver<()>, entered: mpsc::Sender<PathBuf>) -> Self {
        Self {
            gate: Mutex::new(gate),
            entered: Mutex::new(entered),
            log: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

impl ImageWriter for GatedWriter {
    fn save(&self, image: &TileImage, path: &Path, format: OutputFormat, level: u8) -> nsew_core::Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.log.lock().unwrap().push(("begin", path.to_path_buf()));
        let _ = self.entered.lock().unwrap().send(path.to_path_buf());

        if let Ok(rx) = self.gate.lock() {
            let _ = rx.recv();
        }
        let saved = FileImageWriter.save(image, path, format, level);

        self.log.lock().unwrap().push(("end", path.to_path_buf()));
        self.active.fetch_sub(1, Ordering::SeqCst);
        saved
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_load_files_reports_each_file_independently() {
    let dir = tempfile::tempdir().unwrap();
    let tiles = common::cut_tiles(&common::scene(1));
    let mut paths = common::write_tiles(dir.path(), "sample_", &tiles[..2]);
    let ambiguous = dir.path().join("overview.png");
    common::write_gray_png(&ambiguous, &tiles[0].1);
    let broken = dir.path().join("broken_SE.png");
    std::fs::write(&broken, b"no pixels here").unwrap();
    paths.extend([ambiguous.clone(), broken.clone()]);

    let mut session = StitchSession::default();
    let report = session.load_files(&paths);

    assert_eq!(report.loaded.len(), 2);
    assert_eq!(report.ambiguous, vec![ambiguous]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, broken);
    assert!(matches!(report.errors[0].1, StitchError::ImageLoad { .. }));
    assert_eq!(session.tiles().keys().copied().collect::<Vec<_>>(), vec![Quadrant::NW, Quadrant::NE]);
    assert!(session.tile(Quadrant::NW).unwrap().verify_checksum());
}

#[test]
fn test_assign_replaces_and_remove_clears() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("first.png");
    let b = dir.path().join("second.png");
    common::write_gray_png(&a, &TileImage::filled((8, 8), 1, 0.1));
    common::write_gray_png(&b, &TileImage::filled((12, 8), 1, 0.9));

    let mut session = StitchSession::default();
    session.assign(Quadrant::SW, &a).unwrap();
    session.assign(Quadrant::SW, &b).unwrap();
    assert_eq!(session.tiles().len(), 1);
    assert_eq!(session.tile(Quadrant::SW).unwrap().path, b);
    assert_eq!(session.tile(Quadrant::SW).unwrap().dimensions(), (12, 8));

    let err = session
        .assign(Quadrant::NE, &dir.path().join("absent.png"))
        .unwrap_err();
    assert!(matches!(err, StitchError::ImageLoad { kind: LoadErrorKind::NotFound, .. }));

    assert!(session.remove(Quadrant::SW).is_some());
    assert!(session.tiles().is_empty());
}

#[test]
fn test_tiles_load_through_session_loader() {
    let dir = tempfile::tempdir().unwrap();
    let tiles = common::cut_tiles(&common::scene(3));
    let paths = common::write_tiles(dir.path(), "sample_", &tiles[..3]);

    let loader = Arc::new(CountingLoader::default());
    let mut session = StitchSession::new(loader.clone(), Arc::new(FileImageWriter));
    session.load_files(&paths[..2]);
    session.assign(Quadrant::SW, &paths[2]).unwrap();

    assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
    assert_eq!(session.tiles().len(), 3);
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[test]
fn test_stitch_job_writes_image_and_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let tiles = common::cut_tiles(&common::scene(21));
    let paths = common::write_tiles(dir.path(), "sample_", &tiles);

    let mut session = StitchSession::default();
    session.load_files(&paths);
    let output = StitchOutput {
        image_path: Some(dir.path().join("stitched.png")),
        parameters_path: Some(dir.path().join("params.json")),
    };
    let config = StitchingConfig::builder()
        .allow_low_confidence(true)
        .output_format(OutputFormat::Png)
        .build()
        .unwrap();
    let result = session.start_stitch(config, output).unwrap().join().unwrap();
    assert_eq!(result.source_tiles.len(), 4);

    assert!(dir.path().join("stitched.png").is_file());
    let params = nsew_core::params::load_parameters(&dir.path().join("params.json")).unwrap();
    assert_eq!(params.quadrants.len(), 4);
    assert_eq!(params.final_dimensions, Some(result.full_resolution));
}

#[test]
fn test_progress_is_monotonic_and_completes() {
    let tiles = common::cut_tiles(&common::scene(2));
    let mut session = StitchSession::default();
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_tiles(dir.path(), "p_", &tiles[..2]);
    session.load_files(&paths);

    let config = StitchingConfig::builder().allow_low_confidence(true).build().unwrap();
    let job = session.start_stitch(config, StitchOutput::default()).unwrap();
    let mut percents = Vec::new();
    while let Ok(event) = job.progress().recv() {
        percents.push(event.percent);
    }
    assert!(job.join().is_ok());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(percents.last(), Some(&100));
}

#[test]
fn test_cancelled_job_returns_cancelled_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let tiles = common::cut_tiles(&common::scene(4));
    let paths = common::write_tiles(dir.path(), "sample_", &tiles);

    let mut session = StitchSession::default();
    session.load_files(&paths);
    let params_path = dir.path().join("params.json");
    let output = StitchOutput {
        image_path: Some(dir.path().join("stitched.tiff")),
        parameters_path: Some(params_path.clone()),
    };
    let config = StitchingConfig::builder().allow_low_confidence(true).build().unwrap();

    let job = session.start_stitch(config, output).unwrap();
    // Wait for the first milestone so the job is past its setup.
    job.progress().recv().unwrap();
    job.cancel();
    assert!(matches!(job.join(), Err(StitchError::Cancelled)));
    assert!(!params_path.exists());
    assert!(!dir.path().join("stitched.tiff").exists());
}

#[test]
fn test_new_job_waits_for_previous_to_finish_writing() {
    let dir = tempfile::tempdir().unwrap();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (entered_tx, entered_rx) = mpsc::channel::<PathBuf>();
    let writer = Arc::new(GatedWriter::new(release_rx, entered_tx));
    let mut session = StitchSession::new(Arc::new(FileImageLoader), writer.clone());
    let tile_path = dir.path().join("x_NW.png");
    common::write_gray_png(&tile_path, &TileImage::filled((16, 16), 1, 0.5));
    session.load_files(&[tile_path]);

    let first_out = dir.path().join("first.tiff");
    let second_out = dir.path().join("second.tiff");
    let config = StitchingConfig::default();
    let first = session
        .start_stitch(
            config.clone(),
            StitchOutput {
                image_path: Some(first_out.clone()),
                parameters_path: Some(dir.path().join("first.json")),
            },
        )
        .unwrap();
    let first_token = first.cancel_token();
    // Hold the first job inside its image write.
    assert_eq!(entered_rx.recv().unwrap(), first_out);

    let (started_tx, started_rx) = mpsc::channel::<()>();
    let second_output = StitchOutput {
        image_path: Some(second_out.clone()),
        parameters_path: None,
    };
    let starter = std::thread::spawn(move || {
        let job = session.start_stitch(config, second_output);
        let _ = started_tx.send(());
        job
    });

    assert_eq!(
        started_rx.recv_timeout(Duration::from_millis(300)),
        Err(RecvTimeoutError::Timeout),
        "second job started while the first was still writing"
    );

    drop(release_tx);
    let second = starter.join().unwrap().unwrap();
    assert!(first_token.is_cancelled());
    // Cancellation came after write-out began, so the first job completes.
    assert!(first.join().is_ok());
    assert!(second.join().is_ok());

    assert_eq!(writer.peak.load(Ordering::SeqCst), 1);
    let log = writer.log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            ("begin", first_out.clone()),
            ("end", first_out),
            ("begin", second_out.clone()),
            ("end", second_out),
        ]
    );
}

#[test]
fn test_session_cancel_blocks_until_worker_exits() {
    let dir = tempfile::tempdir().unwrap();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (entered_tx, entered_rx) = mpsc::channel::<PathBuf>();
    let writer = Arc::new(GatedWriter::new(release_rx, entered_tx));
    let mut session = StitchSession::new(Arc::new(FileImageLoader), writer.clone());
    let tile_path = dir.path().join("x_NW.png");
    common::write_gray_png(&tile_path, &TileImage::filled((16, 16), 1, 0.5));
    session.load_files(&[tile_path]);

    let out = dir.path().join("held.tiff");
    let job = session
        .start_stitch(
            StitchingConfig::default(),
            StitchOutput {
                image_path: Some(out.clone()),
                parameters_path: None,
            },
        )
        .unwrap();
    entered_rx.recv().unwrap();

    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        drop(release_tx);
    });
    session.cancel();
    // The worker has exited, so its write is complete.
    assert_eq!(writer.active.load(Ordering::SeqCst), 0);
    assert!(out.is_file());
    releaser.join().unwrap();
    assert!(job.join().is_ok());
}

#[test]
fn test_chip_job_never_writes_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let params = common::scene_parameters(dir.path());
    let set = locate_chip_images(params, &dir.path().join("params.json"), &ChipNaming::default(), &FileImageLoader);

    let mut session = StitchSession::default();
    let output = ChipOutput {
        image_path: Some(dir.path().join("chips.tiff")),
    };
    let result = session
        .start_chip_stitch(set, StitchingConfig::default(), output)
        .unwrap()
        .join()
        .unwrap();
    assert!(result.is_chip_stitch);
    assert!(dir.path().join("chips.tiff").is_file());
    let entries: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries, vec![dir.path().join("chips.tiff")]);
}

#[test]
fn test_cancelled_chip_job_stops_between_chips() {
    let dir = tempfile::tempdir().unwrap();
    for q in Quadrant::ALL {
        let path = dir.path().join(format!("sample_{}_chip.png", q.code()));
        common::write_gray_png(&path, &TileImage::filled((160, 128), 1, 0.5));
    }
    let set = locate_chip_images(
        common::scene_parameters(dir.path()),
        &dir.path().join("params.json"),
        &ChipNaming::default(),
        &FileImageLoader,
    );

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let loader = Arc::new(GatedLoader {
        gate: Mutex::new(release_rx),
    });
    let mut session = StitchSession::new(loader, Arc::new(FileImageWriter));
    let output = ChipOutput {
        image_path: Some(dir.path().join("chips.tiff")),
    };
    let job = session.start_chip_stitch(set, StitchingConfig::default(), output).unwrap();
    job.cancel();
    drop(release_tx);

    assert!(matches!(job.join(), Err(StitchError::Cancelled)));
    assert!(!dir.path().join("chips.tiff").exists());
}
