//! Tile slots plus background stitch jobs, at most one in flight.

mod worker;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chip::ChipImageSet;
use crate::error::{Result, StitchError};
use crate::identify::identify_filename;
use crate::io::{load_quadrant_image, FileImageLoader, FileImageWriter, ImageLoader, ImageWriter};
use crate::pipeline::config::StitchingConfig;
use crate::pipeline::types::CancelToken;
use crate::pipeline::{run_chip_stitch, run_stitch, ChipOutput, StitchOutput};
use crate::quadrant::Quadrant;
use crate::tile::QuadrantImage;

use worker::DoneSignal;

pub use worker::{ChannelProgressReporter, StitchJob};

/// Outcome of loading a batch of files. One bad file never aborts the rest.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<(Quadrant, PathBuf)>,
    /// Files whose name did not pin down a quadrant; assign them manually.
    pub ambiguous: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, StitchError)>,
}

/// Owns the loaded tiles and launches stitch jobs on snapshots of them.
pub struct StitchSession {
    tiles: BTreeMap<Quadrant, Arc<QuadrantImage>>,
    loader: Arc<dyn ImageLoader>,
    writer: Arc<dyn ImageWriter>,
    current: Option<(CancelToken, DoneSignal)>,
}

impl Default for StitchSession {
    fn default() -> Self {
        Self::new(Arc::new(FileImageLoader), Arc::new(FileImageWriter))
    }
}

impl StitchSession {
    /// `loader` reads tiles and chips; `writer` writes job output.
    pub fn new(loader: Arc<dyn ImageLoader>, writer: Arc<dyn ImageWriter>) -> Self {
        Self {
            tiles: BTreeMap::new(),
            loader,
            writer,
            current: None,
        }
    }

    /// Identify each file's quadrant from its name and load it into that slot.
    pub fn load_files(&mut self, paths: &[PathBuf]) -> LoadReport {
        let mut report = LoadReport::default();
        for path in paths {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let Some(quadrant) = identify_filename(name).quadrant() else {
                debug!(path = %path.display(), "Quadrant not identifiable from name");
                report.ambiguous.push(path.clone());
                continue;
            };
            match self.assign(quadrant, path) {
                Ok(_) => report.loaded.push((quadrant, path.clone())),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load tile");
                    report.errors.push((path.clone(), e));
                }
            }
        }
        info!(
            loaded = report.loaded.len(),
            ambiguous = report.ambiguous.len(),
            failed = report.errors.len(),
            "Loaded tiles"
        );
        report
    }

    /// Load `path` into `quadrant`, replacing whatever was there.
    pub fn assign(&mut self, quadrant: Quadrant, path: &Path) -> Result<Arc<QuadrantImage>> {
        let tile = Arc::new(load_quadrant_image(quadrant, path, self.loader.as_ref())?);
        if let Some(previous) = self.tiles.insert(quadrant, Arc::clone(&tile)) {
            debug!(quadrant = %quadrant, previous = %previous.path.display(), "Replaced tile");
        }
        Ok(tile)
    }

    pub fn remove(&mut self, quadrant: Quadrant) -> Option<Arc<QuadrantImage>> {
        self.tiles.remove(&quadrant)
    }

    pub fn tiles(&self) -> &BTreeMap<Quadrant, Arc<QuadrantImage>> {
        &self.tiles
    }

    pub fn tile(&self, quadrant: Quadrant) -> Option<&Arc<QuadrantImage>> {
        self.tiles.get(&quadrant)
    }

    /// Stitch the current tiles in the background.
    ///
    /// A job still in flight is cancelled and waited for first.
    pub fn start_stitch(&mut self, config: StitchingConfig, output: StitchOutput) -> Result<StitchJob> {
        self.cancel();
        let cancel = CancelToken::new();
        let tiles: Vec<Arc<QuadrantImage>> = self.tiles.values().cloned().collect();
        let writer = Arc::clone(&self.writer);
        info!(tiles = tiles.len(), "Starting stitch job");
        let job = worker::spawn_job("nsew-stitch", cancel.clone(), move |reporter, cancel| {
            run_stitch(&tiles, &config, &output, writer.as_ref(), reporter, &cancel)
        })?;
        self.current = Some((cancel, job.done_signal()));
        Ok(job)
    }

    /// Stitch `set` on its saved geometry in the background.
    pub fn start_chip_stitch(&mut self, set: ChipImageSet, config: StitchingConfig, output: ChipOutput) -> Result<StitchJob> {
        self.cancel();
        let cancel = CancelToken::new();
        let loader = Arc::clone(&self.loader);
        let writer = Arc::clone(&self.writer);
        info!(chips = set.found(), "Starting chip stitch job");
        let job = worker::spawn_job("nsew-chip-stitch", cancel.clone(), move |reporter, cancel| {
            run_chip_stitch(&set, &config, &output, loader.as_ref(), writer.as_ref(), reporter, &cancel)
        })?;
        self.current = Some((cancel, job.done_signal()));
        Ok(job)
    }

    /// Cancel the job in flight, if any, and block until its worker exits.
    ///
    /// A job already writing its output finishes the write before stopping.
    pub fn cancel(&mut self) {
        if let Some((token, done)) = self.current.take() {
            if !done.is_set() {
                debug!("Cancelling running job");
            }
            token.cancel();
            done.wait();
        }
    }
}
