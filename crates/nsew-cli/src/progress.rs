use indicatif::{ProgressBar, ProgressStyle};
use nsew_core::session::StitchJob;
use nsew_core::StitchedResult;

/// Show a job's milestones on a progress bar until it finishes.
pub fn drive_job(job: StitchJob) -> nsew_core::Result<StitchedResult> {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg:24} [{bar:40}] {pos}%") {
        pb.set_style(style.progress_chars("=> "));
    }

    // The channel closes once the worker drops its reporter.
    while let Ok(event) = job.progress().recv() {
        pb.set_message(event.message);
        pb.set_position(u64::from(event.percent));
    }

    match job.join() {
        Ok(result) => {
            pb.finish_with_message("Done");
            Ok(result)
        }
        Err(e) => {
            pb.abandon_with_message("Failed");
            Err(e)
        }
    }
}
