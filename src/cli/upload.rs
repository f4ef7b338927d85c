//! Batch "upload" command

use std::error::Error;
use std::path::PathBuf;

use crate::cli::connect;
use crate::cli::render::{record_line, rejection_line};
use crate::core::config::Settings;
use crate::core::ingestion::{IngestionTracker, PendingFile, UploadService, UploadStatus};

pub async fn run_upload(paths: Vec<PathBuf>, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let (service, mut rx) = UploadService::new(connect(settings)?, settings.settle.clone());
    let mut tracker = IngestionTracker::new(service, settings.accept_policy);

    let mut unreadable = 0;
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        match PendingFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(err) => {
                eprintln!("❌ {}: {err}", path.display());
                unreadable += 1;
            }
        }
    }

    let report = tracker.drop_files(files);
    for rejection in &report.rejected {
        eprintln!("{}", rejection_line(rejection));
    }
    for record in tracker.records() {
        println!("{}", record_line(record));
    }

    while tracker.is_busy() {
        let Some((id, event)) = rx.recv().await else {
            break;
        };
        if let Some(record) = tracker.apply(&id, event) {
            println!("{}", record_line(record));
        }
    }

    let failed = tracker
        .records()
        .iter()
        .filter(|record| record.status() == UploadStatus::Failed)
        .count();
    let problems = unreadable + report.rejected.len() + failed;
    if problems > 0 {
        eprintln!("{problems} of {} file(s) were not ingested", paths.len());
        std::process::exit(1);
    }
    Ok(())
}
