//! One scrape cycle: classify, build, collapse, insert.

use std::time::Instant;

use truck_alert_classify::classifier::{Verdict, explain};
use truck_alert_database::{InsertOutcome, Store};
use truck_alert_ingest_models::{CandidateOutcome, CycleReport};

use crate::CycleError;
use crate::builder::build_incident;
use crate::dedup::collapse_batch;

/// Runs one cycle over a batch of raw fragments.
///
/// The stall setting is read from the store for every fragment, so a toggle
/// made mid-cycle applies to the fragments that follow it. Each insert is
/// atomic on its own; an error aborts the cycle but leaves every incident
/// inserted so far intact and complete.
///
/// # Errors
///
/// Returns [`CycleError::Store`] if the store becomes unavailable.
pub async fn run_scrape_cycle<S>(
    store: &dyn Store,
    fragments: &[S],
) -> Result<CycleReport, CycleError>
where
    S: AsRef<str> + Sync,
{
    let start = Instant::now();
    let mut report = CycleReport {
        fragments: fragments.len() as u64,
        ..CycleReport::default()
    };

    let mut candidates = Vec::new();

    for fragment in fragments {
        let fragment = fragment.as_ref();
        let include_stalls = store.include_stalls().await?;

        let verdict = explain(fragment, include_stalls);
        if !verdict.is_relevant() {
            if verdict != Verdict::NoSignal {
                log::debug!("Rejected fragment ({verdict:?})");
            }
            report.record(CandidateOutcome::NotRelevant);
            continue;
        }

        match build_incident(fragment) {
            Some(candidate) => candidates.push(candidate),
            None => report.record(CandidateOutcome::UnresolvedLocation),
        }
    }

    let (candidates, collapsed) = collapse_batch(candidates);
    for _ in 0..collapsed {
        report.record(CandidateOutcome::CollapsedInBatch);
    }

    for candidate in &candidates {
        match store.insert(candidate).await? {
            InsertOutcome::Inserted(incident) => {
                log::info!(
                    "New incident #{} at {} (severity {})",
                    incident.id,
                    incident.location,
                    incident.severity.value()
                );
                report.inserted.push(incident);
            }
            InsertOutcome::AlreadyExists => {
                log::debug!("Duplicate incident at {}", candidate.location);
                report.record(CandidateOutcome::Duplicate);
            }
        }
    }

    report.duration = start.elapsed();

    log::info!(
        "Scrape cycle: {} fragments, {} new, {} duplicate, {} collapsed, {} unresolved, {} not relevant ({:.2?})",
        report.fragments,
        report.inserted.len(),
        report.duplicates,
        report.collapsed,
        report.unresolved,
        report.not_relevant,
        report.duration,
    );

    Ok(report)
}
