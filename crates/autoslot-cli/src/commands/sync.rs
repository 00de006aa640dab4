//! Full planning cycle against the calendar.

use autoslot_core::calendar::CalendarGateway;
use chrono::Utc;

use super::plan::print_reconcile;
use super::{local, CliResult, Session};

pub fn run(offline: bool) -> CliResult {
    let session = Session::load()?;
    let mut planner = session.planner(offline)?;
    let timezone = planner.settings().timezone;

    let report = planner.run_cycle(Utc::now())?;

    print_reconcile(&report.reconcile);
    for adopted in &report.adopted {
        println!("adopted    {} ({})", adopted.task, adopted.event_id);
    }
    for uploaded in &report.uploaded {
        let start = planner
            .gateway()
            .get_event(&uploaded.event_id)
            .map(|event| local(event.start, timezone))
            .unwrap_or_else(|_| uploaded.event_id.clone());
        println!("scheduled  {} at {start}", uploaded.task);
    }
    println!(
        "{} task(s) scheduled, {} waiting.",
        report.uploaded.len(),
        planner.queue().len() + planner.pending().len()
    );
    Ok(())
}
