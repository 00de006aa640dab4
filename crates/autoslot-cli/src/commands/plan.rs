//! Placement and calendar maintenance commands.

use autoslot_core::sync::ReconcileReport;
use chrono::Utc;

use super::{local, CliResult, Session};

/// Place queued tasks; create their events unless `dry_run`.
pub fn run(offline: bool, dry_run: bool) -> CliResult {
    let session = Session::load()?;
    let mut planner = session.planner(offline)?;
    let timezone = planner.settings().timezone;

    let slots = planner.organise(Utc::now())?;
    if slots.is_empty() {
        println!("Nothing to schedule.");
        return Ok(());
    }

    for slot in &slots {
        println!(
            "{} - {}  {}",
            local(slot.start, timezone),
            slot.end().with_timezone(&timezone).format("%H:%M"),
            slot.task()
        );
    }

    if dry_run {
        println!("Dry run: no events created.");
        return Ok(());
    }

    let created = planner.upload(slots)?;
    println!("Created {} event(s).", created.len());
    Ok(())
}

pub fn reconcile(offline: bool) -> CliResult {
    let session = Session::load()?;
    let mut planner = session.planner(offline)?;

    let report = planner.reconcile()?;
    print_reconcile(&report);
    Ok(())
}

pub fn unschedule(offline: bool) -> CliResult {
    let session = Session::load()?;
    let mut planner = session.planner(offline)?;

    let returned = planner.unschedule()?;
    for task in &returned {
        println!("unscheduled  {task}");
    }
    println!("{} task(s) returned to the queue.", returned.len());
    Ok(())
}

pub(super) fn print_reconcile(report: &ReconcileReport) {
    for updated in &report.updated {
        println!("updated    {}", updated.task);
    }
    for done in &report.completed {
        println!("completed  {}", done.task);
    }
    for gone in &report.vanished {
        println!("vanished   {}", gone.task);
    }
    println!("{}", report.message());
}
