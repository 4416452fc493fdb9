//! Report content construction.
//!
//! Pure functions from run parameters and state to [`Report`] values.
//! Bodies are the markdown quote-block shape the robot renders well.
//! Nothing here touches a clock or a transport; timestamps come in as
//! arguments.

use chrono::{DateTime, Local};

use crate::selector::Policy;
use crate::watch::{Outcome, WatchPlan};

use super::Report;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest error excerpt an anomaly report carries.
const ERROR_EXCERPT_CHARS: usize = 100;

/// The one-time report emitted when a run begins.
pub fn run_started(plan: &WatchPlan, now: DateTime<Local>) -> Report {
    let mut body = String::from("## Watch started\n");
    body.push_str(&plan_lines(plan));
    body.push_str(&format!("> Started: {}\n", now.format(TIME_FORMAT)));

    Report {
        title: "Watch started".to_string(),
        body,
    }
}

/// The periodic "still monitoring" report.
pub fn progress(
    plan: &WatchPlan,
    attempts: u32,
    elapsed_minutes: i64,
    now: DateTime<Local>,
) -> Report {
    let mut body = String::from("## Watch running\n");
    body.push_str(&format!("> Running for: {elapsed_minutes} minutes\n"));
    body.push_str(&format!("> Attempts: {attempts}\n"));
    body.push_str(&plan_lines(plan));
    body.push_str("> Status: monitoring normally\n");
    body.push_str(&format!("> Checked: {}\n", now.format(TIME_FORMAT)));

    Report {
        title: "Watch running".to_string(),
        body,
    }
}

/// Best-effort report for a per-attempt failure.
pub fn anomaly(plan: &WatchPlan, attempt: u32, error: &str, now: DateTime<Local>) -> Report {
    let excerpt: String = error.chars().take(ERROR_EXCERPT_CHARS).collect();

    let mut body = String::from("## Watch anomaly\n");
    body.push_str(&format!("> Looking for: {}\n", plan.strategy));
    body.push_str(&format!("> Attempt: {attempt}\n"));
    body.push_str(&format!("> Error: {excerpt}\n"));
    body.push_str(&format!("> Time: {}\n", now.format(TIME_FORMAT)));

    Report {
        title: "Watch anomaly".to_string(),
        body,
    }
}

/// The exactly-once terminal report.
pub fn finished(
    plan: &WatchPlan,
    outcome: &Outcome,
    attempts: u32,
    elapsed_minutes: i64,
    now: DateTime<Local>,
) -> Report {
    let title = if outcome.is_success() {
        "Watch succeeded"
    } else {
        "Watch ended"
    };

    let mut body = format!("## {title}\n");
    body.push_str(&format!("> Result: {outcome}\n"));
    body.push_str(&plan_lines(plan));
    body.push_str(&format!("> Attempts: {attempts}\n"));
    body.push_str(&format!("> Ran for: {elapsed_minutes} minutes\n"));
    body.push_str(&format!("> Time: {}\n", now.format(TIME_FORMAT)));

    Report {
        title: title.to_string(),
        body,
    }
}

/// The fixed parameter summary shared by every report.
fn plan_lines(plan: &WatchPlan) -> String {
    let mut lines = String::new();
    lines.push_str(&format!("> From: {}\n", plan.from));
    lines.push_str(&format!("> To: {}\n", plan.to));
    lines.push_str(&format!("> Date: {}\n", plan.travel_date));
    lines.push_str(&format!("> Fare: {}\n", plan.fare));
    if let Some(seat) = &plan.seat_category {
        lines.push_str(&format!("> Seat: {seat}\n"));
    }
    if let Some(rider) = &plan.rider {
        lines.push_str(&format!("> Rider: {rider}\n"));
    }
    match &plan.strategy {
        Policy::ByTrainCode(code) => lines.push_str(&format!("> Train: {code}\n")),
        Policy::ByWindow(window) => lines.push_str(&format!("> Window: {window}\n")),
    }
    lines
}
