//! Markdown report generation from computed stats.

use crate::aggregations::Stats;
use crate::streak::SessionSummary;

/// Format seconds as a human-readable duration string.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Report generator for creating markdown summaries.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Today's numbers followed by the day-by-day trend table.
    pub fn weekly_report(stats: &Stats) -> String {
        let mut report = String::new();

        let (newest, oldest) = match (stats.last_7_days.first(), stats.last_7_days.last()) {
            (Some(first), Some(last)) => (first.date.as_str(), last.date.as_str()),
            _ => ("-", "-"),
        };
        report.push_str(&format!("# Focus Report\n\n**{} - {}**\n\n", oldest, newest));

        report.push_str("## Today\n\n");
        report.push_str(&format!("- **Sessions:** {}\n", stats.today_sessions));
        report.push_str(&format!(
            "- **Distractions per hour:** {:.2}\n",
            stats.today_distractions_per_hour
        ));
        report.push_str(&format!(
            "- **Longest streak:** {}\n\n",
            format_duration(stats.today_longest_streak_seconds)
        ));

        let total_sessions: u32 = stats.last_7_days.iter().map(|d| d.session_count).sum();
        let total_distractions: u32 = stats.last_7_days.iter().map(|d| d.total_distractions).sum();
        let best = stats
            .last_7_days
            .iter()
            .map(|d| d.longest_streak_seconds)
            .fold(0.0, f64::max);

        report.push_str("## Overview\n\n");
        report.push_str(&format!("- **Sessions:** {}\n", total_sessions));
        report.push_str(&format!("- **Distractions:** {}\n", total_distractions));
        report.push_str(&format!("- **Best streak:** {}\n\n", format_duration(best)));

        report.push_str("## Daily Breakdown\n\n");
        report.push_str("| Day | Sessions | Distractions | Longest Streak |\n");
        report.push_str("|-----|----------|--------------|----------------|\n");
        for day in &stats.last_7_days {
            if day.session_count == 0 {
                report.push_str(&format!("| {} | 0 | 0 | - |\n", day.date));
            } else {
                report.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    day.date,
                    day.session_count,
                    day.total_distractions,
                    format_duration(day.longest_streak_seconds),
                ));
            }
        }
        report.push('\n');

        report
    }

    /// Short plain-text block for a single ended session.
    pub fn session_report(summary: &SessionSummary) -> String {
        format!(
            "Duration:        {}\nDistractions:    {}\nAverage streak:  {}\nLongest streak:  {}\n",
            format_duration(summary.duration_seconds),
            summary.distraction_count,
            format_duration(summary.average_streak_seconds),
            format_duration(summary.longest_streak_seconds),
        )
    }
}
