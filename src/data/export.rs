//! CSV export of episode summaries

use super::episode::Episode;
use std::io::{self, Write};

const HEADER: &[&str] = &[
    "id",
    "title",
    "status",
    "primary_topic",
    "complexity_score",
    "complexity_level",
    "concepts_count",
    "arguments_count",
    "insights_count",
    "concepts",
    "themes",
    "philosophers",
    "processed_at",
];

/// Write one row per episode. List columns are joined with `", "`.
pub fn write_csv<'a, W, I>(mut writer: W, episodes: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Episode>,
{
    writeln!(writer, "{}", HEADER.join(","))?;

    let mut rows = 0;
    for episode in episodes {
        let analysis = &episode.analysis;
        let findings = &analysis.findings;
        let concepts: Vec<&str> = episode.concept_names().collect();

        let fields = [
            csv_escape(&episode.id),
            csv_escape(&episode.title),
            analysis.status.as_str().to_string(),
            csv_escape(findings.primary_topic.as_deref().unwrap_or("")),
            format!("{:.2}", analysis.metrics.complexity_score),
            analysis.metrics.complexity_level.as_str().to_string(),
            analysis.metrics.concepts_count.to_string(),
            analysis.metrics.arguments_count.to_string(),
            analysis.metrics.insights_count.to_string(),
            csv_escape(&concepts.join(", ")),
            csv_escape(&findings.themes.join(", ")),
            csv_escape(&findings.philosophers.join(", ")),
            episode.processed_at.to_rfc3339(),
        ];
        writeln!(writer, "{}", fields.join(","))?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

/// Escape a CSV field value
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
