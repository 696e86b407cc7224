//! Per-entity line chart rendering.
//!
//! This module generates a standalone HTML page embedding an Apache
//! ECharts line chart for one entity's series: cumulative pulls on the
//! left axis, daily delta on the right, with optional release-version
//! mark lines.

use crate::models::{sanitize_name, Sample, DATE_FORMAT};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// ECharts bundle loaded by every chart page.
const ECHARTS_CDN: &str = "https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js";

/// Render the chart page for one entity and write it to
/// `<render_dir>/<sanitized_name>.html`. Returns the written path.
pub fn write_chart(
    render_dir: &Path,
    name: &str,
    samples: &[Sample],
    releases: Option<&BTreeMap<String, String>>,
) -> Result<PathBuf> {
    let path = render_dir.join(format!("{}.html", sanitize_name(name)));
    debug!("Writing chart for '{}' to {}", name, path.display());

    let html = render_chart(name, samples, releases);
    std::fs::write(&path, html)
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;

    Ok(path)
}

/// Render the full chart HTML page for one entity.
pub fn render_chart(
    name: &str,
    samples: &[Sample],
    releases: Option<&BTreeMap<String, String>>,
) -> String {
    let option = chart_option(name, samples, releases);
    let title = html_escape(name);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="{ECHARTS_CDN}"></script>
    <style>
        html, body {{ margin: 0; padding: 0; }}
        #chart {{ width: 100%; height: 95vh; }}
    </style>
</head>
<body>
    <div id="chart"></div>
    <script>
        var chart = echarts.init(document.getElementById('chart'));
        chart.setOption({option});
        window.addEventListener('resize', function () {{ chart.resize(); }});
    </script>
</body>
</html>
"#
    )
}

/// Build the ECharts option object for one entity's series.
fn chart_option(
    name: &str,
    samples: &[Sample],
    releases: Option<&BTreeMap<String, String>>,
) -> Value {
    let dates: Vec<String> = samples
        .iter()
        .map(|s| s.date.format(DATE_FORMAT).to_string())
        .collect();
    let counts: Vec<u64> = samples.iter().map(|s| s.count).collect();
    let deltas: Vec<i64> = samples.iter().map(|s| s.delta).collect();

    let mark_lines: Vec<Value> = releases
        .map(|releases| {
            releases
                .iter()
                .map(|(date, version)| json!({ "name": version, "xAxis": date }))
                .collect()
        })
        .unwrap_or_default();

    json!({
        "title": { "text": name },
        "tooltip": {
            "show": true,
            "trigger": "axis",
            "axisPointer": { "type": "cross", "snap": true }
        },
        "legend": { "show": true, "selectedMode": "multiple" },
        "dataZoom": [{ "type": "slider", "start": 0, "end": 100 }],
        "color": ["blue", "orange"],
        "xAxis": { "type": "category", "data": dates },
        "yAxis": [
            { "type": "value", "name": "# pulls", "show": true },
            { "type": "value", "name": "delta", "show": true, "scale": true }
        ],
        "series": [
            {
                "name": "# pulls",
                "type": "line",
                "showSymbol": true,
                "data": counts,
                "markLine": {
                    "symbol": "none",
                    "label": { "show": true, "formatter": "{b}" },
                    "lineStyle": { "color": "gray" },
                    "data": mark_lines
                }
            },
            {
                "name": "delta",
                "type": "line",
                "yAxisIndex": 1,
                "data": deltas
            }
        ]
    })
}

/// Minimal HTML escaping for text interpolated into the page.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
