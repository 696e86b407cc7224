//! Index page generation.
//!
//! This module writes the static `index.html` listing every tracked
//! image and derived sum with its latest count and a link to its chart.

use crate::models::{sanitize_name, ImageCount};
use crate::report::chart::html_escape;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Docker Hub page for an image reference.
const HUB_URL: &str = "https://hub.docker.com/r/";

/// Build the index page and write it to `path`. `render_dir_name` is the
/// directory charts were rendered into, as linked from the index.
pub fn write_index(path: &Path, render_dir_name: &str, entities: &[ImageCount]) -> Result<()> {
    debug!("Writing index to {}", path.display());

    let html = build_index(render_dir_name, entities);
    std::fs::write(path, html)
        .with_context(|| format!("Failed to write index: {}", path.display()))?;

    Ok(())
}

/// Build the full index page: one table of raw images, one of sums,
/// both sorted by latest count descending.
pub fn build_index(render_dir_name: &str, entities: &[ImageCount]) -> String {
    let mut sorted: Vec<&ImageCount> = entities.iter().collect();
    sorted.sort_by_key(|e| std::cmp::Reverse(e.count));

    let images: Vec<&ImageCount> = sorted.iter().copied().filter(|e| !e.is_sum()).collect();
    let sums: Vec<&ImageCount> = sorted.iter().copied().filter(|e| e.is_sum()).collect();

    let mut out = String::new();

    out.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/materialize/1.0.0/css/materialize.min.css">
    <link rel="stylesheet" href="https://fonts.googleapis.com/css2?family=Material+Symbols+Outlined:opsz,wght,FILL,GRAD@24,400,0,0" />
    <title>Docker pull counts</title>
</head>
<body>
    <div class="row flex">
"#,
    );

    out.push_str(&build_table("IMAGES", render_dir_name, &images, true));
    out.push_str(&build_table("SUMS", render_dir_name, &sums, false));

    out.push_str(
        r#"    </div>
</body>
</html>
"#,
    );

    out
}

/// Build one table column. Raw images link to their Docker Hub page;
/// sums are synthetic and have no hub page.
fn build_table(
    caption: &str,
    render_dir_name: &str,
    entities: &[&ImageCount],
    link_to_hub: bool,
) -> String {
    let mut table = String::new();

    table.push_str("        <div class=\"col s3\">\n");
    table.push_str("        <table class=\"striped responsive-table\" style=\"margin: 20px\">\n");
    table.push_str(&format!("            <caption>{caption}</caption>\n"));
    table.push_str(
        "            <thead>\n                <tr>\n                    <th>Image</th>\n                    <th>Last count</th>\n                    <th>Chart</th>\n                </tr>\n            </thead>\n            <tbody>\n",
    );

    for entity in entities {
        let name = html_escape(&entity.name);
        let name_cell = if link_to_hub {
            format!("<a href=\"{}{}\">{}</a>", HUB_URL, entity.name, name)
        } else {
            name
        };
        let chart_href = format!("{}/{}.html", render_dir_name, sanitize_name(&entity.name));

        table.push_str("                <tr>\n");
        table.push_str(&format!("                    <td>{name_cell}</td>\n"));
        table.push_str(&format!(
            "                    <td>{}</td>\n",
            entity.human_count()
        ));
        table.push_str(&format!(
            "                    <td><a href=\"{chart_href}\"><span class=\"material-symbols-outlined\">monitoring</span></a></td>\n"
        ));
        table.push_str("                </tr>\n");
    }

    table.push_str("            </tbody>\n        </table>\n        </div>\n");

    table
}
