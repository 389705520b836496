//! Server-rendered HTML pages

use crate::recording::RecordingEntry;

const BASE_STYLE: &str = r#"
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
        }
        body {
            background-color: #f5f5f5;
            color: #333;
            line-height: 1.6;
            padding: 20px;
            max-width: 800px;
            margin: 0 auto;
        }
        h1 {
            color: #2c3e50;
            margin-bottom: 30px;
            text-align: center;
            font-size: 2.5em;
        }
        .button, .back-button {
            display: inline-block;
            background-color: #3cb371;
            color: white;
            border-radius: 8px;
            text-decoration: none;
            transition: background-color 0.3s ease;
        }
        .button:hover, .back-button:hover {
            background-color: #2980b9;
        }
        .back-button {
            padding: 10px 20px;
            margin-bottom: 20px;
        }
        @media (max-width: 600px) {
            body { padding: 15px; }
            h1 { font-size: 2em; }
        }
"#;

const HOME_STYLE: &str = r#"
        .button-container {
            display: grid;
            gap: 15px;
            margin-top: 20px;
        }
        .button {
            padding: 15px 25px;
            text-align: center;
            font-size: 1.1em;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
"#;

const RECORDINGS_STYLE: &str = r#"
        .recordings-list {
            background: white;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
            overflow: hidden;
        }
        .recording-link {
            display: block;
            padding: 15px 20px;
            color: #2c3e50;
            text-decoration: none;
            border-bottom: 1px solid #eee;
            transition: background-color 0.3s ease;
        }
        .recording-link:last-child { border-bottom: none; }
        .recording-size { float: right; color: #999; font-size: 0.9em; }
        .recording-link:hover { background-color: #f8f9fa; }
        .empty { padding: 15px 20px; color: #777; text-align: center; }
"#;

const LIVE_STYLE: &str = r#"
        .stream-container {
            background: white;
            padding: 20px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        .stream-container img {
            width: 100%;
            height: auto;
            border-radius: 4px;
        }
"#;

fn layout(title: &str, extra_style: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{BASE_STYLE}{extra_style}    </style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

/// Landing page with links to the catalog and the live view
pub fn home_page() -> String {
    layout(
        "Cat Cam",
        HOME_STYLE,
        r#"    <h1>Cat Cam Bedroom</h1>
    <div class="button-container">
        <a href="/recordings" class="button">View Recordings</a>
        <a href="/live" class="button">View Live Stream</a>
    </div>"#,
    )
}

/// Page embedding the MJPEG feed
pub fn live_page() -> String {
    layout(
        "Live Stream",
        LIVE_STYLE,
        r#"    <a href="/" class="back-button">&larr; Back</a>
    <h1>Live Stream</h1>
    <div class="stream-container">
        <img src="/video_feed" alt="Live Stream">
    </div>"#,
    )
}

/// One link per recording, in the order given
pub fn recordings_page(entries: &[RecordingEntry]) -> String {
    let mut body = String::from(
        r#"    <a href="/" class="back-button">&larr; Back</a>
    <h1>Recordings</h1>
    <div class="recordings-list">
"#,
    );

    if entries.is_empty() {
        body.push_str("        <p class=\"empty\">No recordings yet</p>\n");
    }
    for entry in entries {
        body.push_str(&format!(
            "        <a href=\"/recordings/{}\" class=\"recording-link\">{}<span class=\"recording-size\">{}</span></a>\n",
            urlencoding::encode(&entry.file_name),
            escape_html(&entry.display_label()),
            format_size(entry.size)
        ));
    }
    body.push_str("    </div>");

    layout("Camera Recordings", RECORDINGS_STYLE, &body)
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> RecordingEntry {
        RecordingEntry {
            file_name: name.to_string(),
            size: 0,
            recorded_at: crate::recording::naming::parse_recorded_at(name),
        }
    }

    #[test]
    fn test_home_links() {
        let html = home_page();
        assert!(html.contains(r#"href="/recordings""#));
        assert!(html.contains(r#"href="/live""#));
    }

    #[test]
    fn test_live_embeds_feed() {
        assert!(live_page().contains(r#"<img src="/video_feed""#));
    }

    #[test]
    fn test_recording_links() {
        let html = recordings_page(&[
            entry("recording_20240315_120000.mp4"),
            entry("<b>cat & dog</b>.mp4"),
        ]);
        assert!(html.contains(
            r#"<a href="/recordings/recording_20240315_120000.mp4" class="recording-link">Recording from March 15, 2024 at 12:00 PM<span"#
        ));
        assert!(html.contains("/recordings/%3Cb%3Ecat%20%26%20dog%3C%2Fb%3E.mp4"));
        assert!(html.contains("&lt;b&gt;cat &amp; dog&lt;/b&gt;.mp4"));
        assert!(!html.contains("No recordings yet"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(25 * 1024 * 1024), "25.0 MB");
    }

    #[test]
    fn test_empty_catalog() {
        assert!(recordings_page(&[]).contains("No recordings yet"));
    }
}
