//! HTML rendering for the library index page.

use std::fmt::Write;

use music_server_types::TrackEntry;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Music</title>
<link rel="icon" href="/icon.svg" type="image/svg+xml">
<link rel="stylesheet" href="/style.css">
</head>
<body>
<header><img src="/icon.svg" alt="" width="32" height="32"><h1>Music</h1></header>
<audio id="player" controls preload="none"></audio>
"#;

const PAGE_TAIL: &str = r#"<script>
const player = document.getElementById('player');
document.querySelectorAll('a.track').forEach((link) => {
  link.addEventListener('click', (event) => {
    event.preventDefault();
    document.querySelectorAll('li.playing').forEach((li) => li.classList.remove('playing'));
    link.closest('li').classList.add('playing');
    player.src = link.getAttribute('href');
    player.play();
  });
});
</script>
</body>
</html>
"#;

/// Render the index page listing `tracks` in the order given.
pub fn render_index(tracks: &[TrackEntry]) -> String {
    let mut html = String::with_capacity(PAGE_HEAD.len() + PAGE_TAIL.len() + tracks.len() * 160);
    html.push_str(PAGE_HEAD);

    if tracks.is_empty() {
        html.push_str("<p class=\"empty\">No tracks found.</p>\n");
    } else {
        html.push_str("<ul class=\"tracks\">\n");
        for track in tracks {
            let _ = writeln!(
                html,
                "<li><a class=\"track\" href=\"{href}\">{name}</a><span class=\"dir\">{dir}</span>{time}</li>",
                href = escape_html(&play_href(&track.path)),
                name = escape_html(track.file_name()),
                dir = escape_html(track.dir()),
                time = render_time(track.modified_ms),
            );
        }
        html.push_str("</ul>\n");
    }

    html.push_str(PAGE_TAIL);
    html
}

/// `/play/` link for a root-relative path, percent-encoding each segment.
pub fn play_href(path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/play/{encoded}")
}

fn render_time(modified_ms: i64) -> String {
    let nanos = i128::from(modified_ms) * 1_000_000;
    let Ok(at) = OffsetDateTime::from_unix_timestamp_nanos(nanos) else {
        return String::new();
    };
    let Ok(datetime) = at.format(&Rfc3339) else {
        return String::new();
    };
    format!(
        "<time datetime=\"{datetime}\">{:04}-{:02}-{:02} {:02}:{:02}</time>",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
