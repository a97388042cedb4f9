use regex::Regex;
use url::Url;

const DEFAULT_FILENAME: &str = "video.mp4";

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_video_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Pull the video id out of a recognised video page URL.
///
/// Accepts `youtube.com/watch?v=`, `/shorts/`, `/embed/`, `/live/` paths on the
/// main, mobile and music hosts, plus `youtu.be/<id>` short links. The scheme
/// may be omitted.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    let parsed = if input.contains("://") {
        Url::parse(input).ok()?
    } else {
        Url::parse(&format!("https://{}", input)).ok()?
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(&host);

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let id = match host {
        "youtu.be" => segments.next()?.to_string(),
        "youtube.com" | "youtube-nocookie.com" => match segments.next()? {
            "watch" => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?,
            "shorts" | "embed" | "live" | "v" => segments.next()?.to_string(),
            _ => return None,
        },
        _ => return None,
    };

    is_video_id(&id).then_some(id)
}

/// Filename announced by a `Content-Disposition` header value.
///
/// `filename*=` (RFC 5987) wins over `filename=`. The value is percent-decoded;
/// anything that would escape the target directory is sanitised.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let extended = Regex::new(r#"(?i)filename\*\s*=\s*[\w!#$%&+^`{}~-]*'[^']*'([^;]+)"#).ok()?;
    let quoted = Regex::new(r#"(?i)filename\s*=\s*"([^"]*)""#).ok()?;
    let bare = Regex::new(r#"(?i)filename\s*=\s*([^";]+)"#).ok()?;

    let raw = extended
        .captures(header)
        .or_else(|| quoted.captures(header))
        .or_else(|| bare.captures(header))
        .map(|caps| caps[1].trim().to_string())?;

    let decoded = urlencoding::decode(&raw)
        .map(|value| value.into_owned())
        .unwrap_or(raw);

    let name = if decoded.contains('/') || decoded.contains('\\') {
        sanitize_filename(&decoded)
    } else {
        decoded
    };

    let name = name.trim().to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Filename used when the backend does not name the file.
pub fn fallback_filename(title: &str, ext: &str) -> String {
    let stem = sanitize_filename(title);
    let stem = stem.trim_matches(|c| c == '.' || c == ' ');
    if stem.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        format!("{}.mp4", stem)
    } else {
        format!("{}.{}", stem, ext)
    }
}
