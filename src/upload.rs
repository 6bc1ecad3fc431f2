use std::{
    ops::RangeInclusive,
    path::{Component, Path, PathBuf},
};

use time::OffsetDateTime;

const SEPARATORS: [char; 3] = ['.', '-', '_'];

/// Restricts a client-supplied name to `[A-Za-z0-9._-]`.
///
/// Anything else becomes `_`. Runs of two or more separators collapse to a
/// single `.` if the run held one, `_` otherwise, and separators at either end
/// are dropped, so the result never contains `..` or starts with a dot.
pub fn sanitize_file_name(name: &str) -> String {
    let mapped: Vec<char> = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || SEPARATORS.contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut out = String::with_capacity(mapped.len());
    let mut i = 0;
    while i < mapped.len() {
        let c = mapped[i];
        if !SEPARATORS.contains(&c) {
            out.push(c);
            i += 1;
            continue;
        }

        let run = mapped[i..]
            .iter()
            .take_while(|c| SEPARATORS.contains(c))
            .count();
        out.push(match run {
            1 => c,
            _ if mapped[i..i + run].contains(&'.') => '.',
            _ => '_',
        });
        i += run;
    }

    let trimmed = out.trim_matches(&SEPARATORS[..]);
    if trimmed.is_empty() {
        String::from("file")
    } else {
        trimmed.to_string()
    }
}

/// `<unix millis>-<sanitized name>`.
pub fn stored_file_name(original: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{}-{}", millis, sanitize_file_name(original))
}

/// Joins a request path below `root`, refusing anything but plain names.
pub fn resolve(root: &Path, request: &str) -> Option<PathBuf> {
    let relative = Path::new(request);
    let mut path = root.to_path_buf();
    let mut any = false;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                any = true;
            }
            _ => return None,
        }
    }
    any.then_some(path)
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// A byte position: ASCII digits only, so no sign or whitespace.
fn position(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parses a single-range `Range` header against a file of `size` bytes.
///
/// `None` means the range cannot be satisfied, including headers this
/// server does not understand.
pub fn parse_range(header: &str, size: u64) -> Option<RangeInclusive<u64>> {
    let spec = header.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    let (start, end) = match (start.is_empty(), end.is_empty()) {
        (false, false) => (position(start)?, position(end)?),
        (false, true) => (position(start)?, size.checked_sub(1)?),
        (true, false) => {
            let suffix = position(end)?;
            if suffix == 0 {
                return None;
            }
            (size.saturating_sub(suffix), size.checked_sub(1)?)
        }
        (true, true) => return None,
    };

    if start >= size || end >= size || start > end {
        return None;
    }
    Some(start..=end)
}
