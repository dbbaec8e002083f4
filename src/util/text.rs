use chrono::DateTime;

/// Format a YouTrack timestamp (ms since epoch) as a naive UTC ISO-8601 string.
pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp(millis.div_euclid(1000), 0)
        .map(|dt| dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Azure DevOps renders descriptions and comments as HTML, so plain newlines
/// would be collapsed.
pub fn html_line_breaks(text: &str, br: &str) -> String {
    text.replace('\n', &format!("{br}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_millis_as_utc_seconds() {
        assert_eq!(format_timestamp(1_577_836_800_999), "2020-01-01T00:00:00");
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00");
    }

    #[test]
    fn replaces_each_newline() {
        assert_eq!(html_line_breaks("a\n\nb", "<br />"), "a<br />\n<br />\nb");
        assert_eq!(html_line_breaks("single", "<br/>"), "single");
    }
}
