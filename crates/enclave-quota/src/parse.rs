//! Parsers for quota tool output.

/// Number of numeric fields in a `repquota` line.
pub const REPQUOTA_FIELDS: usize = 8;

/// Extracts the mount point from `df -P` output: the last token of the last
/// non-empty line. Output holding only the header yields `None`.
pub fn parse_mount_point(df_output: &str) -> Option<&str> {
    let mut lines = df_output.lines().filter(|line| !line.trim().is_empty());
    let _header = lines.next()?;
    lines.last()?.split_whitespace().last()
}

/// Reads the first eight whitespace-separated unsigned integers of
/// `repquota` output.
///
/// # Errors
///
/// Returns a description of the problem if fewer than eight fields are
/// present or one of them is not an unsigned integer.
pub fn parse_repquota(output: &str) -> Result<[u64; REPQUOTA_FIELDS], String> {
    let mut fields = [0_u64; REPQUOTA_FIELDS];
    let mut tokens = output.split_whitespace();
    for (index, field) in fields.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| {
            format!("expected {REPQUOTA_FIELDS} fields, found {index}")
        })?;
        *field = token
            .parse()
            .map_err(|e| format!("field {} ({token:?}): {e}", index + 1))?;
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_point_is_last_token_of_last_line() {
        let out = "Filesystem 1024-blocks Used Available Capacity Mounted on\n\
                   /dev/sda1 1000 10 990 1% /var/containers\n";
        assert_eq!(parse_mount_point(out), Some("/var/containers"));
    }

    #[test]
    fn mount_point_ignores_trailing_blank_lines() {
        let out = "Filesystem 1024-blocks Used Available Capacity Mounted on\n\
                   overlay 1 1 0 100% /\n\n";
        assert_eq!(parse_mount_point(out), Some("/"));
    }

    #[test]
    fn header_only_has_no_mount_point() {
        assert_eq!(
            parse_mount_point("Filesystem 1024-blocks Used Available Capacity Mounted on\n"),
            None
        );
        assert_eq!(parse_mount_point(""), None);
    }

    #[test]
    fn repquota_fields_in_order() {
        let fields = parse_repquota("0 500 1000 1200 0 300 900 950\n").expect("parse");
        assert_eq!(fields, [0, 500, 1000, 1200, 0, 300, 900, 950]);
    }

    #[test]
    fn repquota_ignores_extra_tokens() {
        let fields = parse_repquota("1 2 3 4 5 6 7 8 9 trailing").expect("parse");
        assert_eq!(fields[7], 8);
    }

    #[test]
    fn short_repquota_line_is_rejected() {
        let reason = parse_repquota("0 500 1000").expect_err("short");
        assert!(reason.contains("found 3"));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let reason = parse_repquota("0 500 abc 1200 0 300 900 950").expect_err("text");
        assert!(reason.contains("field 3"));
        assert!(parse_repquota("0 -1 0 0 0 0 0 0").is_err());
    }
}
