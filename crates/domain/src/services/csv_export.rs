//! CSV rendering of invite codes for spreadsheet download.

use chrono::{DateTime, Utc};

use crate::models::{InviteCode, InviteCodeType};

/// UTF-8 byte-order mark, so spreadsheet tools detect the encoding.
pub const UTF8_BOM: char = '\u{feff}';

pub const CSV_HEADER: [&str; 8] = [
    "code",
    "type",
    "max-uses",
    "used-count",
    "status",
    "created-at",
    "expires-at",
    "note",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Download name for an export produced at `now`.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("invite-codes-{}.csv", now.format("%Y-%m-%d"))
}

fn type_label(code_type: InviteCodeType) -> &'static str {
    match code_type {
        InviteCodeType::Single => "single-use",
        InviteCodeType::Multiple => "multi-use",
        InviteCodeType::Unlimited => "unlimited",
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let row: Vec<String> = fields.into_iter().map(quote).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Renders `codes` in the given order, one row each, after the header.
pub fn render_invite_codes_csv(codes: &[InviteCode]) -> String {
    let mut out = String::new();
    out.push(UTF8_BOM);
    push_row(&mut out, CSV_HEADER);

    for invite in codes {
        let max_uses = if invite.is_unlimited() {
            "unlimited".to_string()
        } else {
            invite.max_uses.to_string()
        };
        let used_count = invite.used_count.to_string();
        let created_at = invite.created_at.format(TIMESTAMP_FORMAT).to_string();
        let expires_at = invite
            .expires_at
            .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "never".to_string());

        push_row(
            &mut out,
            [
                invite.code.as_str(),
                type_label(invite.code_type),
                max_uses.as_str(),
                used_count.as_str(),
                invite.status.as_str(),
                created_at.as_str(),
                expires_at.as_str(),
                invite.note.as_deref().unwrap_or(""),
            ],
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerateOptions, InviteCodeStatus};
    use chrono::TimeZone;

    /// Minimal reader for the quoted format above.
    fn parse_csv(input: &str) -> Vec<Vec<String>> {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                ('"', _) => in_quotes = !in_quotes,
                (',', false) => row.push(std::mem::take(&mut field)),
                ('\n', false) => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                (c, _) => field.push(c),
            }
        }
        rows
    }

    fn invite(code: &str, options: GenerateOptions) -> InviteCode {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        InviteCode::new(code.to_string(), &options, "admin", created)
    }

    #[test]
    fn test_starts_with_bom_and_header() {
        let csv = render_invite_codes_csv(&[]);
        assert!(csv.starts_with(UTF8_BOM));
        assert_eq!(
            csv.trim_start_matches(UTF8_BOM),
            concat!(
                "\"code\",\"type\",\"max-uses\",\"used-count\",",
                "\"status\",\"created-at\",\"expires-at\",\"note\"\n"
            )
        );
    }

    #[test]
    fn test_row_labels() {
        let mut options = GenerateOptions::of_type(InviteCodeType::Unlimited);
        options.note = Some("say \"hi\", please".to_string());
        let mut code = invite("OPEN00000000", options);
        code.used_count = 7;

        let rows = parse_csv(&render_invite_codes_csv(&[code]));
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            vec![
                "OPEN00000000",
                "unlimited",
                "unlimited",
                "7",
                "active",
                "2024-03-09 14:05:07",
                "never",
                "say \"hi\", please",
            ]
        );
    }

    #[test]
    fn test_capped_code_with_expiry() {
        let mut options = GenerateOptions::of_type(InviteCodeType::Multiple);
        options.max_uses = Some(3);
        options.expires_at = Some(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
        let mut code = invite("TEAM00000001", options);
        code.status = InviteCodeStatus::Disabled;

        let rows = parse_csv(&render_invite_codes_csv(&[code]));
        assert_eq!(rows[1][1], "multi-use");
        assert_eq!(rows[1][2], "3");
        assert_eq!(rows[1][4], "disabled");
        assert_eq!(rows[1][6], "2024-12-31 23:59:59");
        assert_eq!(rows[1][7], "");
    }

    #[test]
    fn test_export_filename() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap();
        assert_eq!(export_filename(now), "invite-codes-2024-01-05.csv");
    }
}
