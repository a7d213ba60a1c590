//! Text shown in detail panes and confirmation prompts.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::{FileEntryInfo, VolumeInfo};

/// Placeholder for missing values.
pub const NONE: &str = "-";

/// Placeholder for an unset type or creator code.
pub const UNSET_CODE: &str = "????";

/// Formats a byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Converts days since 1970-01-01 into a (year, month, day) civil date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Formats `time` as `YYYY-MM-DD HH:MM` (UTC), or `-` if it predates the
/// epoch floor.
pub fn format_date(time: SystemTime) -> String {
    if !FileEntryInfo::is_meaningful_date(time) {
        return NONE.to_string();
    }
    let Ok(since_epoch) = time.duration_since(UNIX_EPOCH) else {
        return NONE.to_string();
    };
    let secs = since_epoch.as_secs() as i64;
    let (year, month, day) = civil_from_days(secs.div_euclid(86_400));
    let minutes = secs.rem_euclid(86_400) / 60;
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}",
        minutes / 60,
        minutes % 60
    )
}

fn code_or_unset(code: &str) -> &str {
    if code.is_empty() {
        UNSET_CODE
    } else {
        code
    }
}

/// The detail pane for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetails {
    pub name: String,
    pub path: String,
    pub kind: String,
    pub size: String,
    pub created: String,
    pub modified: String,
    pub type_creator: String,
}

impl EntryDetails {
    /// Details with every field shown as `-`, for an empty selection.
    pub fn empty() -> Self {
        Self {
            name: NONE.to_string(),
            path: NONE.to_string(),
            kind: NONE.to_string(),
            size: NONE.to_string(),
            created: NONE.to_string(),
            modified: NONE.to_string(),
            type_creator: NONE.to_string(),
        }
    }

    pub fn from_entry(info: &FileEntryInfo) -> Self {
        let (kind, size, type_creator) = if info.is_directory {
            ("Folder".to_string(), NONE.to_string(), NONE.to_string())
        } else {
            (
                "File".to_string(),
                format_size(info.total_size()),
                format!(
                    "{} / {}",
                    code_or_unset(&info.file_type),
                    code_or_unset(&info.file_creator)
                ),
            )
        };
        Self {
            name: info.name.clone(),
            path: info.path.clone(),
            kind,
            size,
            created: format_date(info.created),
            modified: format_date(info.modified),
            type_creator,
        }
    }

    /// Label/value rows in display order.
    pub fn rows(&self) -> [(&'static str, &str); 7] {
        [
            ("Name", self.name.as_str()),
            ("Path", self.path.as_str()),
            ("Kind", self.kind.as_str()),
            ("Size", self.size.as_str()),
            ("Created", self.created.as_str()),
            ("Modified", self.modified.as_str()),
            ("Type / Creator", self.type_creator.as_str()),
        ]
    }
}

/// The volume information pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSummary {
    rows: Vec<(&'static str, String)>,
}

impl VolumeSummary {
    pub fn new(info: &VolumeInfo) -> Self {
        let rows = vec![
            ("Name", info.name.clone()),
            ("Total Size", format_size(info.total_bytes)),
            ("Used", format_size(info.used_bytes)),
            ("Free", format_size(info.free_bytes)),
            ("Files", info.file_count.to_string()),
            ("Folders", info.folder_count.to_string()),
            (
                "Allocation Block",
                format_size(u64::from(info.allocation_block_size)),
            ),
            ("Clump Size", format_size(u64::from(info.clump_size))),
            ("Modified", format_date(info.modified)),
            ("Backup", format_date(info.backup)),
            ("Flags", format!("0x{:08X}", info.flags)),
            ("Blessed Folder", info.blessed_folder_id.to_string()),
        ];
        Self { rows }
    }

    pub fn rows(&self) -> &[(&'static str, String)] {
        &self.rows
    }
}

fn kind_word(info: &FileEntryInfo) -> &'static str {
    if info.is_directory {
        "folder"
    } else {
        "file"
    }
}

/// Title and message asking to confirm a delete of `items`.
pub fn delete_prompt(items: &[FileEntryInfo]) -> (String, String) {
    match items {
        [only] => {
            let kind = kind_word(only);
            (
                format!("Delete {}?", capitalize(kind)),
                format!("\"{}\" will be permanently deleted.", only.name),
            )
        }
        _ => (
            format!("Delete {} Items?", items.len()),
            "The selected files and folders will be permanently deleted.".to_string(),
        ),
    }
}

/// Title and message asking whether to replace `existing`.
pub fn replace_prompt(existing: &FileEntryInfo) -> (String, String) {
    let kind = kind_word(existing);
    (
        format!("Replace Existing {}?", capitalize(kind)),
        format!(
            "\"{}\" already exists in this location. Replacing it will permanently remove the current {kind}.",
            existing.name
        ),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::epoch_floor;
    use std::time::Duration;

    fn file(name: &str) -> FileEntryInfo {
        FileEntryInfo {
            name: name.to_string(),
            path: format!(":{name}"),
            is_directory: false,
            data_fork_size: 1000,
            resource_fork_size: 1048,
            created: epoch_floor(),
            modified: UNIX_EPOCH,
            file_type: "TEXT".to_string(),
            file_creator: String::new(),
        }
    }

    #[test]
    fn format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn format_size_scaled_units() {
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2.0 GB");
    }

    #[test]
    fn format_date_at_floor() {
        assert_eq!(format_date(epoch_floor()), "1984-01-01 00:00");
    }

    #[test]
    fn format_date_before_floor_is_dash() {
        assert_eq!(format_date(UNIX_EPOCH), "-");
        assert_eq!(format_date(epoch_floor() - Duration::from_secs(1)), "-");
    }

    #[test]
    fn format_date_handles_leap_day() {
        // 2000-02-29T13:45:00Z
        let time = UNIX_EPOCH + Duration::from_secs(951_831_900);
        assert_eq!(format_date(time), "2000-02-29 13:45");
    }

    #[test]
    fn file_details_show_codes_and_total_size() {
        let details = EntryDetails::from_entry(&file("Letter"));

        assert_eq!(details.kind, "File");
        assert_eq!(details.size, "2.0 KB");
        assert_eq!(details.type_creator, "TEXT / ????");
        assert_eq!(details.created, "1984-01-01 00:00");
        assert_eq!(details.modified, "-");
    }

    #[test]
    fn folder_details_hide_size_and_codes() {
        let mut folder = file("Docs");
        folder.is_directory = true;

        let details = EntryDetails::from_entry(&folder);

        assert_eq!(details.kind, "Folder");
        assert_eq!(details.size, "-");
        assert_eq!(details.type_creator, "-");
    }

    #[test]
    fn empty_details_are_dashes() {
        assert!(EntryDetails::empty().rows().iter().all(|(_, v)| *v == "-"));
    }

    #[test]
    fn volume_summary_formats_flags_as_hex() {
        let info = VolumeInfo {
            name: "Macintosh HD".to_string(),
            total_bytes: 8 * 1024 * 1024,
            used_bytes: 1024,
            free_bytes: 8 * 1024 * 1024 - 1024,
            file_count: 3,
            folder_count: 1,
            allocation_block_size: 512,
            clump_size: 2048,
            modified: epoch_floor(),
            backup: UNIX_EPOCH,
            flags: 0x100,
            blessed_folder_id: 2,
        };

        let summary = VolumeSummary::new(&info);
        let value = |label: &str| {
            summary
                .rows()
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(value("Flags"), "0x00000100");
        assert_eq!(value("Total Size"), "8.0 MB");
        assert_eq!(value("Backup"), "-");
        assert_eq!(value("Blessed Folder"), "2");
    }

    #[test]
    fn delete_prompt_single_and_many() {
        let one = delete_prompt(&[file("Letter")]);
        assert_eq!(one.0, "Delete File?");
        assert_eq!(one.1, "\"Letter\" will be permanently deleted.");

        let many = delete_prompt(&[file("a"), file("b"), file("c")]);
        assert_eq!(many.0, "Delete 3 Items?");
    }

    #[test]
    fn replace_prompt_names_kind() {
        let mut folder = file("Docs");
        folder.is_directory = true;

        let (title, message) = replace_prompt(&folder);

        assert_eq!(title, "Replace Existing Folder?");
        assert!(message.ends_with("remove the current folder."));
    }
}
