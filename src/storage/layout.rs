//! Key layout for the sync bucket
//!
//! ```text
//! {domain}/snowflake-copy/{data_type}[-test]/{YYYY}/{MM}/{DD}/{HH}/{file}   pulled pages
//! {domain}/snowflake-copy/{custom_folder}/{file}                           pulled pages, explicit range
//! {domain}/snowflake-copy/{data_type}[-test]/{state}.txt                   resumption state
//! {domain}/payload/{specifier}/{YYYY}/{MM}/{DD}/{HH}/{file}                 push input
//! ```

use chrono::NaiveDateTime;

/// Root folder for pulled data and state
pub const PULL_ROOT: &str = "snowflake-copy";

/// Root folder for push payloads
pub const PUSH_ROOT: &str = "payload";

/// Folder name for a data type, suffixed in test mode
pub fn data_type_folder(data_type: &str, test_mode: bool) -> String {
    if test_mode {
        format!("{data_type}-test")
    } else {
        data_type.to_string()
    }
}

fn hour_partition(ts: &NaiveDateTime) -> String {
    ts.format("%Y/%m/%d/%H").to_string()
}

/// Date-partitioned folder for pulled pages
pub fn pull_dir(domain: &str, data_type: &str, test_mode: bool, event_time: &NaiveDateTime) -> String {
    format!(
        "{domain}/{PULL_ROOT}/{}/{}",
        data_type_folder(data_type, test_mode),
        hour_partition(event_time)
    )
}

/// Operator-chosen folder for pages pulled over an explicit range
pub fn custom_dir(domain: &str, folder: &str) -> String {
    format!("{domain}/{PULL_ROOT}/{}", folder.trim_matches('/'))
}

/// Key of a resumption state file
pub fn state_key(domain: &str, data_type: &str, test_mode: bool, stem: &str) -> String {
    format!(
        "{domain}/{PULL_ROOT}/{}/{stem}.txt",
        data_type_folder(data_type, test_mode)
    )
}

/// Folder holding the payloads to push for the event hour
pub fn push_dir(domain: &str, specifier: &str, event_time: &NaiveDateTime) -> String {
    format!(
        "{domain}/{PUSH_ROOT}/{specifier}/{}",
        hour_partition(event_time)
    )
}

/// Filename for a time-indexed page: `{data_type}_{start}_{end}.json`
pub fn segment_filename(data_type: &str, segment_start: &str, segment_end: &str) -> String {
    format!("{data_type}_{segment_start}_{segment_end}.json")
}

/// Filename for a cursor page: `{data_type}_{start}_{end}_{n}.json`
pub fn sequence_filename(data_type: &str, window_start: &str, window_end: &str, n: u32) -> String {
    format!("{data_type}_{window_start}_{window_end}_{n}.json")
}

/// Join a folder and a filename
pub fn join(dir: &str, filename: &str) -> String {
    format!("{}/{filename}", dir.trim_end_matches('/'))
}
