//! Creation-date resolution.
//!
//! Every scanned file gets exactly one `(year, month)` and a provenance tag
//! describing which source supplied it. Sources form a strict fallback
//! chain; the first tier that yields any valid date wins, even when a later
//! tier would produce an earlier one:
//!
//! 1. External exiftool metadata (supplied by the caller as a key/value map)
//! 2. Embedded metadata (EXIF for images, Info dictionary for PDFs)
//! 3. A year/month encoded in the file name
//! 4. Filesystem birth time
//! 5. Filesystem change time (ctime)
//! 6. Filesystem modification time (mtime)
//! 7. The current date
//!
//! Within a single multi-valued tier (several exiftool tags, several EXIF
//! fields) the earliest valid date wins. Resolution never fails; tier 7 is
//! unconditional.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, Metadata};
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;
use std::time::SystemTime;

/// Key/value metadata as returned by the external exiftool process.
pub type ToolMetadata = HashMap<String, String>;

/// Exiftool date tags probed in tier 1, in probe order.
pub const EXIFTOOL_DATE_TAGS: [&str; 7] = [
    "DateTimeOriginal",
    "CreateDate",
    "CreationDate",
    "ModifyDate",
    "FileCreateDate",
    "FileModifyDate",
    "FileInodeChangeDate",
];

/// Dates at or before this year are treated as implausible and rejected.
const MIN_YEAR: i32 = 1900;

/// Dates further in the future than this are treated as clock noise.
const SKEW_TOLERANCE_DAYS: i64 = 2;

/// The resolved calendar period of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedDate {
    pub year: i32,
    /// 1-based month, always in 1..=12.
    pub month: u32,
}

impl From<NaiveDateTime> for ResolvedDate {
    fn from(dt: NaiveDateTime) -> Self {
        ResolvedDate {
            year: dt.year(),
            month: dt.month(),
        }
    }
}

/// Which tier of the resolution chain supplied a date.
///
/// The `Display` form is persisted verbatim in the CSV report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// External exiftool metadata; carries the winning tag name.
    ExifTool(String),
    /// Embedded EXIF or PDF metadata.
    Metadata,
    /// Year/month parsed out of the file name.
    Filename,
    /// Filesystem birth time.
    Birthtime,
    /// Filesystem change time.
    Ctime,
    /// Filesystem modification time.
    Mtime,
    /// Unconditional fallback to the scan date.
    Unknown,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::ExifTool(tag) => write!(f, "exiftool:{}", tag),
            Provenance::Metadata => write!(f, "metadata"),
            Provenance::Filename => write!(f, "filename"),
            Provenance::Birthtime => write!(f, "birthtime"),
            Provenance::Ctime => write!(f, "ctime"),
            Provenance::Mtime => write!(f, "mtime"),
            Provenance::Unknown => write!(f, "unknown"),
        }
    }
}

/// Closed set of file kinds for embedded-metadata extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Other,
}

impl FileKind {
    /// Detects the kind of a file, preferring content sniffing over the
    /// extension.
    ///
    /// Uses the `infer` crate to inspect magic bytes; falls back to the
    /// extension when the file cannot be read or the content is not
    /// recognized.
    pub fn detect(path: &Path) -> FileKind {
        if let Ok(Some(kind)) = infer::get_from_path(path) {
            let mime = kind.mime_type();
            if mime.starts_with("image/") {
                return FileKind::Image;
            }
            if mime == "application/pdf" {
                return FileKind::Pdf;
            }
        }

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg" | "png" | "gif" | "tif" | "tiff" | "heic" | "webp" | "bmp") => {
                FileKind::Image
            }
            Some("pdf") => FileKind::Pdf,
            _ => FileKind::Other,
        }
    }
}

/// Filesystem timestamps for one file, already converted to local time.
///
/// Absent or implausible values (epoch zero, pre-epoch) are `None` so the
/// resolver can fall through cleanly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTimes {
    pub birthtime: Option<DateTime<Local>>,
    pub ctime: Option<DateTime<Local>>,
    pub mtime: Option<DateTime<Local>>,
}

impl FileTimes {
    /// Extracts birth/change/modification times from file metadata.
    ///
    /// Birth time is only available on platforms that expose it; ctime is
    /// unix-only. Either being absent is normal and handled by the
    /// resolution chain.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let birthtime = metadata.created().ok().and_then(system_time_to_local);
        let mtime = metadata.modified().ok().and_then(system_time_to_local);

        #[cfg(unix)]
        let ctime = {
            use chrono::TimeZone;
            use std::os::unix::fs::MetadataExt;

            let secs = metadata.ctime();
            if secs > 0 {
                Local.timestamp_opt(secs, 0).single()
            } else {
                None
            }
        };
        #[cfg(not(unix))]
        let ctime = None;

        FileTimes {
            birthtime,
            ctime,
            mtime,
        }
    }
}

fn system_time_to_local(time: SystemTime) -> Option<DateTime<Local>> {
    // Epoch zero and pre-epoch values are placeholders, not real dates.
    let elapsed = time.duration_since(SystemTime::UNIX_EPOCH).ok()?;
    if elapsed.as_secs() == 0 {
        return None;
    }
    Some(DateTime::<Local>::from(time))
}

/// Resolves the creation date of a file.
///
/// Never fails: the final tier falls back to the current date with
/// provenance [`Provenance::Unknown`].
///
/// # Arguments
///
/// * `path` - The file being resolved; used for kind detection (tier 2)
///   and file-name parsing (tier 3)
/// * `tool_meta` - Already-fetched exiftool output, or `None` when the
///   tool is unavailable or produced nothing
/// * `times` - Filesystem timestamps gathered by the scanner
pub fn resolve(
    path: &Path,
    tool_meta: Option<&ToolMetadata>,
    times: &FileTimes,
) -> (ResolvedDate, Provenance) {
    let now = Local::now().naive_local();

    // Tier 1: external tool metadata. Earliest valid date across the
    // probed tags wins; the tag name is carried into the provenance.
    if let Some(meta) = tool_meta {
        let mut best: Option<(&str, NaiveDateTime)> = None;
        for tag in EXIFTOOL_DATE_TAGS {
            let Some(value) = meta.get(tag) else { continue };
            let Some(dt) = parse_datetime(value) else {
                continue;
            };
            if plausible(dt, now) && best.is_none_or(|(_, b)| dt < b) {
                best = Some((tag, dt));
            }
        }
        if let Some((tag, dt)) = best {
            return (ResolvedDate::from(dt), Provenance::ExifTool(tag.to_string()));
        }
    }

    // Tier 2: embedded metadata, dispatched over the file kind.
    let embedded = embedded_candidates(path, FileKind::detect(path));
    if let Some(dt) = embedded.into_iter().filter(|dt| plausible(*dt, now)).min() {
        return (ResolvedDate::from(dt), Provenance::Metadata);
    }

    // Tier 3: year/month encoded in the file name.
    if let Some(name) = path.file_name().and_then(|name| name.to_str())
        && let Some(date) = parse_filename_date(name)
        && plausible_period(date, now)
    {
        return (date, Provenance::Filename);
    }

    // Tiers 4-6: filesystem timestamps, most authoritative first.
    let fs_tiers = [
        (times.birthtime, Provenance::Birthtime),
        (times.ctime, Provenance::Ctime),
        (times.mtime, Provenance::Mtime),
    ];
    for (time, provenance) in fs_tiers {
        if let Some(dt) = time
            && plausible(dt.naive_local(), now)
        {
            return (ResolvedDate::from(dt.naive_local()), provenance);
        }
    }

    // Tier 7: unconditional fallback to the scan date.
    (ResolvedDate::from(now), Provenance::Unknown)
}

/// A parsed date is plausible if it is after 1900 and not further in the
/// future than the skew tolerance.
fn plausible(dt: NaiveDateTime, now: NaiveDateTime) -> bool {
    dt.year() > MIN_YEAR && dt <= now + Duration::days(SKEW_TOLERANCE_DAYS)
}

fn plausible_period(date: ResolvedDate, now: NaiveDateTime) -> bool {
    NaiveDate::from_ymd_opt(date.year, date.month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .is_some_and(|dt| plausible(dt, now))
}

/// Parses a date string in any of the formats exiftool and embedded
/// metadata produce.
///
/// Tries the explicit `YYYY:MM:DD`, `YYYY-MM-DD` and `YYYY/MM/DD` forms
/// first, then falls back to extracting the digits and reading them as a
/// compact `YYYYMMDD[HH[MM[SS]]]` value. The compact form also covers PDF
/// `D:YYYYMMDDHHMMSS` strings.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    parse_datetime_compact(value)
}

fn parse_datetime_compact(value: &str) -> Option<NaiveDateTime> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return None;
    }

    let date = NaiveDate::parse_from_str(&digits[..8], "%Y%m%d").ok()?;
    let field = |range: std::ops::Range<usize>| -> u32 {
        digits
            .get(range)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };
    let hour = if digits.len() >= 10 { field(8..10) } else { 0 };
    let minute = if digits.len() >= 12 { field(10..12) } else { 0 };
    let second = if digits.len() >= 14 { field(12..14) } else { 0 };

    // and_hms_opt rejects out-of-range components (e.g. hour 27).
    date.and_hms_opt(hour, minute, second)
}

fn year_regex() -> &'static Regex {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    YEAR_RE.get_or_init(|| Regex::new(r"(?:19|20)\d\d").expect("static regex must compile"))
}

/// Scans a file name for an anchored `YYYY` or `YYYY-MM` date.
///
/// The year must be 19xx or 20xx and bounded by non-digit characters or
/// the string edges, so digit runs like serial numbers never match. An
/// optional two-digit month may follow, separated by `-`, `_`, or
/// nothing; it must itself be digit-bounded and in 1..=12. A year without
/// a usable month resolves to January.
pub fn parse_filename_date(name: &str) -> Option<ResolvedDate> {
    let bytes = name.as_bytes();

    for m in year_regex().find_iter(name) {
        if m.start() > 0 && bytes[m.start() - 1].is_ascii_digit() {
            continue;
        }
        // The regex only matches four ASCII digits.
        let year: i32 = m.as_str().parse().ok()?;

        let mut pos = m.end();
        if pos < bytes.len() && (bytes[pos] == b'-' || bytes[pos] == b'_') {
            pos += 1;
        }
        if pos + 2 <= bytes.len()
            && bytes[pos].is_ascii_digit()
            && bytes[pos + 1].is_ascii_digit()
            && (pos + 2 == bytes.len() || !bytes[pos + 2].is_ascii_digit())
        {
            let month: u32 = name[pos..pos + 2].parse().ok()?;
            if (1..=12).contains(&month) {
                return Some(ResolvedDate { year, month });
            }
        }

        // Year-only match; the year itself must still be digit-bounded.
        if m.end() == bytes.len() || !bytes[m.end()].is_ascii_digit() {
            return Some(ResolvedDate { year, month: 1 });
        }
    }
    None
}

/// Collects embedded metadata dates for one file.
///
/// All failures (unreadable file, malformed metadata, missing fields) are
/// tier failures: the result is simply empty and resolution falls through.
fn embedded_candidates(path: &Path, kind: FileKind) -> Vec<NaiveDateTime> {
    match kind {
        FileKind::Image => image_datetimes(path),
        FileKind::Pdf => pdf_datetimes(path),
        FileKind::Other => Vec::new(),
    }
}

fn image_datetimes(path: &Path) -> Vec<NaiveDateTime> {
    const TAGS: [exif::Tag; 3] = [
        exif::Tag::DateTimeOriginal,
        exif::Tag::DateTimeDigitized,
        exif::Tag::DateTime,
    ];

    let Ok(file) = File::open(path) else {
        return Vec::new();
    };
    let mut reader = BufReader::new(file);
    let Ok(data) = exif::Reader::new().read_from_container(&mut reader) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for tag in TAGS {
        let Some(field) = data.get_field(tag, exif::In::PRIMARY) else {
            continue;
        };
        if let exif::Value::Ascii(ref values) = field.value {
            for raw in values {
                if let Some(dt) = parse_datetime(&String::from_utf8_lossy(raw)) {
                    candidates.push(dt);
                }
            }
        }
    }
    candidates
}

fn pdf_datetimes(path: &Path) -> Vec<NaiveDateTime> {
    const KEYS: [&[u8]; 2] = [b"CreationDate", b"ModDate"];

    let Ok(document) = lopdf::Document::load(path) else {
        return Vec::new();
    };
    let Ok(info) = document.trailer.get(b"Info") else {
        return Vec::new();
    };
    let dict = match info {
        lopdf::Object::Reference(id) => {
            match document.get_object(*id).and_then(|obj| obj.as_dict()) {
                Ok(dict) => dict,
                Err(_) => return Vec::new(),
            }
        }
        lopdf::Object::Dictionary(dict) => dict,
        _ => return Vec::new(),
    };

    let mut candidates = Vec::new();
    for key in KEYS {
        if let Ok(obj) = dict.get(key)
            && let Ok(raw) = obj.as_str()
            && let Some(dt) = parse_datetime(&String::from_utf8_lossy(raw))
        {
            candidates.push(dt);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> ToolMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_datetime_explicit_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 7, 4)
            .unwrap()
            .and_hms_opt(10, 30, 5)
            .unwrap();

        assert_eq!(parse_datetime("2021:07:04 10:30:05"), Some(expected));
        assert_eq!(parse_datetime("2021-07-04 10:30:05"), Some(expected));
        assert_eq!(parse_datetime("2021/07/04 10:30:05"), Some(expected));
    }

    #[test]
    fn test_parse_datetime_compact_and_pdf() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(parse_datetime("D:20200102030405+01'00'"), Some(expected));

        let date_only = NaiveDate::from_ymd_opt(2019, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("20191231"), Some(date_only));
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("2020:13:01 00:00:00"), None); // month 13
        assert_eq!(parse_datetime("1234"), None); // too few digits
    }

    #[test]
    fn test_parse_datetime_leap_year() {
        assert!(parse_datetime("2020:02:29 12:00:00").is_some());
        assert!(parse_datetime("2021:02:29 12:00:00").is_none());
    }

    #[test]
    fn test_filename_year_and_month() {
        assert_eq!(
            parse_filename_date("IMG_2021-07_vacation.jpg"),
            Some(ResolvedDate {
                year: 2021,
                month: 7
            })
        );
        assert_eq!(
            parse_filename_date("scan_2019_11.pdf"),
            Some(ResolvedDate {
                year: 2019,
                month: 11
            })
        );
        assert_eq!(
            parse_filename_date("201907_berlin.png"),
            Some(ResolvedDate {
                year: 2019,
                month: 7
            })
        );
    }

    #[test]
    fn test_filename_year_only_defaults_to_january() {
        assert_eq!(
            parse_filename_date("taxes 2018.pdf"),
            Some(ResolvedDate {
                year: 2018,
                month: 1
            })
        );
    }

    #[test]
    fn test_filename_serial_numbers_do_not_match() {
        assert_eq!(parse_filename_date("invoice123456.pdf"), None);
        // Unbounded digit runs never anchor a year.
        assert_eq!(parse_filename_date("photo20210712.jpg"), None);
        assert_eq!(parse_filename_date("IMG_1234.jpg"), None);
    }

    #[test]
    fn test_filename_invalid_month_falls_back_to_year() {
        assert_eq!(
            parse_filename_date("report_2020-13.txt"),
            Some(ResolvedDate {
                year: 2020,
                month: 1
            })
        );
    }

    #[test]
    fn test_exiftool_tier_beats_filename_tier() {
        // The filename would resolve to 2020, but tier 1 is authoritative
        // even though its date is numerically earlier.
        let tool = meta(&[("DateTimeOriginal", "2019-03-05 10:00:00")]);
        let (date, provenance) = resolve(
            Path::new("holiday_2020.txt"),
            Some(&tool),
            &FileTimes::default(),
        );

        assert_eq!(
            date,
            ResolvedDate {
                year: 2019,
                month: 3
            }
        );
        assert_eq!(provenance, Provenance::ExifTool("DateTimeOriginal".into()));
    }

    #[test]
    fn test_exiftool_earliest_tag_wins_within_tier() {
        let tool = meta(&[
            ("CreateDate", "2018-06-01 00:00:00"),
            ("ModifyDate", "2016-02-10 08:00:00"),
        ]);
        let (date, provenance) =
            resolve(Path::new("doc.txt"), Some(&tool), &FileTimes::default());

        assert_eq!(
            date,
            ResolvedDate {
                year: 2016,
                month: 2
            }
        );
        assert_eq!(provenance, Provenance::ExifTool("ModifyDate".into()));
    }

    #[test]
    fn test_implausible_tool_dates_fall_through() {
        let tool = meta(&[("DateTimeOriginal", "1850-01-01 00:00:00")]);
        let (date, provenance) = resolve(
            Path::new("etching_1995.png"),
            Some(&tool),
            &FileTimes::default(),
        );

        assert_eq!(
            date,
            ResolvedDate {
                year: 1995,
                month: 1
            }
        );
        assert_eq!(provenance, Provenance::Filename);
    }

    #[test]
    fn test_filename_tier_beats_file_times() {
        use chrono::TimeZone;

        let times = FileTimes {
            mtime: Local.with_ymd_and_hms(2010, 5, 1, 12, 0, 0).single(),
            ..FileTimes::default()
        };
        let (date, provenance) = resolve(Path::new("IMG_2021-07.jpg"), None, &times);

        assert_eq!(
            date,
            ResolvedDate {
                year: 2021,
                month: 7
            }
        );
        assert_eq!(provenance, Provenance::Filename);
    }

    #[test]
    fn test_mtime_fallback() {
        use chrono::TimeZone;

        let times = FileTimes {
            mtime: Local.with_ymd_and_hms(2015, 9, 20, 12, 0, 0).single(),
            ..FileTimes::default()
        };
        let (date, provenance) = resolve(Path::new("notes.txt"), None, &times);

        assert_eq!(
            date,
            ResolvedDate {
                year: 2015,
                month: 9
            }
        );
        assert_eq!(provenance, Provenance::Mtime);
    }

    #[test]
    fn test_birthtime_preferred_over_mtime() {
        use chrono::TimeZone;

        let times = FileTimes {
            birthtime: Local.with_ymd_and_hms(2012, 3, 1, 0, 0, 0).single(),
            ctime: Local.with_ymd_and_hms(2013, 4, 1, 0, 0, 0).single(),
            mtime: Local.with_ymd_and_hms(2014, 5, 1, 0, 0, 0).single(),
        };
        let (date, provenance) = resolve(Path::new("notes.txt"), None, &times);

        assert_eq!(
            date,
            ResolvedDate {
                year: 2012,
                month: 3
            }
        );
        assert_eq!(provenance, Provenance::Birthtime);
    }

    #[test]
    fn test_resolution_never_fails() {
        let now = Local::now();
        let (date, provenance) = resolve(Path::new("mystery.bin"), None, &FileTimes::default());

        assert_eq!(date.year, now.year());
        assert_eq!(date.month, now.month());
        assert_eq!(provenance, Provenance::Unknown);
    }

    #[test]
    fn test_future_filename_year_rejected() {
        let (_, provenance) = resolve(Path::new("2099_plan.txt"), None, &FileTimes::default());
        assert_eq!(provenance, Provenance::Unknown);
    }

    #[test]
    fn test_provenance_display() {
        assert_eq!(
            Provenance::ExifTool("CreateDate".into()).to_string(),
            "exiftool:CreateDate"
        );
        assert_eq!(Provenance::Metadata.to_string(), "metadata");
        assert_eq!(Provenance::Filename.to_string(), "filename");
        assert_eq!(Provenance::Birthtime.to_string(), "birthtime");
        assert_eq!(Provenance::Ctime.to_string(), "ctime");
        assert_eq!(Provenance::Mtime.to_string(), "mtime");
        assert_eq!(Provenance::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_file_kind_extension_fallback() {
        assert_eq!(FileKind::detect(Path::new("missing.JPG")), FileKind::Image);
        assert_eq!(FileKind::detect(Path::new("missing.pdf")), FileKind::Pdf);
        assert_eq!(FileKind::detect(Path::new("missing.txt")), FileKind::Other);
        assert_eq!(FileKind::detect(Path::new("missing")), FileKind::Other);
    }
}
