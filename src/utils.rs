//! Utility functions for sizes, artifact names and disk space

use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::SystemTime;

/// Prefix of every artifact download URL
pub const DOWNLOAD_URL_PREFIX: &str = "/api/download/file/";

/// Suffixes the extraction backend uses for files it is still writing
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp", ".tmp"];

/// Check whether a filename belongs to an in-progress backend download
///
/// Covers the backend's temporary suffixes and fragment files
/// (`clip.mp4.part-Frag12`).
///
/// # Examples
///
/// ```
/// use vinyltube::utils::is_partial_file;
///
/// assert!(is_partial_file("song_[abc].webm.part"));
/// assert!(is_partial_file("clip_[abc].mp4.part-Frag3"));
/// assert!(!is_partial_file("clip_[abc].mp4"));
/// ```
pub fn is_partial_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    PARTIAL_SUFFIXES.iter().any(|s| lower.ends_with(s)) || lower.contains(".part-frag")
}

/// Build the download URL of an artifact from its filename
pub fn download_url_for(filename: &str) -> String {
    format!("{DOWNLOAD_URL_PREFIX}{}", urlencoding::encode(filename))
}

/// Convert bytes to megabytes, rounded to two decimals
pub fn bytes_to_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

/// Human-readable size label with one decimal (`"12.3 MB"`)
///
/// Returns `None` when the size is unknown.
pub fn format_size_label(bytes: Option<u64>) -> Option<String> {
    bytes.map(|b| format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)))
}

/// Convert a filesystem timestamp to UTC
pub fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Get available disk space for a given path
///
/// Uses platform-specific APIs to query filesystem statistics:
/// - Linux/macOS: statvfs
/// - Windows: GetDiskFreeSpaceExW
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is a valid NUL-terminated string, stat is zero-initialized
        // and only read after statvfs reports success.
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // f_bavail is available blocks for unprivileged users
            #[allow(clippy::unnecessary_cast)]
            let available_bytes = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
            Ok(available_bytes)
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide_path is NUL-terminated and every output pointer refers to a
        // live, aligned u64 that is only read after a successful call.
        unsafe {
            let mut free_bytes_available: u64 = 0;
            let mut _total_bytes: u64 = 0;
            let mut _total_free_bytes: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_bytes_available as *mut u64 as *mut _,
                &mut _total_bytes as *mut u64 as *mut _,
                &mut _total_free_bytes as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_bytes_available)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = path;
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Disk space checking is not supported on this platform",
        ))
    }
}
