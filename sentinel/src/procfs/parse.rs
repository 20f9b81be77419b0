//! Parsers for the `/proc` text formats sentinel reads.
//!
//! Pure functions over file contents so they can be tested without a live
//! `/proc`. Anything malformed comes back as `None`.

/// Fields of `/proc/<pid>/stat` used for sampling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFields {
    pub comm: String,
    pub state: char,
    pub utime: u64,
    pub stime: u64,
    pub priority: i64,
    pub nice: i64,
    pub vsize_bytes: u64,
    pub rss_pages: i64,
}

/// Fields after the closing paren, counting from field 3 (state)
const MIN_STAT_FIELDS: usize = 22;

/// Extract command name from `/proc/<pid>/stat`.
/// Format: "pid (comm) state ..."
pub fn extract_comm(stat_line: &str) -> Option<&str> {
    let open = stat_line.find('(')?;
    let close = stat_line.rfind(')')?;
    if open >= close {
        return None;
    }
    Some(&stat_line[open + 1..close])
}

/// Parse a full `/proc/<pid>/stat` line.
///
/// The comm may contain spaces and parentheses, so fields are split only
/// after the last `)`.
pub fn parse_stat(stat_line: &str) -> Option<StatFields> {
    let comm = extract_comm(stat_line)?;
    let close = stat_line.rfind(')')?;
    let fields: Vec<&str> = stat_line[close + 1..].split_whitespace().collect();
    if fields.len() < MIN_STAT_FIELDS {
        return None;
    }
    // Field numbers as documented in proc(5)
    let field = |n: usize| fields[n - 3];

    Some(StatFields {
        comm: comm.to_string(),
        state: field(3).chars().next()?,
        utime: field(14).parse().ok()?,
        stime: field(15).parse().ok()?,
        priority: field(18).parse().ok()?,
        nice: field(19).parse().ok()?,
        vsize_bytes: field(23).parse().ok()?,
        rss_pages: field(24).parse().ok()?,
    })
}

/// Sum every counter on the aggregate `cpu` line of `/proc/stat`
pub fn sum_cpu_line(stat_content: &str) -> Option<u64> {
    let line = stat_content.lines().next()?;
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    let mut total = 0u64;
    let mut seen = false;
    for value in fields.filter_map(|f| f.parse::<u64>().ok()) {
        total = total.saturating_add(value);
        seen = true;
    }
    seen.then_some(total)
}

/// `MemTotal` from `/proc/meminfo`, in kB
pub fn parse_meminfo_total(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

/// First three fields of `/proc/loadavg`
pub fn parse_loadavg(content: &str) -> Option<(f64, f64, f64)> {
    let mut fields = content.split_whitespace().map(str::parse::<f64>);
    match (fields.next()?, fields.next()?, fields.next()?) {
        (Ok(one), Ok(five), Ok(fifteen)) => Some((one, five, fifteen)),
        _ => None,
    }
}

/// First field of `/proc/uptime`, in seconds
pub fn parse_uptime(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

/// Real uid from the `Uid:` line of `/proc/<pid>/status`
pub fn parse_status_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|uid| uid.parse().ok())
}

/// Join NUL-separated `/proc/<pid>/cmdline` arguments with spaces.
///
/// Kernel threads have an empty cmdline, reported as `None`.
pub fn join_cmdline(raw: &[u8]) -> Option<String> {
    let joined: Vec<u8> = raw.iter().map(|&b| if b == 0 { b' ' } else { b }).collect();
    let text = String::from_utf8_lossy(&joined);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a CPU list such as "0-3,8-11" into a count of CPUs
pub fn count_cpu_list(content: &str) -> Option<usize> {
    let mut count = 0usize;
    for range in content.trim().split(',').filter(|r| !r.is_empty()) {
        if let Some((start, end)) = range.split_once('-') {
            let start: usize = start.parse().ok()?;
            let end: usize = end.parse().ok()?;
            count += end.checked_sub(start)? + 1;
        } else {
            range.parse::<usize>().ok()?;
            count += 1;
        }
    }
    (count > 0).then_some(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASH_STAT: &str = "1234 (bash) S 1 1234 1234 34816 1234 4194304 2000 0 0 0 \
                             150 25 0 0 20 0 1 0 12345 23068672 1280 18446744073709551615";

    #[test]
    fn test_extract_comm() {
        let stat = "1234 (my-app) S 1 1234 1234 0 -1 4194304";
        assert_eq!(extract_comm(stat), Some("my-app"));
    }

    #[test]
    fn test_extract_comm_with_parens() {
        // Command names can contain parentheses
        let stat = "1234 (app (v2)) S 1 1234";
        assert_eq!(extract_comm(stat), Some("app (v2)"));
    }

    #[test]
    fn test_parse_stat_fields() {
        let stat = parse_stat(BASH_STAT).unwrap();
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.utime, 150);
        assert_eq!(stat.stime, 25);
        assert_eq!(stat.priority, 20);
        assert_eq!(stat.nice, 0);
        assert_eq!(stat.vsize_bytes, 23_068_672);
        assert_eq!(stat.rss_pages, 1280);
    }

    #[test]
    fn test_parse_stat_comm_with_spaces() {
        let stat = "77 (Web Content) R 1 77 77 0 -1 0 0 0 0 0 \
                    9 1 0 0 20 -5 1 0 1 4096 2";
        let parsed = parse_stat(stat).unwrap();
        assert_eq!(parsed.comm, "Web Content");
        assert_eq!(parsed.state, 'R');
        assert_eq!(parsed.nice, -5);
    }

    #[test]
    fn test_parse_stat_truncated_line() {
        assert!(parse_stat("1234 (bash) S 1 1234").is_none());
        assert!(parse_stat("garbage").is_none());
    }

    #[test]
    fn test_sum_cpu_line() {
        let stat = "cpu  100 20 30 400 5 0 1 0 0 0\ncpu0 50 10 15 200 2 0 0 0 0 0\n";
        assert_eq!(sum_cpu_line(stat), Some(556));
        assert_eq!(sum_cpu_line("intr 1 2 3"), None);
        assert_eq!(sum_cpu_line(""), None);
    }

    #[test]
    fn test_parse_meminfo_total() {
        let meminfo = "MemTotal:       16384000 kB\nMemFree:         1000 kB\n";
        assert_eq!(parse_meminfo_total(meminfo), Some(16_384_000));
        assert_eq!(parse_meminfo_total("MemFree: 10 kB"), None);
    }

    #[test]
    fn test_parse_loadavg_and_uptime() {
        assert_eq!(parse_loadavg("0.52 0.61 0.70 2/512 9999\n"), Some((0.52, 0.61, 0.70)));
        assert_eq!(parse_loadavg("0.52"), None);
        assert_eq!(parse_uptime("3600.25 7000.00\n"), Some(3600.25));
    }

    #[test]
    fn test_parse_status_uid() {
        let status = "Name:\tbash\nState:\tS (sleeping)\nUid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(parse_status_uid(status), Some(1000));
        assert_eq!(parse_status_uid("Name:\tbash\n"), None);
    }

    #[test]
    fn test_join_cmdline() {
        assert_eq!(
            join_cmdline(b"/usr/bin/python3\0-m\0http.server\0"),
            Some("/usr/bin/python3 -m http.server".to_string())
        );
        assert_eq!(join_cmdline(b""), None);
    }

    #[test]
    fn test_count_cpu_list() {
        assert_eq!(count_cpu_list("0-3\n"), Some(4));
        assert_eq!(count_cpu_list("0-3,8-11"), Some(8));
        assert_eq!(count_cpu_list("5"), Some(1));
        assert_eq!(count_cpu_list("x"), None);
    }
}
