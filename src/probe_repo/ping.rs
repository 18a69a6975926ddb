// OS `ping` invocation and reply parsing.

use crate::models::PingReply;
use std::time::Duration;

/// Arguments for a single echo with a bounded wait.
pub(super) fn ping_args(address: &str, wait: Duration) -> Vec<String> {
    #[cfg(target_os = "windows")]
    {
        vec![
            "-n".into(),
            "1".into(),
            "-w".into(),
            wait.as_millis().to_string(),
            address.into(),
        ]
    }
    #[cfg(target_os = "macos")]
    {
        // macOS -W is milliseconds
        vec![
            "-c".into(),
            "1".into(),
            "-W".into(),
            wait.as_millis().to_string(),
            address.into(),
        ]
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // Linux -W is whole seconds
        let secs = wait.as_secs_f64().ceil().max(1.0) as u64;
        vec![
            "-c".into(),
            "1".into(),
            "-W".into(),
            secs.to_string(),
            address.into(),
        ]
    }
}

/// Only a reply line ("bytes from" / "Reply from") counts as success.
pub(crate) fn parse_ping_reply(stdout: &str, address: &str, seq: u64) -> PingReply {
    let Some(line) = stdout
        .lines()
        .find(|l| l.contains("bytes from") || l.contains("Reply from"))
    else {
        return PingReply::timeout(address, seq);
    };

    let latency_ms = ["time=", "time<", "time "]
        .iter()
        .find_map(|key| line.find(key).map(|pos| &line[pos + key.len()..]))
        .and_then(|rest| leading_number(rest).parse::<f64>().ok());

    let lower = line.to_lowercase();
    let ttl = lower
        .find("ttl=")
        .and_then(|pos| leading_number(&lower[pos + 4..]).parse::<u32>().ok());

    PingReply {
        address: address.to_string(),
        seq,
        success: true,
        latency_ms,
        ttl,
    }
}

fn leading_number(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}
