use std::time::Duration;

pub(crate) fn parse_duration(arg: &str) -> Result<Duration, String> {
    let seconds: u64 = arg
        .parse()
        .map_err(|_| format!("`{arg}' isn't a valid number of seconds"))?;
    if seconds == 0 {
        return Err("duration must be at least one second".to_string());
    }
    Ok(Duration::from_secs(seconds))
}
