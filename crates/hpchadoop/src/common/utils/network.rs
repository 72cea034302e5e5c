pub fn get_hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

/// Hostname without the domain part (e.g. `cn710` for `cn710.karolina.it4i.cz`).
pub fn get_short_hostname() -> String {
    short_hostname(&get_hostname()).to_string()
}

fn short_hostname(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}
