//! Host integration: the recognition and capability answers a host
//! application asks for before launching the monitor on a resource.

/// Exit code for a resource this tool can monitor.
pub const RECOGNIZED: i32 = 1;
/// Exit code for anything else.
pub const NOT_RECOGNIZED: i32 = -1;

/// Static capability metadata printed by `--info`.
pub const CAPABILITIES: &[&str] = &["input type: http", "input type: https", "forwarding: yes"];

/// Whether `argument` names a resource this tool can monitor.
pub fn identify(argument: &str) -> i32 {
    let argument = argument.trim();
    let is_http = argument
        .get(..4)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http"));
    if is_http {
        RECOGNIZED
    } else {
        NOT_RECOGNIZED
    }
}
