//! Error pages embedded into generated frontends.
//!
//! Pages are looked up by name from a fixed table; asking for a name that is
//! not in the table is a hard generation failure, never a silent omission.

const ACCESS_DENIED: &str = "<html>\n<head><title>Access denied</title></head>\n<body>\n<h1>Access denied</h1>\n<p>You are not authorized to view this page.</p>\n</body>\n</html>\n";

const UNPLANNED_OFFLINE: &str = "<html>\n<head><title>Service temporarily unavailable</title></head>\n<body>\n<h1>Service temporarily unavailable</h1>\n<p>The service is not responding. It will return automatically once its\nbackends recover; no action is required.</p>\n</body>\n</html>\n";

const PLANNED_OFFLINE: &str = "<html>\n<head><title>Service paused for maintenance</title></head>\n<body>\n<h1>Service paused for maintenance</h1>\n<p>An administrator has paused this unit. It will return when maintenance\ncompletes.</p>\n</body>\n</html>\n";

const TIMEOUT: &str = "<html>\n<head><title>Request timed out</title></head>\n<body>\n<h1>Request timed out</h1>\n<p>The backend did not answer in time. Retry shortly.</p>\n</body>\n</html>\n";

/// (HTTP status, asset name) pairs every generated frontend embeds.
pub const FRONTEND_ERROR_PAGES: &[(u16, &str)] = &[
    (403, "access-denied"),
    (500, "unplanned-offline"),
    (502, "unplanned-offline"),
    (503, "planned-offline"),
    (504, "timeout"),
];

pub fn error_page(name: &str) -> Option<&'static str> {
    match name {
        "access-denied" => Some(ACCESS_DENIED),
        "unplanned-offline" => Some(UNPLANNED_OFFLINE),
        "planned-offline" => Some(PLANNED_OFFLINE),
        "timeout" => Some(TIMEOUT),
        _ => None,
    }
}
