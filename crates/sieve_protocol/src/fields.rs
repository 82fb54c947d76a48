//! Field names used by the stage chain.
//!
//! Raw appliance exports carry the first seven; the rest are derived.

pub const TIMESTAMP: &str = "Timestamp";
pub const HOSTNAME: &str = "Hostname";
pub const APP_NAME: &str = "AppName";
pub const SEVERITY_LEVEL: &str = "SeverityLevel";
pub const SEVERITY: &str = "Severity";
pub const LOG_TYPE: &str = "LogType";
pub const MESSAGE: &str = "Message";

pub const ROUTING: &str = "routing";
pub const SRC_IP: &str = "srcIP";
pub const DST_IP: &str = "dstIP";
pub const SRC_IP_TYPE: &str = "srcIP_type";
pub const DST_IP_TYPE: &str = "dstIP_type";
pub const PROTOCOL: &str = "protocol";

/// Header of a raw export, in file order.
pub const INPUT_SCHEMA: [&str; 7] = [
    TIMESTAMP,
    HOSTNAME,
    APP_NAME,
    SEVERITY_LEVEL,
    SEVERITY,
    LOG_TYPE,
    MESSAGE,
];

/// Header of the final table after every enrichment stage has run.
pub const FINAL_SCHEMA: [&str; 12] = [
    TIMESTAMP,
    HOSTNAME,
    APP_NAME,
    ROUTING,
    SRC_IP,
    SRC_IP_TYPE,
    DST_IP,
    DST_IP_TYPE,
    PROTOCOL,
    SEVERITY_LEVEL,
    SEVERITY,
    MESSAGE,
];
