// Stable error codes shared by the API error body and the binaries

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
}

pub mod authentication {
    pub const MISSING_TOKEN: &str = "AUTH_2001";
    pub const INVALID_TOKEN: &str = "AUTH_2002";
    pub const INACTIVE_USER: &str = "AUTH_2003";
}

pub mod authorization {
    pub const ACCESS_DENIED: &str = "AUTHZ_3001";
    pub const ADMIN_REQUIRED: &str = "AUTHZ_3002";
}

pub mod database {
    pub const CONNECTION_FAILED: &str = "DB_4001";
    pub const QUERY_FAILED: &str = "DB_4002";
    pub const CONSTRAINT_VIOLATION: &str = "DB_4003";
}

pub mod integrity {
    pub const NO_UNIQUE_KEY: &str = "FORM_5001";
    pub const MISSING_UNIQUE_VALUE: &str = "FORM_5002";
    pub const DUPLICATE_UNIQUE_KEY: &str = "FORM_5003";
    pub const INVALID_SCHEMA: &str = "FORM_5004";
    pub const UNIQUE_VALUE_TOO_LONG: &str = "FORM_5005";
}

pub mod resource {
    pub const NOT_FOUND: &str = "RES_6001";
    pub const CONFLICT: &str = "RES_6002";
}

pub mod system {
    pub const INTERNAL: &str = "SYS_9000";
    pub const SERVER_FAILURE: &str = "SYS_9001";
    pub const INVALID_CONFIGURATION: &str = "SYS_9002";
    pub const LOGGING_FAILURE: &str = "SYS_9003";
}
