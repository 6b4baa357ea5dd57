//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `ocserv_core::defaults`.

use ocserv_core::defaults;

/// Generate default value functions that forward to ocserv_core::defaults constants.
macro_rules! default_fns {
    // For Copy types (integers, bool, etc.)
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_max_connections       => DEFAULT_MAX_CONNECTIONS: u32,
    default_connect_timeout_secs  => DEFAULT_CONNECT_TIMEOUT_SECS: u64,
    default_action_timeout_secs   => DEFAULT_ACTION_TIMEOUT_SECS: u64,
    default_batch_width           => DEFAULT_BATCH_WIDTH: usize,
    default_channel_capacity      => DEFAULT_CHANNEL_CAPACITY: usize,
}

default_string_fns! {
    default_database_url        => DEFAULT_DATABASE_URL,
    default_credential_backend  => DEFAULT_CREDENTIAL_BACKEND,
    default_ocpasswd            => DEFAULT_OCPASSWD_BIN,
    default_passwd_file         => DEFAULT_PASSWD_FILE,
    default_occtl               => DEFAULT_OCCTL_BIN,
    default_state_file          => DEFAULT_STATE_FILE,
    default_daily_at            => DEFAULT_DAILY_AT,
    default_monthly_at          => DEFAULT_MONTHLY_AT,
    default_meter_source        => DEFAULT_METER_SOURCE,
}
