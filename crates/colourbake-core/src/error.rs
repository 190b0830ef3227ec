/// Errors produced while parsing colour values.
#[derive(Debug, thiserror::Error)]
pub enum ColorError {
    #[error("invalid hex colour '{0}': expected #RRGGBB or #RRGGBBAA")]
    InvalidHex(String),

    #[error("unknown colour strategy '{0}'")]
    UnknownStrategy(String),
}
