use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    /// Neither an explicit write adapter nor a registered default exists.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("invalid config: {0}")]
    Config(String),
}

impl MapperError {
    pub fn no_adapter() -> Self { Self::Configuration("no data adapter available".into()) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            MapperError::Configuration(_) => 2001,
            MapperError::Config(_) => 2002,
            MapperError::Database(_) => 2100,
        }
    }
}

impl From<sea_orm::DbErr> for MapperError {
    fn from(e: sea_orm::DbErr) -> Self { Self::Database(e.to_string()) }
}
