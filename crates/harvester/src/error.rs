/// Errors raised by the metadata gateway, the puller engine, and the
/// schema migrator (§7). `harvester_io::ClientError` covers the two HTTP
/// adapters and is wrapped here rather than duplicated.
#[derive(Debug, thiserror::Error)]
pub enum HarvesterError {
    #[error("invalid identifier: {0:?}")]
    IdentifierInvalid(String),

    #[error("upstream or warehouse client error: {0}")]
    Client(#[from] harvester_io::ClientError),

    #[error("metadata store error: {0}")]
    Metadata(#[from] sqlx::Error),

    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("secret could not be resolved: {0}")]
    SecretUnresolvable(String),

    #[error("warehouse DDL failed for {unit}: {source}")]
    WarehouseSemantic {
        unit: String,
        #[source]
        source: harvester_io::ClientError,
    },

    #[error("backfill cancelled externally")]
    BackfillCancelled,

    #[error("{0}")]
    Other(String),
}
