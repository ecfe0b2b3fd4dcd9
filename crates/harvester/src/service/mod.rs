pub mod entities;
pub mod implementations;
pub mod migrator;
pub mod puller;

pub use entities::{
    BackfillJob, BackfillStatus, BronzeEventField, BronzeEventTable, FieldRegistryRow,
    IngestionState, IngestionStatus, Project, PullerConfigRow, Source, SourceAuthType,
};
pub use implementations::postgres::PostgresMetadataStore;
pub use migrator::{apply_schema, MigrationResult};
