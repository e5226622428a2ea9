use crate::domain::entities::record::{UnknownValue, ValidationError};
use crate::usecase::pipeline::bulk::BulkError;
use crate::usecase::pipeline::export::ExportError;
use crate::usecase::ports::ai::AiError;
use crate::usecase::ports::repo::StoreError;
use crate::usecase::ports::session::StorageError;
use crate::usecase::services::edit_service::EditError;
use crate::usecase::services::import_service::ImportError;
use crate::usecase::services::request_slot::RequestError;
use crate::usecase::services::session_service::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    UnknownValue(#[from] UnknownValue),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Bulk(#[from] BulkError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
