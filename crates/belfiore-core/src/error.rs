use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Both codeMatcher and province were provided, only one is allowed")]
    ConflictingScope,

    #[error("Parameter fromDate is mandatory passing toDate")]
    ToDateWithoutFromDate,

    #[error("A retriever function or a list of places is needed to build a connector")]
    MissingSource,

    #[error(transparent)]
    Retrieval(anyhow::Error),
}

impl ConnectorError {
    /// True for errors raised while building a connector, as opposed to
    /// failures surfaced by the retriever at query time.
    pub fn is_construction_error(&self) -> bool {
        !matches!(self, ConnectorError::Retrieval(_))
    }
}
