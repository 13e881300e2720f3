use netcoord_topology::{ElementId, RouteError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("topology has no adjacency entry for element {0}")]
    MissingAdjacency(ElementId),

    #[error("element {0} is not a node of the topology")]
    UnknownNode(ElementId),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    /// The topology adapter broke its contract. Such errors are fatal and not worth retrying.
    pub fn is_input_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::MissingAdjacency(_) | Error::UnknownNode(_) | Error::Route(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
