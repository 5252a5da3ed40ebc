use crate::command::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("endpoint inventory unavailable: {0}")]
    InventoryUnavailable(String),

    #[error("failed to enumerate links: {0}")]
    LinkEnumerationFailed(String),

    #[error("failed to enumerate network namespaces: {0}")]
    NamespaceEnumerationFailed(String),

    #[error("failed to switch network namespace: {0}")]
    NamespaceSwitchFailed(String),

    #[error("failed to restore root network namespace: {0}")]
    NamespaceRestoreFailed(String),

    #[error("failed to find primary link: {0}")]
    LinkNotFound(String),

    #[error("failed to list routes: {0}")]
    RouteListFailed(String),

    #[error("no default route found")]
    NoDefaultRoute,

    #[error("failed to set route MTU for {route}: {detail}")]
    RouteMutationFailed { route: String, detail: String },

    #[error("failed to set link MTU for {link}: {detail}")]
    LinkMutationFailed { link: String, detail: String },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts the whole run rather than a single
    /// namespace or link.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigInvalid(_)
                | Error::InventoryUnavailable(_)
                | Error::LinkEnumerationFailed(_)
                | Error::NamespaceEnumerationFailed(_)
                | Error::NamespaceRestoreFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_level_errors_are_fatal() {
        assert!(Error::ConfigInvalid("x".into()).is_fatal());
        assert!(Error::InventoryUnavailable("x".into()).is_fatal());
        assert!(Error::LinkEnumerationFailed("x".into()).is_fatal());
        assert!(Error::NamespaceEnumerationFailed("x".into()).is_fatal());
        assert!(Error::NamespaceRestoreFailed("x".into()).is_fatal());
    }

    #[test]
    fn namespace_level_errors_are_recoverable() {
        assert!(!Error::NamespaceSwitchFailed("x".into()).is_fatal());
        assert!(!Error::LinkNotFound("x".into()).is_fatal());
        assert!(!Error::NoDefaultRoute.is_fatal());
        assert!(
            !Error::RouteMutationFailed {
                route: "default".into(),
                detail: "x".into()
            }
            .is_fatal()
        );
        assert!(
            !Error::LinkMutationFailed {
                link: "eth0".into(),
                detail: "x".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn mutation_errors_name_their_target() {
        let err = Error::LinkMutationFailed {
            link: "lxc12".into(),
            detail: "operation not permitted".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to set link MTU for lxc12: operation not permitted"
        );
    }
}
