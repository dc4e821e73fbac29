use arbor_common::Atom;
use thiserror::Error;

/// Errors returned by `render`, `update` and the update driver.
#[derive(Debug, Error)]
pub enum Error {
    /// The native adapter doesn't know how to create this widget type.
    #[error("unknown component type `{type_tag}`")]
    UnknownComponentType { type_tag: Atom },
    /// The property is not valid for the widget type.
    #[error("unsupported property `{key}` on `{type_tag}`")]
    UnsupportedProperty { type_tag: Atom, key: Atom },
    /// A component render function failed.
    #[error("component `{component}` failed to render")]
    ComponentRender {
        component: &'static str,
        #[source]
        source: anyhow::Error,
    },
    /// Attaching or detaching a native listener failed.
    #[error("listener registration failed")]
    Listener(#[source] anyhow::Error),
    /// Any other failure reported by the native toolkit.
    #[error("native adapter error")]
    Adapter(#[source] anyhow::Error),
    /// A handle was requested from an instance that was never bound, or that no longer exists.
    #[error("instance has no native handle")]
    Unbound,
    /// A previous update failed while mutating native objects; the native graph no longer
    /// corresponds to any description tree.
    #[error("rendered state is poisoned by a failed update")]
    Poisoned,
    /// The receiving side of the update queue is gone.
    #[error("update queue closed")]
    QueueClosed,
}

impl Error {
    /// Shorthand for `Error::UnknownComponentType`.
    pub fn unknown_type(type_tag: &Atom) -> Error {
        Error::UnknownComponentType {
            type_tag: type_tag.clone(),
        }
    }

    /// Shorthand for `Error::UnsupportedProperty`.
    pub fn unsupported_property(type_tag: &Atom, key: &Atom) -> Error {
        Error::UnsupportedProperty {
            type_tag: type_tag.clone(),
            key: key.clone(),
        }
    }

    pub(crate) fn is_unsupported_property(&self) -> bool {
        matches!(self, Error::UnsupportedProperty { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
