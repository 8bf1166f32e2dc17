//! Actions: side-effecting nodes that produce no value.
//!
//! Actions have no consumers, so they stay alive only through their block's ordering
//! chain: every action depends on the previous chain head and becomes the new head.

use std::{fmt, sync::Arc};

use crate::{
    graph::{value::write_args, AccessMode, DispatchKind, NodeId, ValueHandle},
    types::ExecutableElement,
};

/// A side-effecting operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Memory write
    Store {
        /// Written location
        handle: ValueHandle,
        /// Stored value
        value: NodeId,
        /// Memory ordering
        mode: AccessMode,
    },
    /// Memory fence
    Fence(AccessMode),
    /// Monitor acquisition on an object
    MonitorEnter(NodeId),
    /// Monitor release on an object
    MonitorExit(NodeId),
    /// Static invocation whose result is discarded
    InvokeStatic {
        /// Resolved target
        target: Arc<ExecutableElement>,
        /// Arguments
        args: Vec<NodeId>,
    },
    /// Instance invocation whose result is discarded
    InvokeInstance {
        /// Dispatch kind
        kind: DispatchKind,
        /// Resolved target
        target: Arc<ExecutableElement>,
        /// Receiver
        receiver: NodeId,
        /// Arguments
        args: Vec<NodeId>,
    },
}

impl Action {
    /// Returns `true` if the action can raise an exception and may be wrapped by a `try`.
    #[must_use]
    pub const fn is_triable(&self) -> bool {
        matches!(self, Self::InvokeStatic { .. } | Self::InvokeInstance { .. })
    }

    pub(crate) fn push_dependencies(&self, out: &mut Vec<NodeId>) {
        match self {
            Self::Store { handle, value, .. } => {
                handle.push_dependencies(out);
                out.push(*value);
            }
            Self::Fence(_) => {}
            Self::MonitorEnter(object) | Self::MonitorExit(object) => out.push(*object),
            Self::InvokeStatic { args, .. } => out.extend(args.iter().copied()),
            Self::InvokeInstance { receiver, args, .. } => {
                out.push(*receiver);
                out.extend(args.iter().copied());
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store {
                handle,
                value,
                mode,
            } => write!(f, "store {mode:?} {handle} = {value}"),
            Self::Fence(mode) => write!(f, "fence {mode:?}"),
            Self::MonitorEnter(object) => write!(f, "monitorenter {object}"),
            Self::MonitorExit(object) => write!(f, "monitorexit {object}"),
            Self::InvokeStatic { target, args } => {
                write!(f, "invokestatic {target}")?;
                write_args(f, args)
            }
            Self::InvokeInstance {
                kind,
                target,
                receiver,
                args,
            } => {
                write!(f, "invoke {kind:?} {receiver}.{target}")?;
                write_args(f, args)
            }
        }
    }
}
