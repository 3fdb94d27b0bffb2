//! The two-sided link state of a proxy.
//!
//! A proxy is linked to a native entity on one side and a script object
//! on the other. Either side can let go first. [`LinkState::sever`] is
//! the only transition out of `Attached`, and it reports
//! [`Transition::Release`] exactly once per attachment no matter how the
//! two sides interleave or how often they repeat themselves.

/// Which side of a proxy is letting go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The native engine destroyed the entity.
    Native,
    /// The script host finalized the peer object.
    Script,
}

/// Lifecycle state of a proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Fresh from the pool, not yet linked.
    #[default]
    Unattached,
    /// Linked on both sides.
    Attached,
    /// The native side is gone; waiting for the script finalizer.
    NativeDetached,
    /// The script side is gone; waiting for the native side.
    ScriptFinalized,
    /// Both sides are gone.
    Released,
}

/// What the caller must do after a [`LinkState::sever`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// One side severed; the other is still linked.
    Pending,
    /// Both sides are now severed. Return the proxy to its pool.
    Release,
    /// Nothing changed (repeat, or not attached).
    Ignored,
}

impl LinkState {
    /// `Unattached -> Attached`. Returns `false` from any other state.
    pub fn attach(&mut self) -> bool {
        if *self == LinkState::Unattached {
            *self = LinkState::Attached;
            true
        } else {
            false
        }
    }

    /// Record that `side` has let go.
    pub fn sever(&mut self, side: Side) -> Transition {
        use LinkState::*;
        match (*self, side) {
            (Attached, Side::Native) => {
                *self = NativeDetached;
                Transition::Pending
            }
            (Attached, Side::Script) => {
                *self = ScriptFinalized;
                Transition::Pending
            }
            (NativeDetached, Side::Script) | (ScriptFinalized, Side::Native) => {
                *self = Released;
                Transition::Release
            }
            _ => Transition::Ignored,
        }
    }

    /// Whether the native side is still linked.
    pub fn native_linked(self) -> bool {
        matches!(self, LinkState::Attached | LinkState::ScriptFinalized)
    }

    /// Whether the script side is still linked.
    pub fn script_linked(self) -> bool {
        matches!(self, LinkState::Attached | LinkState::NativeDetached)
    }
}
