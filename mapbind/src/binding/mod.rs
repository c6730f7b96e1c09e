//! [Bindings](Binding) link a declarative descriptor to the engine resources it stands for.
//!
//! Every binding kind follows the same lifecycle. [`Binding::attach`] runs once when the binding
//! enters the tree and returns a token describing what it did. [`Binding::detach`] runs once when
//! the binding leaves the tree and undoes exactly that, leaving resources created by other
//! bindings alone.
//!
//! There are currently 4 kinds of bindings:
//! * [`SourceBinding`] - registers a data source.
//! * [`LayerBinding`] - registers a style layer at a given position in the draw order.
//! * [`EventBinding`] (and its [`ClickBinding`] and [`OnLoadBinding`] shortcuts) - subscribes
//!   to map events, optionally only over features of one layer.
//! * [`MarkerBinding`] - places a point overlay with an optional popup.

use crate::handle::MapHandle;

mod event;
mod layer;
mod marker;
mod source;

pub use event::{ClickBinding, EventBinding, EventState, EventToken, OnLoadBinding};
pub use layer::{LayerBinding, LayerToken};
pub use marker::{MarkerBinding, MarkerToken, PopupRenderer};
pub use source::{RasterDemSource, SourceBinding, SourceDescriptor, SourceToken};

/// Attach and detach routines of a binding kind.
pub trait Binding {
    /// What [`Binding::detach`] needs to undo an attachment.
    type Token;

    /// Creates the binding's resources on the map, or schedules their creation until the map is
    /// ready for them.
    fn attach(&self, map: &MapHandle) -> Self::Token;

    /// Removes the resources created by the attachment described by `token`, and cancels any
    /// creation that was scheduled but has not happened yet.
    fn detach(&self, map: &MapHandle, token: Self::Token);
}

/// A binding attached to a map, together with its token.
pub struct Mounted<B: Binding> {
    binding: B,
    token: B::Token,
    map: MapHandle,
}

impl<B: Binding> Mounted<B> {
    /// Attaches `binding` to `map`.
    pub fn new(binding: B, map: &MapHandle) -> Self {
        let token = binding.attach(map);
        Self {
            binding,
            token,
            map: map.clone(),
        }
    }

    /// The attached binding.
    pub fn binding(&self) -> &B {
        &self.binding
    }

    /// Token returned by the attachment.
    pub fn token(&self) -> &B::Token {
        &self.token
    }

    /// Detaches the binding, returning it so it can be attached again later.
    pub fn detach(self) -> B {
        let Self {
            binding,
            token,
            map,
        } = self;
        binding.detach(&map, token);
        binding
    }
}

/// Type erased [`Mounted`], so bindings of different kinds can be stored together.
pub(crate) trait MountedBinding {
    fn detach(self: Box<Self>);
}

impl<B: Binding> MountedBinding for Mounted<B> {
    fn detach(self: Box<Self>) {
        Mounted::detach(*self);
    }
}
