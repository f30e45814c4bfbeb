/// A modal dialog that is either on screen or fading out.
///
/// Opening a dialog replaces whatever dialog is open. Closing keeps the
/// dialog around for exactly one more render with a fade-out class; the
/// next `settle` drops it.
#[derive(Debug, Clone)]
pub(crate) struct ModalSlot<M> {
    open: Option<M>,
    closing: Option<M>,
}

impl<M> Default for ModalSlot<M> {
    fn default() -> Self {
        Self {
            open: None,
            closing: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fade {
    In,
    Out,
}

impl Fade {
    pub(crate) fn class(self) -> &'static str {
        match self {
            Fade::In => "fade-in",
            Fade::Out => "fade-out",
        }
    }
}

impl<M> ModalSlot<M> {
    pub(crate) fn open(&mut self, modal: M) {
        self.closing = None;
        self.open = Some(modal);
    }

    pub(crate) fn close(&mut self) {
        if let Some(modal) = self.open.take() {
            self.closing = Some(modal);
        }
    }

    /// Forget a dialog that has finished fading out.
    pub(crate) fn settle(&mut self) {
        self.closing = None;
    }

    pub(crate) fn current(&self) -> Option<&M> {
        self.open.as_ref()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut M> {
        self.open.as_mut()
    }

    /// The dialog to draw, with its transition.
    pub(crate) fn visible(&self) -> Option<(&M, Fade)> {
        match (&self.open, &self.closing) {
            (Some(modal), _) => Some((modal, Fade::In)),
            (None, Some(modal)) => Some((modal, Fade::Out)),
            (None, None) => None,
        }
    }
}
