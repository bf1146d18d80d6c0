use tracing::{debug, error};

use crate::{ConfigError, DropReason};

/// Where a discipline is in its life.
///
/// `Unconfigured → Configured → Operating → Disposed`. A failed validation keeps the
/// discipline `Unconfigured` permanently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DiscState {
    #[default]
    Unconfigured,
    Configured,
    Operating,
    Disposed,
}

/// Lifecycle bookkeeping embedded in every discipline.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: DiscState,
    rejected: bool,
}

impl Lifecycle {
    #[inline]
    pub fn state(&self) -> DiscState {
        self.state
    }

    #[inline]
    pub fn is_operating(&self) -> bool {
        self.state == DiscState::Operating
    }

    /// Whether an earlier validation failed.
    #[inline]
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    /// Fails unless the discipline accepts traffic.
    pub fn ensure_operating(&self) -> Result<(), DropReason> {
        if self.is_operating() {
            Ok(())
        } else {
            Err(DropReason::NotOperating(self.state))
        }
    }

    pub(crate) fn ensure_unconfigured(&self, kind: &'static str) -> Result<(), ConfigError> {
        if self.rejected {
            return Err(ConfigError::Rejected { kind });
        }

        match self.state {
            DiscState::Unconfigured => Ok(()),
            state => Err(ConfigError::AlreadyActivated { kind, state }),
        }
    }

    pub(crate) fn configured(
        &mut self,
        kind: &'static str,
        checked: Result<(), ConfigError>,
    ) -> Result<(), ConfigError> {
        match checked {
            Ok(()) => {
                self.state = DiscState::Configured;
                debug!(kind, "configuration accepted");
                Ok(())
            }
            Err(e) => {
                self.rejected = true;
                error!(kind, error = %e, "configuration rejected");
                Err(e)
            }
        }
    }

    pub(crate) fn operate(&mut self, kind: &'static str) {
        self.state = DiscState::Operating;
        debug!(kind, "operating");
    }

    pub fn dispose(&mut self, kind: &'static str) {
        self.state = DiscState::Disposed;
        debug!(kind, "disposed");
    }
}
