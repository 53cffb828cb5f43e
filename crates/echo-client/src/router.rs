//! Router hand-off: who may broadcast the open song.
//!
//! The server is the only arbiter. This client keeps an optimistic belief
//! about its own role and reconciles it with every `router_claimed` broadcast.
//! A claim or release nobody has echoed yet is shown as pending; after
//! [`CLAIM_TIMEOUT`] it is shown as unconfirmed until the next broadcast.

use std::time::{Duration, Instant};

use echo_proto::protocol::Outbound;

pub const CLAIM_TIMEOUT: Duration = Duration::from_millis(3000);

/// How the status bar should draw the role badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDisplay {
    Settled,
    /// Waiting for an echo; `lit` flips every 400ms.
    Pending { lit: bool },
    Unconfirmed,
}

#[derive(Debug, Clone)]
enum Role {
    /// Local belief matches the last broadcast.
    Settled(bool),
    Awaiting {
        wanted: bool,
        since: Instant,
    },
    /// No echo within `CLAIM_TIMEOUT`.
    Unconfirmed { wanted: bool },
}

#[derive(Debug, Clone)]
pub struct RouterCoordinator {
    role: Role,
    holder: Option<String>,
}

impl Default for RouterCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterCoordinator {
    pub fn new() -> Self {
        Self {
            role: Role::Settled(false),
            holder: None,
        }
    }

    /// Local belief. Drives whether opening a song is broadcast.
    pub fn is_router(&self) -> bool {
        match self.role {
            Role::Settled(v) => v,
            Role::Awaiting { wanted, .. } | Role::Unconfirmed { wanted } => wanted,
        }
    }

    /// Last holder announced by the server.
    pub fn holder(&self) -> Option<&str> {
        self.holder.as_deref()
    }

    pub fn display(&self) -> RoleDisplay {
        match self.role {
            Role::Settled(_) => RoleDisplay::Settled,
            Role::Awaiting { since, .. } => RoleDisplay::Pending {
                lit: (since.elapsed().as_millis() / 400) % 2 == 0,
            },
            Role::Unconfirmed { .. } => RoleDisplay::Unconfirmed,
        }
    }

    /// Flip the local role and return the event announcing it.
    pub fn toggle(&mut self, me: &str) -> Outbound {
        let claim = !self.is_router();
        let server_says_me = self.holder.as_deref() == Some(me);
        self.role = if claim == server_says_me {
            Role::Settled(claim)
        } else {
            Role::Awaiting {
                wanted: claim,
                since: Instant::now(),
            }
        };
        let user = me.to_string();
        if claim {
            Outbound::ClaimRouter { user }
        } else {
            Outbound::ReleaseRouter { user }
        }
    }

    /// Apply a `router_claimed` broadcast. Returns `true` if anything changed.
    pub fn on_claimed(&mut self, holder: Option<String>, me: &str) -> bool {
        let before = (self.is_router(), self.display());
        self.role = match (holder.as_deref(), &self.role) {
            (Some(h), _) if h == me => Role::Settled(true),
            // Someone else took it, whatever we asked for.
            (Some(_), _) => Role::Settled(false),
            // Nobody holds it: a claim in flight may still land.
            (None, Role::Awaiting { wanted: true, since }) => Role::Awaiting {
                wanted: true,
                since: *since,
            },
            (None, _) => Role::Settled(false),
        };
        let holder_changed = self.holder != holder;
        self.holder = holder;
        holder_changed || before != (self.is_router(), self.display())
    }

    /// Called on every UI tick. Returns `true` if the badge changed state.
    pub fn tick(&mut self) -> bool {
        if let Role::Awaiting { wanted, since } = self.role {
            if since.elapsed() >= CLAIM_TIMEOUT {
                self.role = Role::Unconfirmed { wanted };
                return true;
            }
        }
        false
    }

    /// Forget everything; a new login starts as a plain listener.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_emits_claim_then_release() {
        let mut r = RouterCoordinator::new();
        assert_eq!(
            r.toggle("alice"),
            Outbound::ClaimRouter {
                user: "alice".into()
            }
        );
        assert!(r.is_router());
        assert_eq!(
            r.toggle("alice"),
            Outbound::ReleaseRouter {
                user: "alice".into()
            }
        );
        assert!(!r.is_router());
        assert_eq!(r.display(), RoleDisplay::Settled);
    }

    #[test]
    fn test_echo_confirms_claim() {
        let mut r = RouterCoordinator::new();
        r.toggle("alice");
        assert!(matches!(r.display(), RoleDisplay::Pending { .. }));
        assert!(r.on_claimed(Some("alice".into()), "alice"));
        assert!(r.is_router());
        assert_eq!(r.display(), RoleDisplay::Settled);
        assert_eq!(r.holder(), Some("alice"));
    }

    #[test]
    fn test_claim_by_other_user_overrides_local_belief() {
        let mut r = RouterCoordinator::new();
        r.toggle("alice");
        assert!(r.on_claimed(Some("bob".into()), "alice"));
        assert!(!r.is_router());
        assert_eq!(r.display(), RoleDisplay::Settled);
        assert_eq!(r.holder(), Some("bob"));
    }

    #[test]
    fn test_empty_holder_does_not_cancel_pending_claim() {
        let mut r = RouterCoordinator::new();
        r.toggle("alice");
        r.on_claimed(None, "alice");
        assert!(r.is_router());
        assert!(matches!(r.display(), RoleDisplay::Pending { .. }));
        assert_eq!(r.holder(), None);
    }

    #[test]
    fn test_empty_holder_settles_a_release() {
        let mut r = RouterCoordinator::new();
        r.toggle("alice");
        r.on_claimed(Some("alice".into()), "alice");
        r.toggle("alice");
        assert!(!r.is_router());
        assert!(r.on_claimed(None, "alice"));
        assert_eq!(r.display(), RoleDisplay::Settled);
    }

    #[test]
    fn test_unconfirmed_claim_settles_on_next_broadcast() {
        let mut r = RouterCoordinator::new();
        r.toggle("alice");
        r.role = Role::Awaiting {
            wanted: true,
            since: Instant::now() - CLAIM_TIMEOUT,
        };
        assert!(r.tick());
        assert_eq!(r.display(), RoleDisplay::Unconfirmed);
        assert!(r.is_router());
        assert!(!r.tick());

        r.on_claimed(None, "alice");
        assert!(!r.is_router());
        assert_eq!(r.display(), RoleDisplay::Settled);
    }

    #[test]
    fn test_holder_updates_even_when_not_router() {
        let mut r = RouterCoordinator::new();
        assert!(r.on_claimed(Some("bob".into()), "alice"));
        assert!(r.on_claimed(Some("carol".into()), "alice"));
        assert_eq!(r.holder(), Some("carol"));
        assert!(!r.on_claimed(Some("carol".into()), "alice"));
    }
}
