//! Route guards.
//!
//! A route declares an ordered [`GuardChain`]; every request is checked
//! against it before the handler runs. Evaluation is a pure function of the
//! resolved [`CallerIdentity`], so the same caller always gets the same
//! [`Decision`].

use std::sync::Arc;

pub mod caller;
pub mod middleware;

pub use caller::{BoundUser, CallerIdentity};
pub use middleware::guarded;

use crate::{auth::repo_types::Role, flash::Severity};

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";
pub const SUBSCRIPTION_REQUIRED_MESSAGE: &str =
    "This feature requires an active subscription. Please register or subscribe to continue.";
// Shared by anonymous and non-admin callers.
pub const ADMIN_REQUIRED_MESSAGE: &str = "You do not have permission to access that page.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Caller must be logged in.
    Authenticated,
    /// Caller must be logged in and subscribed.
    Subscribed,
    /// Caller must be logged in with the admin role.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotAuthenticated,
    NotSubscribed,
    NotAdmin,
}

/// Where a denied caller is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRef {
    Home,
    Register,
    /// Login page; `next` is the path to resume after a successful login.
    Login { next: Option<String> },
}

impl RouteRef {
    pub fn to_uri(&self) -> String {
        match self {
            RouteRef::Home => "/".to_string(),
            RouteRef::Register => "/register".to_string(),
            RouteRef::Login { next: None } => "/login".to_string(),
            RouteRef::Login { next: Some(next) } => {
                format!("/login?next={}", urlencoding::encode(next))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenyReason,
    pub message: &'static str,
    pub severity: Severity,
    pub target: RouteRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Guard {
    /// `requested` is the path (and query) the caller asked for.
    pub fn evaluate(self, caller: &CallerIdentity, requested: &str) -> Decision {
        match (self, caller.user()) {
            (Guard::Authenticated, None) => Decision::Deny(Denial {
                reason: DenyReason::NotAuthenticated,
                message: LOGIN_REQUIRED_MESSAGE,
                severity: Severity::Info,
                target: RouteRef::Login {
                    next: Some(requested.to_string()),
                },
            }),
            (Guard::Authenticated, Some(_)) => Decision::Allow,

            (Guard::Subscribed, None) => Decision::Deny(Denial {
                reason: DenyReason::NotAuthenticated,
                message: LOGIN_REQUIRED_MESSAGE,
                severity: Severity::Info,
                target: RouteRef::Login { next: None },
            }),
            (Guard::Subscribed, Some(u)) if !u.is_subscribed => Decision::Deny(Denial {
                reason: DenyReason::NotSubscribed,
                message: SUBSCRIPTION_REQUIRED_MESSAGE,
                severity: Severity::Warning,
                target: RouteRef::Register,
            }),
            (Guard::Subscribed, Some(_)) => Decision::Allow,

            (Guard::Admin, Some(u)) if u.role == Role::Admin => Decision::Allow,
            (Guard::Admin, _) => Decision::Deny(Denial {
                reason: DenyReason::NotAdmin,
                message: ADMIN_REQUIRED_MESSAGE,
                severity: Severity::Danger,
                target: RouteRef::Home,
            }),
        }
    }
}

/// Guards in evaluation order. The first deny wins.
#[derive(Debug, Clone)]
pub struct GuardChain(Arc<[Guard]>);

impl GuardChain {
    pub fn new(guards: &[Guard]) -> Self {
        Self(guards.into())
    }

    pub fn evaluate(&self, caller: &CallerIdentity, requested: &str) -> Decision {
        self.0
            .iter()
            .map(|g| g.evaluate(caller, requested))
            .find(|d| matches!(d, Decision::Deny(_)))
            .unwrap_or(Decision::Allow)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn bound(role: Role, is_subscribed: bool) -> CallerIdentity {
        CallerIdentity::Bound(BoundUser {
            id: Uuid::new_v4(),
            username: "someone".into(),
            role,
            is_subscribed,
        })
    }

    fn all_callers() -> Vec<CallerIdentity> {
        vec![
            CallerIdentity::Anonymous,
            bound(Role::Regular, false),
            bound(Role::Regular, true),
            bound(Role::Admin, false),
            bound(Role::Admin, true),
        ]
    }

    fn reason(d: &Decision) -> Option<DenyReason> {
        match d {
            Decision::Allow => None,
            Decision::Deny(denial) => Some(denial.reason),
        }
    }

    #[test]
    fn authenticated_guard_sends_anonymous_to_login_with_next() {
        let d = Guard::Authenticated.evaluate(&CallerIdentity::Anonymous, "/upload_video?x=1");
        let Decision::Deny(denial) = d else {
            panic!("anonymous caller must be denied");
        };
        assert_eq!(denial.reason, DenyReason::NotAuthenticated);
        assert_eq!(denial.severity, Severity::Info);
        assert_eq!(
            denial.target,
            RouteRef::Login {
                next: Some("/upload_video?x=1".into())
            }
        );
        assert_eq!(denial.target.to_uri(), "/login?next=%2Fupload_video%3Fx%3D1");
    }

    #[test]
    fn authenticated_guard_allows_every_bound_caller() {
        for caller in all_callers().into_iter().skip(1) {
            assert_eq!(Guard::Authenticated.evaluate(&caller, "/"), Decision::Allow);
        }
    }

    #[test]
    fn subscribed_guard_decisions() {
        let anon = Guard::Subscribed.evaluate(&CallerIdentity::Anonymous, "/upload_video");
        let Decision::Deny(denial) = anon else {
            panic!("anonymous caller must be denied");
        };
        assert_eq!(denial.reason, DenyReason::NotAuthenticated);
        assert_eq!(denial.message, LOGIN_REQUIRED_MESSAGE);
        assert_eq!(denial.target, RouteRef::Login { next: None });
        assert_ne!(denial.message, ADMIN_REQUIRED_MESSAGE);

        let unsubscribed = Guard::Subscribed.evaluate(&bound(Role::Regular, false), "/upload_video");
        let Decision::Deny(denial) = unsubscribed else {
            panic!("unsubscribed caller must be denied");
        };
        assert_eq!(denial.reason, DenyReason::NotSubscribed);
        assert_eq!(denial.severity, Severity::Warning);
        assert_eq!(denial.target.to_uri(), "/register");

        assert_eq!(
            Guard::Subscribed.evaluate(&bound(Role::Regular, true), "/upload_video"),
            Decision::Allow
        );
    }

    #[test]
    fn admin_role_does_not_bypass_subscription() {
        assert_eq!(
            reason(&Guard::Subscribed.evaluate(&bound(Role::Admin, false), "/upload_video")),
            Some(DenyReason::NotSubscribed)
        );
    }

    #[test]
    fn admin_guard_merges_anonymous_and_regular_denials() {
        let anon = Guard::Admin.evaluate(&CallerIdentity::Anonymous, "/admin");
        let regular = Guard::Admin.evaluate(&bound(Role::Regular, true), "/admin");
        assert_eq!(anon, regular);
        let Decision::Deny(denial) = anon else {
            panic!("anonymous caller must be denied");
        };
        assert_eq!(denial.reason, DenyReason::NotAdmin);
        assert_eq!(denial.severity, Severity::Danger);
        assert_eq!(denial.target, RouteRef::Home);

        assert_eq!(Guard::Admin.evaluate(&bound(Role::Admin, false), "/admin"), Decision::Allow);
    }

    #[test]
    fn chain_short_circuits_in_declared_order() {
        let canonical = GuardChain::new(&[Guard::Authenticated, Guard::Subscribed]);
        let Decision::Deny(denial) = canonical.evaluate(&CallerIdentity::Anonymous, "/upload_video")
        else {
            panic!("anonymous caller must be denied");
        };
        // Authentication runs first, so `next` survives.
        assert_eq!(
            denial.target,
            RouteRef::Login {
                next: Some("/upload_video".into())
            }
        );

        let reversed = GuardChain::new(&[Guard::Subscribed, Guard::Authenticated]);
        assert_eq!(
            reason(&reversed.evaluate(&CallerIdentity::Anonymous, "/upload_video")),
            Some(DenyReason::NotAuthenticated)
        );

        let mixed = GuardChain::new(&[Guard::Admin, Guard::Subscribed]);
        assert_eq!(
            reason(&mixed.evaluate(&bound(Role::Regular, false), "/x")),
            Some(DenyReason::NotAdmin)
        );
    }

    #[test]
    fn stacking_order_never_changes_allow_or_deny() {
        let forward = GuardChain::new(&[Guard::Authenticated, Guard::Subscribed]);
        let backward = GuardChain::new(&[Guard::Subscribed, Guard::Authenticated]);
        for caller in all_callers() {
            assert_eq!(
                forward.evaluate(&caller, "/p") == Decision::Allow,
                backward.evaluate(&caller, "/p") == Decision::Allow,
            );
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let chain = GuardChain::new(&[Guard::Authenticated, Guard::Subscribed, Guard::Admin]);
        for caller in all_callers() {
            let first = chain.evaluate(&caller, "/admin");
            for _ in 0..3 {
                assert_eq!(chain.evaluate(&caller, "/admin"), first);
            }
        }
    }

    #[test]
    fn empty_chain_allows() {
        let open = GuardChain::new(&[]);
        assert_eq!(open.evaluate(&CallerIdentity::Anonymous, "/"), Decision::Allow);
    }
}
